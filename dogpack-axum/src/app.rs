use std::sync::Arc;

use axum::handler::Handler;
use axum::routing::get;
use axum::Router;
use dogpack_core::{GuardedStore, TenantOwned, TenantResolutionCache};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::binder::TenantBinderLayer;
use crate::rest;
use crate::settings::BinderSettings;

/// Builder for a tenant-aware axum application.
///
/// Routes are collected first; [`TenantApp::into_router`] wraps all of them in
/// request ids, tracing, and the tenant binder, so the binder runs before any
/// handler.
pub struct TenantApp {
    pub cache: Arc<TenantResolutionCache>,
    pub settings: BinderSettings,
    router: Router<()>,
}

impl TenantApp {
    pub fn new(cache: Arc<TenantResolutionCache>) -> Self {
        Self {
            cache,
            settings: BinderSettings::default(),
            router: Router::new(),
        }
    }

    pub fn with_settings(mut self, settings: BinderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = self.router.nest(path, router);
        self
    }

    pub fn r#use(self, path: &str, router: Router<()>) -> Self {
        self.use_router(path, router)
    }

    /// Mount a single GET handler, e.g. a tenant-agnostic health check.
    pub fn use_get<H, T>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.router = self.router.route(path, get(handler));
        self
    }

    /// Mount the tenant-scoped REST routes for `store` under `path`.
    pub fn use_records<R>(self, path: &str, store: GuardedStore<R>) -> Self
    where
        R: TenantOwned + Serialize + DeserializeOwned,
    {
        let router = rest::record_router(store);
        self.use_router(path, router)
    }

    pub fn into_router(self) -> Router<()> {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TenantBinderLayer::new(self.cache, self.settings));

        self.router.layer(middleware)
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "Listening");
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}

pub fn tenant_app(cache: Arc<TenantResolutionCache>) -> TenantApp {
    TenantApp::new(cache)
}
