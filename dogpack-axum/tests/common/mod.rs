#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::{Json, Router};
use dogpack_axum::{tenant_app, CurrentTenant, TenancyAxumError};
use dogpack_core::tenant;
use dogpack_core::{
    GuardedStore, MemoryStore, MemoryTenantDirectory, Tenant, TenancyError, TenantDirectory,
    TenantId, TenantOwned, TenantResolutionCache,
};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    pub body: String,
}

impl TenantOwned for Note {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant: TenantId) {
        self.tenant_id = Some(tenant);
    }
}

/// A directory that is always down.
pub struct UnavailableDirectory;

#[async_trait]
impl TenantDirectory for UnavailableDirectory {
    async fn find_active_by_subdomain(&self, _subdomain: &str) -> Result<Option<Tenant>> {
        anyhow::bail!("connection refused")
    }
}

pub struct TestApp {
    pub router: Router,
    pub directory: Arc<MemoryTenantDirectory>,
    pub cache: Arc<TenantResolutionCache>,
    pub notes: Arc<MemoryStore<Note>>,
}

/// Reports the tenant as seen through the request extension and the task-local accessor.
async fn whoami(CurrentTenant(ctx): CurrentTenant) -> Json<Value> {
    tokio::task::yield_now().await;
    Json(json!({
        "tenantId": ctx.tenant_id().map(|t| t.0),
        "subdomain": ctx.subdomain(),
        "scoped": tenant::current_tenant_id().map(|t| t.0),
    }))
}

async fn boom(CurrentTenant(_ctx): CurrentTenant) -> Result<Json<Value>, TenancyAxumError> {
    Err(TenancyError::general_error("downstream is down").into())
}

pub fn build_with_directory(directory: Arc<dyn TenantDirectory>) -> Router {
    let cache = Arc::new(TenantResolutionCache::new(directory));
    tenant_app(cache)
        .use_get("/whoami", whoami)
        .into_router()
}

pub fn build() -> TestApp {
    let directory = Arc::new(
        MemoryTenantDirectory::with_tenants([Tenant::new(42, "acme"), Tenant::new(7, "beta")])
            .unwrap(),
    );
    let cache = Arc::new(TenantResolutionCache::new(directory.clone()));
    let notes = Arc::new(MemoryStore::<Note>::new());

    let router = tenant_app(Arc::clone(&cache))
        .use_get("/health", || async { "ok" })
        .use_get("/whoami", whoami)
        .use_get("/boom", boom)
        .use_records("/notes", GuardedStore::new(notes.clone()))
        .into_router();

    TestApp {
        router,
        directory,
        cache,
        notes,
    }
}

pub fn request(method: &str, uri: &str, host: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri).header("host", host)
}

pub fn empty(builder: axum::http::request::Builder) -> Request<Body> {
    builder.body(Body::empty()).unwrap()
}

pub fn with_json(builder: axum::http::request::Builder, body: Value) -> Request<Body> {
    builder
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(res: Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
