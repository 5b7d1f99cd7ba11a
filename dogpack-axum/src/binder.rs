//! Request → tenant binding.
//!
//! [`TenantBinderLayer`] runs in front of every route. For each request it:
//!
//! 1. derives a tenant hint (hint header, else host subdomain, else the default hint);
//! 2. resolves it through the [`TenantResolutionCache`];
//! 3. inserts the resulting [`TenantContext`] into the request extensions and
//!    runs the rest of the stack inside [`tenant::scope`].
//!
//! An unresolved hint leaves the context unset; the request still proceeds so
//! tenant-agnostic endpoints keep working. Endpoints that need a tenant reject
//! through [`crate::RequireTenant`]. The scope ends with the request future,
//! on success, error, or cancellation.

use std::net::IpAddr;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{header, HeaderMap, Request, Uri};
use dogpack_core::tenant::{self, TenantContext};
use dogpack_core::TenantResolutionCache;
use futures::future::BoxFuture;
use tower::{Layer, Service};
use tracing::{debug, Instrument};

use crate::settings::BinderSettings;

/// Derive the tenant hint for a request.
pub fn extract_hint(settings: &BinderSettings, headers: &HeaderMap, uri: &Uri) -> String {
    if let Some(hint) = headers
        .get(&settings.hint_header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return hint.to_lowercase();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()));

    host.and_then(|h| hint_from_host(settings, h))
        .unwrap_or_else(|| settings.default_hint.clone())
}

fn hint_from_host(settings: &BinderSettings, raw: &str) -> Option<String> {
    let host = strip_port(raw.trim()).trim_end_matches('.').to_lowercase();
    if host.is_empty() {
        return None;
    }
    if settings.is_dev_host(&host) {
        return Some(settings.default_hint.clone());
    }
    // IP literals carry no subdomain.
    if host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>().is_ok() {
        return None;
    }

    match host.split_once('.') {
        Some((label, rest)) if !label.is_empty() && !rest.is_empty() => Some(label.to_string()),
        _ => None,
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port))
            if !name.contains(':') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            name
        }
        _ => host,
    }
}

async fn bind(cache: &TenantResolutionCache, hint: String) -> TenantContext {
    let mut ctx = TenantContext::new();
    match cache.resolve(&hint).await {
        Some(id) => ctx.set(id, hint),
        None => debug!(%hint, "No tenant resolved; continuing without tenant context"),
    }
    ctx
}

#[derive(Clone)]
pub struct TenantBinderLayer {
    cache: Arc<TenantResolutionCache>,
    settings: Arc<BinderSettings>,
}

impl TenantBinderLayer {
    pub fn new(cache: Arc<TenantResolutionCache>, settings: BinderSettings) -> Self {
        Self {
            cache,
            settings: Arc::new(settings),
        }
    }
}

impl<S> Layer<S> for TenantBinderLayer {
    type Service = TenantBinder<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TenantBinder {
            inner,
            cache: Arc::clone(&self.cache),
            settings: Arc::clone(&self.settings),
        }
    }
}

#[derive(Clone)]
pub struct TenantBinder<S> {
    inner: S,
    cache: Arc<TenantResolutionCache>,
    settings: Arc<BinderSettings>,
}

impl<S, B> Service<Request<B>> for TenantBinder<S>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // The readied service goes with this request; keep a fresh clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let cache = Arc::clone(&self.cache);
        let settings = Arc::clone(&self.settings);

        Box::pin(async move {
            let hint = extract_hint(&settings, req.headers(), req.uri());
            let span = tracing::debug_span!("tenant", hint = %hint, tenant_id = tracing::field::Empty);
            let ctx = bind(&cache, hint).instrument(span.clone()).await;
            if let Some(id) = ctx.tenant_id() {
                span.record("tenant_id", id.0);
            }

            req.extensions_mut().insert(ctx.clone());
            let res = tenant::scope(ctx, async move { inner.call(req).await })
                .instrument(span)
                .await;

            debug!("Tenant context released");
            res
        })
    }
}
