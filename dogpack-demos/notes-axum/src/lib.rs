mod app;
mod hooks;
pub mod services;

use std::sync::Arc;

use anyhow::Result;
use dogpack_axum::{BinderSettings, CurrentTenant, TenantApp};
use dogpack_core::{MemoryTenantDirectory, TenancyConfigSnapshot, TenantResolutionCache};
use serde_json::{json, Value};

pub struct NotesApp {
    pub app: TenantApp,
    pub config: TenancyConfigSnapshot,
    pub directory: Arc<MemoryTenantDirectory>,
}

async fn whoami(CurrentTenant(ctx): CurrentTenant) -> axum::Json<Value> {
    axum::Json(json!({
        "tenantId": ctx.tenant_id().map(|t| t.0),
        "subdomain": ctx.subdomain(),
    }))
}

pub fn build() -> Result<NotesApp> {
    let config = app::notes_config().snapshot();

    let directory = Arc::new(services::tenants::seed_directory(&config)?);
    let cache = Arc::new(TenantResolutionCache::new(directory.clone()));
    let settings = BinderSettings::from_snapshot(&config)?;
    let notes = services::notes::configure(&config);

    let app = dogpack_axum::tenant_app(cache)
        .with_settings(settings)
        .use_get("/health", || async { "ok" })
        .use_get("/whoami", whoami)
        .use_records("/notes", notes);

    Ok(NotesApp {
        app,
        config,
        directory,
    })
}
