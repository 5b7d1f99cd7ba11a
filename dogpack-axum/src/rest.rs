//! Generic tenant-scoped REST routes over a [`GuardedStore`].
//!
//! ```text
//! GET    /       find    (records of the request tenant)
//! POST   /       create  (stamped with the request tenant)
//! GET    /{id}   get
//! PUT    /{id}   update
//! DELETE /{id}   delete
//! ```
//!
//! Every route requires a resolved tenant.

use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, State},
    routing, Json, Router,
};
use dogpack_core::{GuardedStore, TenancyError, TenantOwned};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::{RequireTenant, TenancyAxumError};

pub struct RecordState<R>
where
    R: TenantOwned,
{
    pub store: GuardedStore<R>,
}

impl<R> Clone for RecordState<R>
where
    R: TenantOwned,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

fn map_json_rejection(rejection: JsonRejection) -> TenancyAxumError {
    TenancyError::bad_request("Failed to parse the request body as JSON")
        .with_data(json!({"_schema": [rejection.body_text()]}))
        .into()
}

async fn find<R>(
    State(state): State<RecordState<R>>,
    tenant: RequireTenant,
) -> Result<Json<Vec<R>>, TenancyAxumError>
where
    R: TenantOwned + Serialize,
{
    let records = state.store.find(&tenant.context).await?;
    Ok(Json(records))
}

async fn create<R>(
    State(state): State<RecordState<R>>,
    tenant: RequireTenant,
    data: Result<Json<R>, JsonRejection>,
) -> Result<Json<R>, TenancyAxumError>
where
    R: TenantOwned + Serialize + DeserializeOwned,
{
    let Json(record) = data.map_err(map_json_rejection)?;
    let created = state.store.create(&tenant.context, record).await?;
    Ok(Json(created))
}

async fn get<R>(
    State(state): State<RecordState<R>>,
    tenant: RequireTenant,
    Path(id): Path<String>,
) -> Result<Json<R>, TenancyAxumError>
where
    R: TenantOwned + Serialize,
{
    let record = state.store.get(&tenant.context, &id).await?;
    Ok(Json(record))
}

async fn update<R>(
    State(state): State<RecordState<R>>,
    tenant: RequireTenant,
    Path(id): Path<String>,
    data: Result<Json<R>, JsonRejection>,
) -> Result<Json<R>, TenancyAxumError>
where
    R: TenantOwned + Serialize + DeserializeOwned,
{
    let Json(record) = data.map_err(map_json_rejection)?;
    if record.record_id() != id {
        return Err(TenancyError::bad_request(format!(
            "Body id '{}' does not match path id '{id}'",
            record.record_id()
        ))
        .into());
    }
    let updated = state.store.update(&tenant.context, record).await?;
    Ok(Json(updated))
}

async fn remove<R>(
    State(state): State<RecordState<R>>,
    tenant: RequireTenant,
    Path(id): Path<String>,
) -> Result<Json<R>, TenancyAxumError>
where
    R: TenantOwned + Serialize,
{
    let removed = state.store.delete(&tenant.context, &id).await?;
    Ok(Json(removed))
}

pub fn record_router<R>(store: GuardedStore<R>) -> Router<()>
where
    R: TenantOwned + Serialize + DeserializeOwned,
{
    let state = RecordState { store };

    Router::new()
        .route("/", routing::get(find::<R>).post(create::<R>))
        .route(
            "/{id}",
            routing::get(get::<R>).put(update::<R>).delete(remove::<R>),
        )
        .with_state(state)
}
