//! Extractors for the tenant bound by [`crate::TenantBinderLayer`].
//!
//! Each endpoint picks its own policy: tenant-agnostic handlers take
//! [`CurrentTenant`] and may see an unset context, tenant-scoped handlers take
//! [`RequireTenant`] and reject unresolved requests with 403.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use dogpack_core::{TenancyError, TenantContext, TenantId};

use crate::TenancyAxumError;

/// The request's tenant context, possibly unset.
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub TenantContext);

impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<TenantContext>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

/// The request's tenant context, guaranteed to carry a tenant id.
#[derive(Debug, Clone)]
pub struct RequireTenant {
    pub id: TenantId,
    pub context: TenantContext,
}

impl<S> FromRequestParts<S> for RequireTenant
where
    S: Send + Sync,
{
    type Rejection = TenancyAxumError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<TenantContext>();
        match ctx.and_then(|c| c.tenant_id().map(|id| (id, c))) {
            Some((id, ctx)) => Ok(Self {
                id,
                context: ctx.clone(),
            }),
            None => {
                tracing::debug!(path = %parts.uri.path(), "Tenant-scoped endpoint called without tenant");
                Err(TenancyError::forbidden("Tenant context required").into())
            }
        }
    }
}
