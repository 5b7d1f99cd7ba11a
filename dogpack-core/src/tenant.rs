//! Core multi-tenant types for dogpack.
//!
//! A [`TenantContext`] is the per-request record of which tenant is active.
//! It is carried two ways, both bound to a single request:
//!
//! - explicitly, as a value handed to services, hooks, and stores;
//! - implicitly, through a task-local slot installed by [`scope`] for the
//!   lifetime of one request future. The slot disappears with the future, so a
//!   pooled worker can never inherit a stale tenant from an earlier request.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;

use crate::enforcer::IsolationError;

/// Stable numeric tenant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TenantId(pub u64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TenantId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A tenant as stored in the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Tenant {
    pub id: TenantId,
    pub subdomain: String,
    pub custom_domain: Option<String>,
    pub active: bool,
}

impl Tenant {
    /// An active tenant without a custom domain.
    pub fn new(id: impl Into<TenantId>, subdomain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subdomain: subdomain.into(),
            custom_domain: None,
            active: true,
        }
    }

    pub fn with_custom_domain(mut self, domain: impl Into<String>) -> Self {
        self.custom_domain = Some(domain.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Shortest subdomain a tenant may register.
pub const MIN_SUBDOMAIN_LEN: usize = 3;
/// Longest subdomain a tenant may register (one DNS label).
pub const MAX_SUBDOMAIN_LEN: usize = 63;

/// Lowercase + trim, the canonical form used for lookups and cache keys.
pub fn normalize_subdomain(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Normalize and check that `raw` is a registrable subdomain:
/// 3-63 chars of `[a-z0-9-]`, not starting or ending with a hyphen.
pub fn validate_subdomain(raw: &str) -> Result<String, InvalidSubdomain> {
    let subdomain = normalize_subdomain(raw);
    let len = subdomain.len();

    if !(MIN_SUBDOMAIN_LEN..=MAX_SUBDOMAIN_LEN).contains(&len) {
        return Err(InvalidSubdomain::Length { subdomain, len });
    }
    if let Some(c) = subdomain
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(InvalidSubdomain::Character { subdomain, found: c });
    }
    if subdomain.starts_with('-') || subdomain.ends_with('-') {
        return Err(InvalidSubdomain::Hyphen { subdomain });
    }

    Ok(subdomain)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSubdomain {
    #[error("Subdomain '{subdomain}' must be 3-63 characters (got {len})")]
    Length { subdomain: String, len: usize },

    #[error("Subdomain '{subdomain}' contains invalid character '{found}'")]
    Character { subdomain: String, found: char },

    #[error("Subdomain '{subdomain}' may not start or end with a hyphen")]
    Hyphen { subdomain: String },
}

/// Context carried with every dogpack operation.
///
/// An unset context is a valid state (health checks, tenant-agnostic
/// endpoints). Anything that needs a tenant calls [`TenantContext::require`]
/// and treats the error as fatal rather than picking a tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: Option<TenantId>,
    subdomain: Option<String>,
}

impl TenantContext {
    /// An unset context.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context bound to `tenant_id`, resolved from `subdomain`.
    pub fn for_tenant(tenant_id: impl Into<TenantId>, subdomain: impl Into<String>) -> Self {
        let mut ctx = Self::new();
        ctx.set(tenant_id, subdomain);
        ctx
    }

    pub fn set(&mut self, tenant_id: impl Into<TenantId>, subdomain: impl Into<String>) {
        self.tenant_id = Some(tenant_id.into());
        self.subdomain = Some(subdomain.into());
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn subdomain(&self) -> Option<&str> {
        self.subdomain.as_deref()
    }

    pub fn clear(&mut self) {
        self.tenant_id = None;
        self.subdomain = None;
    }

    pub fn is_set(&self) -> bool {
        self.tenant_id.is_some()
    }

    /// The tenant id, or [`IsolationError::MissingContext`] for `operation`.
    pub fn require(&self, operation: &'static str) -> Result<TenantId, IsolationError> {
        self.tenant_id
            .ok_or(IsolationError::MissingContext { operation })
    }
}

tokio::task_local! {
    static CURRENT_TENANT: RefCell<TenantContext>;
}

/// Run `fut` with `ctx` installed as the current tenant context.
///
/// The slot belongs to this future only: concurrently running requests each
/// see their own value, and the slot is gone once `fut` completes, fails, or
/// is dropped.
pub async fn scope<F>(ctx: TenantContext, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_TENANT.scope(RefCell::new(ctx), fut).await
}

/// Tenant id of the request running on this task, if any.
///
/// Used by tenant-scoped queries to build their `tenant_id = ?` predicate.
pub fn current_tenant_id() -> Option<TenantId> {
    CURRENT_TENANT
        .try_with(|cell| cell.borrow().tenant_id())
        .ok()
        .flatten()
}

/// Snapshot of the current context; unset outside of a [`scope`].
pub fn current() -> TenantContext {
    CURRENT_TENANT
        .try_with(|cell| cell.borrow().clone())
        .unwrap_or_default()
}

/// Whether the running task is inside a request scope.
pub fn in_scope() -> bool {
    CURRENT_TENANT.try_with(|_| ()).is_ok()
}

/// Overwrite the current request's context. Returns `false` outside a scope.
pub fn set_current(tenant_id: impl Into<TenantId>, subdomain: impl Into<String>) -> bool {
    let (tenant_id, subdomain) = (tenant_id.into(), subdomain.into());
    CURRENT_TENANT
        .try_with(|cell| cell.borrow_mut().set(tenant_id, subdomain))
        .is_ok()
}

/// Unset the current request's context. Returns `false` outside a scope.
pub fn clear_current() -> bool {
    CURRENT_TENANT
        .try_with(|cell| cell.borrow_mut().clear())
        .is_ok()
}
