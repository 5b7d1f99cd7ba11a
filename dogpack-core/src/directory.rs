//! Tenant directory: the durable source of truth for tenant records.
//!
//! The isolation layer only reads from it ([`TenantDirectory`]). Lifecycle
//! changes that affect resolution go through [`TenantWriter`], which the
//! resolution cache wraps so that invalidation is part of the operation.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::errors::TenancyError;
use crate::tenant::{normalize_subdomain, validate_subdomain, Tenant, TenantId};

/// Read side of the tenant catalog.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// The active tenant registered under `subdomain` (already normalized).
    async fn find_active_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>>;
}

/// Lifecycle changes that invalidate cached resolutions.
///
/// Both methods return the tenant record as it was *before* the change.
#[async_trait]
pub trait TenantWriter: Send + Sync {
    async fn set_active(&self, id: TenantId, active: bool) -> Result<Tenant>;

    async fn change_subdomain(&self, id: TenantId, subdomain: &str) -> Result<Tenant>;
}

/// In-memory tenant directory for tests, demos, and single-node setups.
#[derive(Debug, Default)]
pub struct MemoryTenantDirectory {
    tenants: RwLock<HashMap<TenantId, Tenant>>,
}

impl MemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from a list of tenants.
    pub fn with_tenants<I>(tenants: I) -> Result<Self>
    where
        I: IntoIterator<Item = Tenant>,
    {
        let directory = Self::new();
        for tenant in tenants {
            directory.insert(tenant)?;
        }
        Ok(directory)
    }

    /// Register a tenant. The subdomain is validated and normalized; ids and
    /// subdomains must be unique.
    pub fn insert(&self, mut tenant: Tenant) -> Result<()> {
        tenant.subdomain = validate_subdomain(&tenant.subdomain)
            .map_err(|e| TenancyError::from(e).into_anyhow())?;

        let mut tenants = self.tenants.write();
        if tenants.contains_key(&tenant.id) {
            return Err(TenancyError::conflict(format!("Tenant {} already exists", tenant.id))
                .into_anyhow());
        }
        if tenants.values().any(|t| t.subdomain == tenant.subdomain) {
            return Err(TenancyError::conflict(format!(
                "Subdomain '{}' is already taken",
                tenant.subdomain
            ))
            .into_anyhow());
        }

        tenants.insert(tenant.id, tenant);
        Ok(())
    }

    /// Any tenant by id, active or not.
    pub fn get(&self, id: TenantId) -> Option<Tenant> {
        self.tenants.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tenants.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.read().is_empty()
    }
}

#[async_trait]
impl TenantDirectory for MemoryTenantDirectory {
    async fn find_active_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>> {
        let subdomain = normalize_subdomain(subdomain);
        Ok(self
            .tenants
            .read()
            .values()
            .find(|t| t.active && t.subdomain == subdomain)
            .cloned())
    }
}

#[async_trait]
impl TenantWriter for MemoryTenantDirectory {
    async fn set_active(&self, id: TenantId, active: bool) -> Result<Tenant> {
        let mut tenants = self.tenants.write();
        let tenant = tenants
            .get_mut(&id)
            .ok_or_else(|| TenancyError::not_found(format!("No tenant with id {id}")).into_anyhow())?;

        let before = tenant.clone();
        tenant.active = active;
        Ok(before)
    }

    async fn change_subdomain(&self, id: TenantId, subdomain: &str) -> Result<Tenant> {
        let subdomain =
            validate_subdomain(subdomain).map_err(|e| TenancyError::from(e).into_anyhow())?;

        let mut tenants = self.tenants.write();
        if tenants
            .values()
            .any(|t| t.id != id && t.subdomain == subdomain)
        {
            return Err(
                TenancyError::conflict(format!("Subdomain '{subdomain}' is already taken"))
                    .into_anyhow(),
            );
        }

        let tenant = tenants
            .get_mut(&id)
            .ok_or_else(|| TenancyError::not_found(format!("No tenant with id {id}")).into_anyhow())?;

        let before = tenant.clone();
        tenant.subdomain = subdomain;
        Ok(before)
    }
}
