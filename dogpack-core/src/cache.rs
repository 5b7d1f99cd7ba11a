//! Subdomain → tenant id resolution with an in-memory cache.
//!
//! The cache is soft state in front of a [`TenantDirectory`]. Only positive
//! results are cached; a subdomain that does not resolve is looked up again on
//! the next request. Entries never expire on their own, so anything that
//! deactivates or renames a tenant must invalidate. [`TenantResolutionCache::deactivate`]
//! and [`TenantResolutionCache::change_subdomain`] do that as part of the change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::directory::{TenantDirectory, TenantWriter};
use crate::tenant::{normalize_subdomain, TenantId};

/// Counters describing cache behaviour since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub lookup_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    lookup_failures: AtomicU64,
}

pub struct TenantResolutionCache {
    directory: Arc<dyn TenantDirectory>,
    entries: DashMap<String, TenantId>,
    counters: Counters,
}

impl TenantResolutionCache {
    pub fn new(directory: Arc<dyn TenantDirectory>) -> Self {
        Self {
            directory,
            entries: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Resolve a subdomain to an active tenant id.
    ///
    /// Directory failures resolve to `None` for this call only; nothing is
    /// cached for them.
    pub async fn resolve(&self, subdomain: &str) -> Option<TenantId> {
        let subdomain = normalize_subdomain(subdomain);
        if subdomain.is_empty() {
            return None;
        }

        if let Some(id) = self.entries.get(&subdomain).map(|e| *e.value()) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Some(id);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        // No lock is held across the lookup; concurrent misses for the same
        // subdomain each query once and write the same value.
        match self.directory.find_active_by_subdomain(&subdomain).await {
            Ok(Some(tenant)) => {
                debug!(%subdomain, tenant_id = %tenant.id, "Cached tenant resolution");
                self.entries.insert(subdomain, tenant.id);
                Some(tenant.id)
            }
            Ok(None) => {
                debug!(%subdomain, "No active tenant for subdomain");
                None
            }
            Err(e) => {
                self.counters.lookup_failures.fetch_add(1, Ordering::Relaxed);
                warn!(%subdomain, error = %e, "Tenant directory lookup failed; leaving tenant unresolved");
                None
            }
        }
    }

    pub fn invalidate(&self, subdomain: &str) {
        let subdomain = normalize_subdomain(subdomain);
        if self.entries.remove(&subdomain).is_some() {
            debug!(%subdomain, "Invalidated tenant resolution");
        }
    }

    pub fn invalidate_all(&self) {
        let count = self.entries.len();
        self.entries.clear();
        info!(count, "Invalidated all tenant resolutions");
    }

    /// Deactivate a tenant and drop its cached resolution before returning.
    pub async fn deactivate<W>(&self, writer: &W, id: TenantId) -> Result<()>
    where
        W: TenantWriter + ?Sized,
    {
        let before = writer.set_active(id, false).await?;
        self.invalidate(&before.subdomain);
        info!(tenant_id = %id, subdomain = %before.subdomain, "Tenant deactivated");
        Ok(())
    }

    /// Move a tenant to a new subdomain, invalidating both the old and new keys.
    pub async fn change_subdomain<W>(&self, writer: &W, id: TenantId, subdomain: &str) -> Result<()>
    where
        W: TenantWriter + ?Sized,
    {
        let before = writer.change_subdomain(id, subdomain).await?;
        self.invalidate(&before.subdomain);
        self.invalidate(subdomain);
        info!(tenant_id = %id, from = %before.subdomain, to = %normalize_subdomain(subdomain), "Tenant subdomain changed");
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            lookup_failures: self.counters.lookup_failures.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for TenantResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantResolutionCache")
            .field("entries", &self.entries.len())
            .field("stats", &self.stats())
            .finish()
    }
}
