//! The persistence boundary.
//!
//! [`RecordStore`] is the raw storage API; business code does not call it
//! directly but goes through [`crate::GuardedStore`], which runs the tenant
//! checks first. Updates and deletes are owner-conditional at this level too,
//! so a row swapped under the same id between check and write is never touched.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::enforcer::TenantEnforcer;
use crate::errors::TenancyError;
use crate::hooks::WriteStage;
use crate::tenant::TenantId;

/// A persisted entity owned by exactly one tenant.
pub trait TenantOwned: Clone + Send + Sync + 'static {
    /// Primary key of the record.
    fn record_id(&self) -> &str;

    /// Owning tenant; `None` only on records that were never persisted.
    fn tenant_id(&self) -> Option<TenantId>;

    fn set_tenant_id(&mut self, tenant: TenantId);
}

#[async_trait]
pub trait RecordStore<R>: Send + Sync
where
    R: TenantOwned,
{
    async fn insert(&self, record: R) -> Result<R>;

    /// Unscoped lookup by primary key.
    async fn fetch(&self, id: &str) -> Result<Option<R>>;

    /// Replace `record` only if the stored row is owned by `owner`.
    ///
    /// The owner check and the write are one atomic step, the equivalent of
    /// `UPDATE .. WHERE id = ? AND tenant_id = ?`.
    async fn update_owned(&self, owner: TenantId, record: R) -> Result<R>;

    /// Delete the row `id` only if it is owned by `owner`, atomically.
    async fn delete_owned(&self, owner: TenantId, id: &str) -> Result<R>;

    /// All records owned by `tenant`.
    async fn list_for_tenant(&self, tenant: TenantId) -> Result<Vec<R>>;
}

fn not_found(id: &str) -> anyhow::Error {
    TenancyError::not_found(format!("No record found for id '{id}'")).into_anyhow()
}

/// In-memory [`RecordStore`].
#[derive(Debug)]
pub struct MemoryStore<R> {
    records: RwLock<HashMap<String, R>>,
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<R> MemoryStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl<R> RecordStore<R> for MemoryStore<R>
where
    R: TenantOwned,
{
    async fn insert(&self, record: R) -> Result<R> {
        let mut records = self.records.write();
        if records.contains_key(record.record_id()) {
            return Err(TenancyError::conflict(format!(
                "Record '{}' already exists",
                record.record_id()
            ))
            .into_anyhow());
        }
        records.insert(record.record_id().to_string(), record.clone());
        Ok(record)
    }

    async fn fetch(&self, id: &str) -> Result<Option<R>> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn update_owned(&self, owner: TenantId, record: R) -> Result<R> {
        TenantEnforcer::verify_stamp(WriteStage::BeforeUpdate, owner, &record)?;

        let mut records = self.records.write();
        let Some(slot) = records.get_mut(record.record_id()) else {
            return Err(not_found(record.record_id()));
        };
        TenantEnforcer::check_owner(WriteStage::BeforeUpdate, owner, &*slot)?;
        *slot = record.clone();
        Ok(record)
    }

    async fn delete_owned(&self, owner: TenantId, id: &str) -> Result<R> {
        let mut records = self.records.write();
        let Some(stored) = records.get(id) else {
            return Err(not_found(id));
        };
        TenantEnforcer::check_owner(WriteStage::BeforeDelete, owner, stored)?;
        records.remove(id).ok_or_else(|| not_found(id))
    }

    async fn list_for_tenant(&self, tenant: TenantId) -> Result<Vec<R>> {
        let mut found: Vec<R> = self
            .records
            .read()
            .values()
            .filter(|r| r.tenant_id() == Some(tenant))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.record_id().cmp(b.record_id()));
        Ok(found)
    }
}
