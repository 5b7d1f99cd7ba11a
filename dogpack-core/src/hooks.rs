use anyhow::Result;

use crate::tenant::TenantContext;

/// Which write is about to reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteStage {
    BeforeInsert,
    BeforeUpdate,
    BeforeDelete,
}

impl WriteStage {
    /// Operation name used in errors and logs.
    pub fn operation(&self) -> &'static str {
        match self {
            WriteStage::BeforeInsert => "create",
            WriteStage::BeforeUpdate => "update",
            WriteStage::BeforeDelete => "delete",
        }
    }
}

/// Context passed to write hooks.
///
/// `record` is the incoming record for insert/update and the persisted record
/// for delete; hooks may change it. `persisted` is the stored version for
/// update and delete, `None` on insert.
#[derive(Debug)]
pub struct WriteContext<'a, R> {
    pub tenant: &'a TenantContext,
    pub stage: WriteStage,
    pub record: &'a mut R,
    pub persisted: Option<&'a R>,
}

impl<'a, R> WriteContext<'a, R> {
    pub fn new(
        tenant: &'a TenantContext,
        stage: WriteStage,
        record: &'a mut R,
        persisted: Option<&'a R>,
    ) -> Self {
        Self {
            tenant,
            stage,
            record,
            persisted,
        }
    }
}

/// A hook run at the persistence boundary before every write.
///
/// Returning an error aborts the write; nothing reaches the store.
#[async_trait::async_trait]
pub trait WriteHook<R>: Send + Sync {
    async fn run(&self, ctx: &mut WriteContext<'_, R>) -> Result<()>;
}
