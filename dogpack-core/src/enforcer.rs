//! Tenant enforcement at the persistence boundary.
//!
//! [`GuardedStore`] wraps a [`RecordStore`] and is the only write path business
//! code gets. Every write takes the caller's [`TenantContext`] and runs the
//! registered [`WriteHook`]s before touching the store; [`TenantEnforcer`] is
//! always the first of them:
//!
//! - insert: the record is stamped with the context tenant, whatever the
//!   caller put there;
//! - update / delete: the persisted owner must be the context tenant, and an
//!   update may not move the record to another tenant.
//!
//! Later hooks may edit the record but not its tenant; the stamp is checked
//! again after the last hook. Updates and deletes reach the store as
//! owner-conditional writes ([`RecordStore::update_owned`],
//! [`RecordStore::delete_owned`]), so the owner check holds even if the row
//! changes hands between the fetch and the write.
//!
//! A record's tenant never changes between insert and delete. A rejected
//! write leaves the store untouched and surfaces as an [`IsolationError`].

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::errors::{ErrorKind, TenancyError};
use crate::hooks::{WriteContext, WriteHook, WriteStage};
use crate::store::{RecordStore, TenantOwned};
use crate::tenant::{TenantContext, TenantId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IsolationError {
    /// A tenant-scoped operation ran without a tenant in context.
    #[error("No tenant in context for {operation}")]
    MissingContext { operation: &'static str },

    /// The record belongs to another tenant than the one in context.
    #[error("Cross-tenant {operation} rejected for record '{record}': owned by tenant {owner}, context is tenant {context}")]
    CrossTenant {
        operation: &'static str,
        record: String,
        context: TenantId,
        owner: TenantId,
    },

    /// An update tried to change which tenant owns the record.
    #[error("Record '{record}' belongs to tenant {owner} and cannot be moved to tenant {requested}")]
    TenantReassignment {
        record: String,
        owner: TenantId,
        requested: TenantId,
    },

    /// A persisted record has no owner; the store holds data no tenant may touch.
    #[error("Record '{record}' has no owning tenant")]
    Unowned { record: String },

    /// A write hook changed the tenant the enforcer stamped.
    #[error("Record '{record}' must be written as tenant {expected}, a write hook changed it to {found:?}")]
    OwnerChanged {
        operation: &'static str,
        record: String,
        expected: TenantId,
        found: Option<TenantId>,
    },
}

impl IsolationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IsolationError::MissingContext { .. }
            | IsolationError::Unowned { .. }
            | IsolationError::OwnerChanged { .. } => ErrorKind::GeneralError,
            IsolationError::CrossTenant { .. } | IsolationError::TenantReassignment { .. } => {
                ErrorKind::Forbidden
            }
        }
    }
}

/// Stamps and checks tenant ownership on every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantEnforcer;

impl TenantEnforcer {
    pub fn new() -> Self {
        Self
    }

    /// Owner of a persisted record, failing on unowned rows.
    fn owner_of<R: TenantOwned>(persisted: &R) -> Result<TenantId, IsolationError> {
        persisted.tenant_id().ok_or_else(|| IsolationError::Unowned {
            record: persisted.record_id().to_string(),
        })
    }

    pub(crate) fn check_owner<R: TenantOwned>(
        stage: WriteStage,
        context: TenantId,
        persisted: &R,
    ) -> Result<TenantId, IsolationError> {
        let owner = Self::owner_of(persisted)?;
        if owner != context {
            error!(
                operation = stage.operation(),
                record = persisted.record_id(),
                context_tenant = %context,
                owner_tenant = %owner,
                "Cross-tenant write blocked"
            );
            return Err(IsolationError::CrossTenant {
                operation: stage.operation(),
                record: persisted.record_id().to_string(),
                context,
                owner,
            });
        }
        Ok(owner)
    }

    /// The checks themselves, independent of the hook plumbing.
    pub fn enforce<R: TenantOwned>(&self, ctx: &mut WriteContext<'_, R>) -> Result<(), IsolationError> {
        let context = ctx.tenant.require(ctx.stage.operation())?;

        match ctx.stage {
            WriteStage::BeforeInsert => {
                if let Some(supplied) = ctx.record.tenant_id().filter(|t| *t != context) {
                    debug!(
                        record = ctx.record.record_id(),
                        supplied = %supplied,
                        context_tenant = %context,
                        "Overriding caller-supplied tenant on insert"
                    );
                }
                ctx.record.set_tenant_id(context);
            }
            WriteStage::BeforeUpdate => {
                let persisted = ctx.persisted.ok_or(IsolationError::Unowned {
                    record: ctx.record.record_id().to_string(),
                })?;
                let owner = Self::check_owner(ctx.stage, context, persisted)?;

                match ctx.record.tenant_id() {
                    Some(requested) if requested != owner => {
                        error!(
                            record = ctx.record.record_id(),
                            owner_tenant = %owner,
                            requested_tenant = %requested,
                            "Tenant reassignment blocked"
                        );
                        return Err(IsolationError::TenantReassignment {
                            record: ctx.record.record_id().to_string(),
                            owner,
                            requested,
                        });
                    }
                    Some(_) => {}
                    None => ctx.record.set_tenant_id(owner),
                }
            }
            WriteStage::BeforeDelete => {
                let persisted = ctx.persisted.unwrap_or(&*ctx.record);
                Self::check_owner(ctx.stage, context, persisted)?;
            }
        }

        Ok(())
    }
}

impl TenantEnforcer {
    /// Check, after every hook has run, that the record still carries `context`.
    pub fn verify_stamp<R: TenantOwned>(
        stage: WriteStage,
        context: TenantId,
        record: &R,
    ) -> Result<(), IsolationError> {
        let found = record.tenant_id();
        if found == Some(context) {
            return Ok(());
        }
        error!(
            operation = stage.operation(),
            record = record.record_id(),
            context_tenant = %context,
            found = ?found,
            "Write hook changed the record tenant"
        );
        Err(IsolationError::OwnerChanged {
            operation: stage.operation(),
            record: record.record_id().to_string(),
            expected: context,
            found,
        })
    }
}

#[async_trait]
impl<R> WriteHook<R> for TenantEnforcer
where
    R: TenantOwned,
{
    async fn run(&self, ctx: &mut WriteContext<'_, R>) -> Result<()> {
        self.enforce(ctx)?;
        Ok(())
    }
}

fn is_conflict(err: &anyhow::Error) -> bool {
    TenancyError::from_anyhow(err).is_some_and(|e| e.kind == ErrorKind::Conflict)
}

/// A [`RecordStore`] decorated with tenant enforcement and extra write hooks.
pub struct GuardedStore<R>
where
    R: TenantOwned,
{
    store: Arc<dyn RecordStore<R>>,
    hooks: Vec<Arc<dyn WriteHook<R>>>,
}

impl<R> Clone for GuardedStore<R>
where
    R: TenantOwned,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            hooks: self.hooks.clone(),
        }
    }
}

impl<R> GuardedStore<R>
where
    R: TenantOwned,
{
    pub fn new(store: Arc<dyn RecordStore<R>>) -> Self {
        Self {
            store,
            hooks: vec![Arc::new(TenantEnforcer::new())],
        }
    }

    /// Register a hook; it runs after the enforcer and earlier hooks.
    ///
    /// Hooks may change the record but not its tenant: the stamp is checked
    /// again once every hook has run.
    pub fn with_hook(mut self, hook: Arc<dyn WriteHook<R>>) -> Self {
        self.hooks.push(hook);
        self
    }

    async fn run_hooks(
        &self,
        tenant: &TenantContext,
        stage: WriteStage,
        record: &mut R,
        persisted: Option<&R>,
    ) -> Result<()> {
        let mut ctx = WriteContext::new(tenant, stage, record, persisted);
        for hook in &self.hooks {
            hook.run(&mut ctx).await?;
        }
        Ok(())
    }

    async fn fetch_existing(&self, id: &str) -> Result<R> {
        self.store.fetch(id).await?.ok_or_else(|| {
            TenancyError::not_found(format!("No record found for id '{id}'")).into_anyhow()
        })
    }

    /// Insert `record` as owned by the context tenant.
    pub async fn create(&self, tenant: &TenantContext, mut record: R) -> Result<R> {
        let context = tenant.require(WriteStage::BeforeInsert.operation())?;
        self.run_hooks(tenant, WriteStage::BeforeInsert, &mut record, None)
            .await?;
        TenantEnforcer::verify_stamp(WriteStage::BeforeInsert, context, &record)?;

        let id = record.record_id().to_string();
        match self.store.insert(record).await {
            Err(err) if is_conflict(&err) => Err(self.unavailable_id(context, &id).await),
            other => other,
        }
    }

    /// The conflict answer for a taken id, identical whichever tenant owns it.
    async fn unavailable_id(&self, context: TenantId, id: &str) -> anyhow::Error {
        let owner = match self.store.fetch(id).await {
            Ok(record) => record.and_then(|r| r.tenant_id()),
            Err(err) => return err,
        };
        if owner != Some(context) {
            warn!(
                record = id,
                context_tenant = %context,
                "Create collided with a record id owned by another tenant"
            );
        }
        TenancyError::conflict(format!("Record id '{id}' is not available")).into_anyhow()
    }

    /// Replace a record owned by the context tenant.
    ///
    /// The owner is checked again by the store in the same step as the write.
    pub async fn update(&self, tenant: &TenantContext, mut record: R) -> Result<R> {
        let context = tenant.require(WriteStage::BeforeUpdate.operation())?;
        let persisted = self.fetch_existing(record.record_id()).await?;
        self.run_hooks(tenant, WriteStage::BeforeUpdate, &mut record, Some(&persisted))
            .await?;
        TenantEnforcer::verify_stamp(WriteStage::BeforeUpdate, context, &record)?;
        self.store.update_owned(context, record).await
    }

    /// Delete a record owned by the context tenant.
    ///
    /// The owner is checked again by the store in the same step as the delete.
    pub async fn delete(&self, tenant: &TenantContext, id: &str) -> Result<R> {
        let context = tenant.require(WriteStage::BeforeDelete.operation())?;
        let persisted = self.fetch_existing(id).await?;
        let mut current = persisted.clone();
        self.run_hooks(tenant, WriteStage::BeforeDelete, &mut current, Some(&persisted))
            .await?;
        self.store.delete_owned(context, id).await
    }

    /// Fetch a record owned by the context tenant.
    ///
    /// Another tenant's record reads as not found.
    pub async fn get(&self, tenant: &TenantContext, id: &str) -> Result<R> {
        let context = tenant.require("get")?;
        let record = self.fetch_existing(id).await?;
        if record.tenant_id() != Some(context) {
            warn!(
                record = id,
                context_tenant = %context,
                "Read of another tenant's record hidden"
            );
            return Err(
                TenancyError::not_found(format!("No record found for id '{id}'")).into_anyhow(),
            );
        }
        Ok(record)
    }

    /// All records owned by the context tenant.
    pub async fn find(&self, tenant: &TenantContext) -> Result<Vec<R>> {
        let context = tenant.require("find")?;
        self.store.list_for_tenant(context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: String,
        tenant_id: Option<TenantId>,
        body: String,
    }

    impl Note {
        fn new(id: &str, body: &str) -> Self {
            Self {
                id: id.into(),
                tenant_id: None,
                body: body.into(),
            }
        }
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

    fn isolation(err: &anyhow::Error) -> IsolationError {
        err.downcast_ref::<IsolationError>().cloned().unwrap()
    }

    #[test]
    fn enforce_stamps_on_insert() {
        let ctx = TenantContext::for_tenant(1, "acme");
        let mut note = Note {
            tenant_id: Some(TenantId(9)),
            ..Note::new("n1", "hi")
        };
        let mut wctx = WriteContext::new(&ctx, WriteStage::BeforeInsert, &mut note, None);
        TenantEnforcer.enforce(&mut wctx).unwrap();
        assert_eq!(note.tenant_id, Some(TenantId(1)));
    }

    #[test]
    fn enforce_requires_context_for_every_stage() {
        let ctx = TenantContext::new();
        for stage in [
            WriteStage::BeforeInsert,
            WriteStage::BeforeUpdate,
            WriteStage::BeforeDelete,
        ] {
            let mut note = Note::new("n1", "hi");
            let persisted = note.clone();
            let mut wctx = WriteContext::new(&ctx, stage, &mut note, Some(&persisted));
            assert_eq!(
                TenantEnforcer.enforce(&mut wctx),
                Err(IsolationError::MissingContext {
                    operation: stage.operation()
                })
            );
        }
    }

    #[test]
    fn enforce_rejects_unowned_persisted_record() {
        let ctx = TenantContext::for_tenant(1, "acme");
        let persisted = Note::new("n1", "orphan");
        let mut note = persisted.clone();
        let mut wctx =
            WriteContext::new(&ctx, WriteStage::BeforeDelete, &mut note, Some(&persisted));
        assert!(matches!(
            TenantEnforcer.enforce(&mut wctx),
            Err(IsolationError::Unowned { .. })
        ));
    }

    #[tokio::test]
    async fn update_fills_missing_tenant_from_persisted() {
        let store = GuardedStore::new(Arc::new(MemoryStore::<Note>::new()));
        let ctx = TenantContext::for_tenant(1, "acme");
        store.create(&ctx, Note::new("n1", "v1")).await.unwrap();

        let updated = store.update(&ctx, Note::new("n1", "v2")).await.unwrap();
        assert_eq!(updated.tenant_id, Some(TenantId(1)));
        assert_eq!(store.get(&ctx, "n1").await.unwrap().body, "v2");
    }

    #[tokio::test]
    async fn update_cannot_reassign_tenant() {
        let store = GuardedStore::new(Arc::new(MemoryStore::<Note>::new()));
        let ctx = TenantContext::for_tenant(1, "acme");
        store.create(&ctx, Note::new("n1", "v1")).await.unwrap();

        let moved = Note {
            tenant_id: Some(TenantId(2)),
            ..Note::new("n1", "stolen")
        };
        let err = store.update(&ctx, moved).await.unwrap_err();
        assert!(matches!(
            isolation(&err),
            IsolationError::TenantReassignment { owner: TenantId(1), requested: TenantId(2), .. }
        ));
        assert_eq!(store.get(&ctx, "n1").await.unwrap().body, "v1");
    }

    struct UppercaseBody;

    #[async_trait]
    impl WriteHook<Note> for UppercaseBody {
        async fn run(&self, ctx: &mut WriteContext<'_, Note>) -> Result<()> {
            // The enforcer has already run: the tenant is always stamped here.
            assert!(ctx.record.tenant_id.is_some());
            ctx.record.body = ctx.record.body.to_uppercase();
            Ok(())
        }
    }

    #[tokio::test]
    async fn extra_hooks_run_after_enforcer() {
        let store = GuardedStore::new(Arc::new(MemoryStore::<Note>::new()))
            .with_hook(Arc::new(UppercaseBody));
        let ctx = TenantContext::for_tenant(3, "gamma");

        let created = store.create(&ctx, Note::new("n1", "quiet")).await.unwrap();
        assert_eq!(created.body, "QUIET");
        assert_eq!(created.tenant_id, Some(TenantId(3)));
    }

    /// Overwrites the tenant after the enforcer stamped it.
    struct SetTenant(Option<TenantId>);

    #[async_trait]
    impl WriteHook<Note> for SetTenant {
        async fn run(&self, ctx: &mut WriteContext<'_, Note>) -> Result<()> {
            ctx.record.tenant_id = self.0;
            Ok(())
        }
    }

    #[tokio::test]
    async fn hook_cannot_restamp_created_record() {
        for tampered in [Some(TenantId(99)), None] {
            let raw = Arc::new(MemoryStore::<Note>::new());
            let store = GuardedStore::new(raw.clone()).with_hook(Arc::new(SetTenant(tampered)));
            let ctx = TenantContext::for_tenant(1, "acme");

            let err = store.create(&ctx, Note::new("n1", "hi")).await.unwrap_err();
            assert_eq!(
                isolation(&err),
                IsolationError::OwnerChanged {
                    operation: "create",
                    record: "n1".into(),
                    expected: TenantId(1),
                    found: tampered,
                }
            );
            assert!(raw.is_empty());
        }
    }

    #[tokio::test]
    async fn hook_cannot_move_updated_record() {
        let raw = Arc::new(MemoryStore::<Note>::new());
        let ctx = TenantContext::for_tenant(1, "acme");
        GuardedStore::new(raw.clone())
            .create(&ctx, Note::new("n1", "v1"))
            .await
            .unwrap();

        let store = GuardedStore::new(raw.clone()).with_hook(Arc::new(SetTenant(Some(TenantId(99)))));
        let err = store.update(&ctx, Note::new("n1", "v2")).await.unwrap_err();
        assert!(matches!(
            isolation(&err),
            IsolationError::OwnerChanged { operation: "update", found: Some(TenantId(99)), .. }
        ));
        assert_eq!(TenancyError::normalize(err).code(), 500);

        let stored = raw.fetch("n1").await.unwrap().unwrap();
        assert_eq!(stored.tenant_id, Some(TenantId(1)));
        assert_eq!(stored.body, "v1");
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let store = GuardedStore::new(Arc::new(MemoryStore::<Note>::new()));
        let ctx = TenantContext::for_tenant(1, "acme");

        let err = store.delete(&ctx, "ghost").await.unwrap_err();
        let tenancy = TenancyError::from_anyhow(&err).unwrap();
        assert_eq!(tenancy.code(), 404);
    }
}
