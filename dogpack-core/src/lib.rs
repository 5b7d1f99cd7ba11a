//! dogpack-core: framework-agnostic tenant isolation for DogRS-style services.
//!
//! - [`tenant`]: tenant model, per-request [`TenantContext`] and its task-local scope
//! - [`directory`]: the tenant catalog interfaces and an in-memory directory
//! - [`cache`]: subdomain resolution with explicit invalidation
//! - [`enforcer`]: tenant checks on every write at the persistence boundary
//! - [`store`]: the raw record store interface and an in-memory store

pub mod cache;
pub mod config;
pub mod directory;
pub mod enforcer;
pub mod errors;
pub mod hooks;
pub mod store;
pub mod tenant;

pub use cache::{CacheStats, TenantResolutionCache};
pub use config::{TenancyConfig, TenancyConfigSnapshot};
pub use directory::{MemoryTenantDirectory, TenantDirectory, TenantWriter};
pub use enforcer::{GuardedStore, IsolationError, TenantEnforcer};
pub use errors::{ErrorKind, TenancyError, TenancyResult};
pub use hooks::{WriteContext, WriteHook, WriteStage};
pub use store::{MemoryStore, RecordStore, TenantOwned};
pub use tenant::{current_tenant_id, Tenant, TenantContext, TenantId};
