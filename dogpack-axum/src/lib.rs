//! dogpack-axum: Axum adapter for dogpack.
//!
//! Binds every request to a tenant ([`TenantBinderLayer`]), exposes the
//! binding to handlers ([`CurrentTenant`], [`RequireTenant`]), and mounts
//! tenant-scoped REST routes over a [`dogpack_core::GuardedStore`].

pub mod app;
pub mod binder;
pub mod extract;
pub mod rest;
pub mod settings;
pub mod telemetry;
mod error;

pub use app::{tenant_app, TenantApp};
pub use binder::{extract_hint, TenantBinder, TenantBinderLayer};
pub use error::TenancyAxumError;
pub use extract::{CurrentTenant, RequireTenant};
pub use settings::BinderSettings;
