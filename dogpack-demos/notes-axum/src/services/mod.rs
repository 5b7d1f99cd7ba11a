pub mod notes;
pub mod tenants;
