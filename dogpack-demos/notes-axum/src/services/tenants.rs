use anyhow::{Context, Result};
use dogpack_core::{MemoryTenantDirectory, TenancyConfigSnapshot, Tenant};

/// Build the directory from `tenants.seed`, a list of `id:subdomain[:custom_domain]` entries.
pub fn seed_directory(config: &TenancyConfigSnapshot) -> Result<MemoryTenantDirectory> {
    let directory = MemoryTenantDirectory::new();

    for entry in config.get_list("tenants.seed") {
        directory.insert(parse_seed(&entry)?)?;
    }

    tracing::info!(tenants = directory.len(), "Tenant directory seeded");
    Ok(directory)
}

fn parse_seed(entry: &str) -> Result<Tenant> {
    let mut parts = entry.splitn(3, ':').map(str::trim);
    let (Some(id), Some(subdomain)) = (parts.next(), parts.next()) else {
        anyhow::bail!("Invalid tenant seed '{entry}', expected id:subdomain[:custom_domain]");
    };
    let id: u64 = id
        .parse()
        .with_context(|| format!("Invalid tenant id in seed '{entry}'"))?;

    let tenant = Tenant::new(id, subdomain);
    Ok(match parts.next().filter(|d| !d.is_empty()) {
        Some(domain) => tenant.with_custom_domain(domain),
        None => tenant,
    })
}
