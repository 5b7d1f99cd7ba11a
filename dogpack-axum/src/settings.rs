use anyhow::Result;
use axum::http::HeaderName;
use dogpack_core::TenancyConfigSnapshot;

/// Header API clients use to name their tenant when they cannot vary the hostname.
pub const DEFAULT_HINT_HEADER: &str = "x-tenant-subdomain";

/// Hint used for development hosts and hosts without a subdomain.
pub const DEFAULT_HINT: &str = "default";

/// Hosts treated as local development aliases.
pub const DEFAULT_DEV_HOSTS: [&str; 5] = ["localhost", "127.0.0.1", "[::1]", "::1", "0.0.0.0"];

/// How the binder derives a tenant hint from a request.
#[derive(Debug, Clone)]
pub struct BinderSettings {
    pub hint_header: HeaderName,
    pub default_hint: String,
    pub dev_hosts: Vec<String>,
}

impl Default for BinderSettings {
    fn default() -> Self {
        Self {
            hint_header: HeaderName::from_static(DEFAULT_HINT_HEADER),
            default_hint: DEFAULT_HINT.to_string(),
            dev_hosts: DEFAULT_DEV_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl BinderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `tenancy.hint_header`, `tenancy.default_hint` and `tenancy.dev_hosts`
    /// (comma separated); missing keys keep their defaults.
    pub fn from_snapshot(config: &TenancyConfigSnapshot) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(header) = config.get("tenancy.hint_header") {
            settings.hint_header = HeaderName::from_bytes(header.trim().as_bytes())
                .map_err(|e| anyhow::anyhow!("Invalid tenancy.hint_header '{header}': {e}"))?;
        }
        if let Some(hint) = config.get("tenancy.default_hint") {
            settings.default_hint = hint.trim().to_lowercase();
        }
        let dev_hosts = config.get_list("tenancy.dev_hosts");
        if !dev_hosts.is_empty() {
            settings.dev_hosts = dev_hosts.into_iter().map(|h| h.to_lowercase()).collect();
        }

        Ok(settings)
    }

    pub fn with_hint_header(mut self, header: HeaderName) -> Self {
        self.hint_header = header;
        self
    }

    pub fn with_default_hint(mut self, hint: impl Into<String>) -> Self {
        self.default_hint = hint.into().to_lowercase();
        self
    }

    pub fn with_dev_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dev_hosts = hosts.into_iter().map(|h| h.into().to_lowercase()).collect();
        self
    }

    pub fn is_dev_host(&self, host: &str) -> bool {
        self.dev_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }
}
