//! # dogpack Configuration
//!
//! A minimal string key/value store, the same shape as DogRS'
//! `app.set()` / `app.get()`. Components read typed values from a
//! [`TenancyConfigSnapshot`] taken once at startup.
//!
//! ```rust
//! use dogpack_core::TenancyConfig;
//!
//! let mut config = TenancyConfig::new();
//! config.set("tenancy.default_hint", "default");
//! config.set("tenancy.dev_hosts", "localhost,127.0.0.1");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get("tenancy.default_hint"), Some("default"));
//! assert_eq!(snapshot.get_list("tenancy.dev_hosts").len(), 2);
//! ```
//!
//! ## Environment overrides
//! [`TenancyConfig::load_env`] maps `PREFIX__A__B=value` to `a.b`:
//!
//! ```bash
//! export DOGPACK__TENANCY__DEFAULT_HINT=www
//! ```

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct TenancyConfig {
    values: HashMap<String, String>,
}

impl TenancyConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Import every `PREFIX...` variable from the process environment.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    /// Import variables from any iterator; `load_env` is this over `std::env::vars()`.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped
                    .trim_start_matches('_')
                    .to_lowercase()
                    .replace("__", ".");
                if !normalized.is_empty() {
                    self.set(normalized, value);
                }
            }
        }
    }

    pub fn snapshot(&self) -> TenancyConfigSnapshot {
        TenancyConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TenancyConfigSnapshot {
    map: HashMap<String, String>,
}

impl TenancyConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse::<bool>().ok())
    }

    /// Comma-separated list, entries trimmed, empties dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}
