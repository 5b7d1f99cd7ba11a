use dogpack_core::TenancyConfig;

/// Defaults for the demo, overridable with `DOGPACK__*` environment variables.
pub fn notes_config() -> TenancyConfig {
    let mut config = TenancyConfig::new();
    config.set("http.host", "127.0.0.1");
    config.set("http.port", "3036");
    config.set("tenancy.default_hint", "default");
    config.set("tenants.seed", "1:default,42:acme,7:globex:notes.globex.test");
    config.set("notes.max_body_len", "2000");
    config.load_env("DOGPACK");
    config
}
