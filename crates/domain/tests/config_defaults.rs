use li_domain::config::{Config, ConfigSeverity, StoreBackend, KNOWN_MIDDLEWARE};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config.server.cors.allowed_origins.contains(&"http://localhost:*".to_string()));
    assert!(config.server.cors.allowed_origins.contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn default_pipeline_runs_every_stage_policy_first() {
    let config = Config::default();
    assert_eq!(config.pipeline.middleware, KNOWN_MIDDLEWARE);
    assert_eq!(config.pipeline.middleware[0], "content_policy");
    assert_eq!(config.pipeline.spam_max_chars, 2000);
    assert_eq!(config.pipeline.repetition_min_messages, 10);
    assert_eq!(config.pipeline.capability_timeout_secs, 30);
}

#[test]
fn default_store_is_memory_with_hour_ttl() {
    let config = Config::default();
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.store.ttl_secs, 3600);
    assert!(!config.store.optimistic_concurrency);
}

#[test]
fn full_team_config_parses() {
    let toml_str = r##"
[store]
backend = "file"
state_path = "/var/lib/lexintake"
optimistic_concurrency = true

[pipeline]
middleware = ["content_policy", "jurisdiction", "contact_info"]

[capabilities.pdf_render]
url = "http://pdf.internal/render"
api_key_env = "PDF_KEY"

[teams.carolina-law]
name = "Carolina Law Group"
owner_email = "intake@carolina.test"
brand_color = "#224466"
available_services = ["Family Law", "Employment Law"]

[teams.carolina-law.jurisdiction]
supported_states = ["NC", "SC"]
requires_location = true
"##;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.store.backend, StoreBackend::File);
    assert!(config.store.optimistic_concurrency);
    assert_eq!(config.pipeline.middleware.len(), 3);

    let pdf = config.capabilities.pdf_render.as_ref().unwrap();
    assert_eq!(pdf.timeout_ms, 30_000);
    assert_eq!(pdf.api_key_env.as_deref(), Some("PDF_KEY"));

    let team = &config.teams["carolina-law"];
    assert_eq!(team.brand_color, "#224466");
    let jurisdiction = team.jurisdiction.as_ref().unwrap();
    assert!(jurisdiction.requires_location);
    assert!(jurisdiction.supports("Charlotte, NC"));
    assert!(!jurisdiction.supports("Texas"));

    assert!(config
        .validate()
        .iter()
        .all(|e| e.severity != ConfigSeverity::Error));
}

#[test]
fn unknown_rule_category_is_reported() {
    let toml_str = r#"
[rules.extra_patterns]
telepathy = ['\bmind\s+reading\b']
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert!(config
        .validate()
        .iter()
        .any(|e| e.field == "rules.extra_patterns.telepathy" && e.severity == ConfigSeverity::Error));
}
