mod capabilities;
mod observability;
mod pipeline;
mod rules;
mod server;
mod store;
mod team;

pub use capabilities::*;
pub use observability::*;
pub use pipeline::*;
pub use rules::*;
pub use server::*;
pub use store::*;
pub use team::*;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::rules::RuleCategory;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
    /// Team configurations (key = team_id).
    #[serde(default)]
    pub teams: HashMap<String, TeamConfig>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. Empty when
    /// everything looks good. Rule regexes are checked when the rule table
    /// is compiled, not here.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.server.cors.allowed_origins.len() == 1 && self.server.cors.allowed_origins[0] == "*" {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        if self.store.ttl_secs == 0 {
            errors.push(ConfigError::warning(
                "store.ttl_secs",
                "ttl of 0 expires every context immediately",
            ));
        }

        // Middleware names must be known and unique.
        let mut seen = HashSet::new();
        for (i, name) in self.pipeline.middleware.iter().enumerate() {
            if !KNOWN_MIDDLEWARE.contains(&name.as_str()) {
                errors.push(ConfigError::error(
                    format!("pipeline.middleware[{i}]"),
                    format!("unknown middleware '{name}' (known: {})", KNOWN_MIDDLEWARE.join(", ")),
                ));
            } else if !seen.insert(name.as_str()) {
                errors.push(ConfigError::error(
                    format!("pipeline.middleware[{i}]"),
                    format!("middleware '{name}' listed twice"),
                ));
            }
        }
        if let (Some(policy), Some(first_matter_stage)) = (
            self.pipeline.middleware.iter().position(|m| m == "content_policy"),
            self.pipeline
                .middleware
                .iter()
                .position(|m| m == "case_draft" || m == "contact_info"),
        ) {
            if policy > first_matter_stage {
                errors.push(ConfigError::warning(
                    "pipeline.middleware",
                    "content_policy runs after a stage that can create matters",
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.pipeline.repetition_max_unique_ratio) {
            errors.push(ConfigError::error(
                "pipeline.repetition_max_unique_ratio",
                "ratio must be between 0.0 and 1.0",
            ));
        }
        if self.pipeline.capability_timeout_secs == 0 {
            errors.push(ConfigError::error(
                "pipeline.capability_timeout_secs",
                "timeout must be greater than 0",
            ));
        }

        for name in self.rules.extra_patterns.keys() {
            if RuleCategory::from_name(name).is_none() {
                errors.push(ConfigError::error(
                    format!("rules.extra_patterns.{name}"),
                    "unknown rule category",
                ));
            }
        }

        let endpoints = [
            ("capabilities.document_analysis", &self.capabilities.document_analysis),
            ("capabilities.pdf_render", &self.capabilities.pdf_render),
            ("capabilities.agent", &self.capabilities.agent),
        ];
        for (field, endpoint) in endpoints {
            match endpoint {
                Some(ep) if ep.url.trim().is_empty() => {
                    errors.push(ConfigError::error(format!("{field}.url"), "url must not be empty"));
                }
                None => errors.push(ConfigError::warning(field, "not configured; capability disabled")),
                _ => {}
            }
        }

        if self.teams.is_empty() {
            errors.push(ConfigError::warning("teams", "no teams configured; every turn will be rejected"));
        }
        let mut team_ids: Vec<&String> = self.teams.keys().collect();
        team_ids.sort();
        for id in team_ids {
            if let Some(jurisdiction) = self.teams[id].jurisdiction.as_ref() {
                if !jurisdiction.is_well_formed() {
                    errors.push(ConfigError::warning(
                        format!("teams.{id}.jurisdiction"),
                        "no supported states or countries; jurisdiction checks are skipped",
                    ));
                }
            }
        }

        errors
    }
}
