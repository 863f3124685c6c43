use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Extra patterns appended to the built-in rule table at startup.
///
/// ```toml
/// [rules.extra_patterns]
/// jailbreak = ['\bsudo\s+mode\b']
///
/// [rules.extra_matters]
/// "Veterans Benefits" = ['\bva\s+benefits\b']
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Keyed by rule category name (`jailbreak`, `pdf_request`, ...).
    #[serde(default)]
    pub extra_patterns: BTreeMap<String, Vec<String>>,
    /// Keyed by matter label. An existing label gains patterns; a new one
    /// is appended after the built-in taxonomy.
    #[serde(default)]
    pub extra_matters: BTreeMap<String, Vec<String>>,
}
