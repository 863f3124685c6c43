use serde::{Deserialize, Serialize};

use crate::rules::{normalize_state, resolve_state};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Teams
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Read-only per-team configuration (`[teams.<team_id>]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    #[serde(default)]
    pub name: String,
    /// Service area. `None` means the team serves everywhere.
    #[serde(default)]
    pub jurisdiction: Option<JurisdictionConfig>,
    #[serde(default)]
    pub available_services: Vec<String>,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default = "d_brand_color")]
    pub brand_color: String,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            jurisdiction: None,
            available_services: Vec::new(),
            owner_email: None,
            brand_color: d_brand_color(),
        }
    }
}

fn d_brand_color() -> String {
    "#1e3a5f".into()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JurisdictionConfig {
    /// State names or postal codes; `"all"` accepts every state.
    #[serde(default)]
    pub supported_states: Vec<String>,
    /// Country names; `"all"` accepts everywhere. `US`/`USA`/`United
    /// States` accepts every US state.
    #[serde(default)]
    pub supported_countries: Vec<String>,
    #[serde(default)]
    pub primary_state: Option<String>,
    /// Ask for a location when none is known yet.
    #[serde(default)]
    pub requires_location: bool,
    #[serde(default)]
    pub description: Option<String>,
}

const US_ALIASES: &[&str] = &["us", "usa", "u.s.", "u.s.a.", "united states", "united states of america"];

impl JurisdictionConfig {
    /// A config with no non-blank entry in either list cannot answer
    /// "is this supported" and is treated as absent.
    pub fn is_well_formed(&self) -> bool {
        self.supported_states
            .iter()
            .chain(&self.supported_countries)
            .any(|s| !s.trim().is_empty())
    }

    /// Whether `location` (a state name, postal code, "City, ST" or a
    /// country) falls inside the service area.
    pub fn supports(&self, location: &str) -> bool {
        let is_all = |list: &[String]| list.iter().any(|s| s.trim().eq_ignore_ascii_case("all"));
        if is_all(&self.supported_states) || is_all(&self.supported_countries) {
            return true;
        }

        if let Some(state) = resolve_state(location) {
            let state_listed = self
                .supported_states
                .iter()
                .any(|s| normalize_state(s) == Some(state));
            let us_listed = self
                .supported_countries
                .iter()
                .any(|c| US_ALIASES.contains(&c.trim().to_lowercase().as_str()));
            return state_listed || us_listed;
        }

        let country = location.rsplit(',').next().unwrap_or(location).trim();
        self.supported_countries
            .iter()
            .any(|c| c.trim().eq_ignore_ascii_case(country) || c.trim().eq_ignore_ascii_case(location.trim()))
    }

    /// Human-readable service area for user-facing messages.
    pub fn describe(&self) -> String {
        if let Some(desc) = self.description.as_deref().filter(|d| !d.trim().is_empty()) {
            return desc.to_owned();
        }
        let mut areas: Vec<String> = self
            .supported_states
            .iter()
            .map(|s| normalize_state(s).map(str::to_owned).unwrap_or_else(|| s.trim().to_owned()))
            .collect();
        areas.extend(self.supported_countries.iter().map(|c| c.trim().to_owned()));
        areas.retain(|a| !a.is_empty());
        match areas.len() {
            0 => "our service area".into(),
            1 => areas.remove(0),
            _ => {
                let last = areas.pop().unwrap_or_default();
                format!("{} and {}", areas.join(", "), last)
            }
        }
    }
}
