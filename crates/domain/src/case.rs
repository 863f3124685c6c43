//! Case drafts: the structured, incrementally built summary of a client's
//! situation that can later be exported as a PDF.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse urgency classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" | "routine" => Some(Self::Low),
            "medium" | "normal" => Some(Self::Medium),
            "high" | "urgent" | "emergency" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    #[default]
    Draft,
    Final,
}

/// In-progress case summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDraft {
    pub matter_type: String,
    #[serde(default)]
    pub key_facts: Vec<String>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub parties: Vec<String>,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub status: CaseStatus,
}

impl CaseDraft {
    pub fn new(matter_type: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            matter_type: matter_type.into(),
            key_facts: Vec::new(),
            timeline: None,
            parties: Vec::new(),
            documents: Vec::new(),
            evidence: Vec::new(),
            jurisdiction: None,
            urgency: Urgency::Medium,
            created_at: now,
            updated_at: now,
            status: CaseStatus::Draft,
        }
    }

    /// Append facts not already present, preserving order.
    pub fn add_facts<I, S>(&mut self, facts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for fact in facts {
            let fact = fact.into();
            if !fact.trim().is_empty() && !self.key_facts.contains(&fact) {
                self.key_facts.push(fact);
            }
        }
    }

    pub fn add_party(&mut self, party: impl Into<String>) {
        let party = party.into();
        if !party.trim().is_empty() && !self.parties.contains(&party) {
            self.parties.push(party);
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
