//! Per-(session, team) conversation state.
//!
//! The append-only collections and the contact record are private so the
//! monotonic rules hold by construction: matters, safety flags and the
//! processed-file ledger only grow, and contact fields are sticky once set.
//! Phase and intent are derived views, written only by
//! [`ConversationContext::refresh_derived`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::case::{CaseDraft, Urgency};
use crate::message::Attachment;
use crate::rules::{RuleCategory, RuleTable};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Enums
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Policy violations and advisories logged against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyFlag {
    JailbreakAttempt,
    NonLegalRequest,
    AbusiveContent,
    SpamContent,
    OutOfJurisdiction,
}

impl SafetyFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JailbreakAttempt => "jailbreak_attempt",
            Self::NonLegalRequest => "non_legal_request",
            Self::AbusiveContent => "abusive_content",
            Self::SpamContent => "spam_content",
            Self::OutOfJurisdiction => "out_of_jurisdiction",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserIntent {
    Intake,
    LawyerContact,
    GeneralInfo,
    #[default]
    Unclear,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    #[default]
    Initial,
    GatheringInfo,
    Qualifying,
    ContactCollection,
    Completed,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Contact info
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.location.is_none()
    }

    pub fn has_contact_method(&self) -> bool {
        self.email.is_some() || self.phone.is_some()
    }

    /// One-directional merge: a non-empty, non-placeholder incoming value
    /// replaces that field; nothing is ever cleared.
    pub fn merge(&mut self, incoming: &ContactInfo) {
        merge_field(&mut self.name, incoming.name.as_deref());
        merge_field(&mut self.email, incoming.email.as_deref());
        merge_field(&mut self.phone, incoming.phone.as_deref());
        merge_field(&mut self.location, incoming.location.as_deref());
    }
}

fn merge_field(slot: &mut Option<String>, incoming: Option<&str>) {
    if let Some(value) = incoming.map(str::trim) {
        if !value.is_empty() && !is_placeholder(value) {
            *slot = Some(value.to_owned());
        }
    }
}

const PLACEHOLDER_EXACT: &[&str] = &[
    "n/a", "na", "none", "null", "unknown", "test", "tbd", "-", "xxx", "name", "email", "phone",
];

const PLACEHOLDER_MARKERS: &[&str] = &[
    "placeholder",
    "fake",
    "asdf",
    "xxx-xxx",
    "123-456-7890",
    "1234567890",
    "555-555-5555",
    "(555) 555-5555",
    "000-000-0000",
    "test@test",
    "email@email",
    "your@email",
    "youremail",
    "user@domain",
    "noreply",
    "no-reply",
    "[",
    "{",
];

/// Fake or template values a user (or an agent) typed instead of real data.
pub fn is_placeholder(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    if PLACEHOLDER_EXACT.contains(&lower.as_str()) {
        return true;
    }
    if PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m)) {
        return true;
    }
    let digits: Vec<char> = lower.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.len() >= 7 && digits.iter().all(|d| *d == digits[0])
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Analysis, PDF and review records
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub orgs: Vec<String>,
    #[serde(default)]
    pub dates: Vec<String>,
}

/// Result of one document analysis. `confidence == 0.0` marks a failed
/// or timed-out analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub key_facts: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
}

impl DocumentAnalysis {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            confidence: 0.0,
            summary: reason.into(),
            ..Default::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.confidence > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Completed,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedFile {
    pub file_id: String,
    pub name: String,
    pub mime_type: String,
    pub analysis_type: String,
    pub analysis: DocumentAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysisRecord {
    pub status: AnalysisStatus,
    pub files: Vec<AnalyzedFile>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPdf {
    pub filename: String,
    pub size: u64,
    pub generated_at: DateTime<Utc>,
    pub matter_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawyerReviewRequest {
    pub requested_at: DateTime<Utc>,
    pub urgency: Urgency,
    #[serde(default)]
    pub complexity: Option<String>,
    #[serde(default)]
    pub matter_type: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ConversationContext
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    session_id: String,
    team_id: String,
    #[serde(default)]
    established_matters: Vec<String>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    safety_flags: Vec<SafetyFlag>,
    #[serde(default)]
    user_intent: UserIntent,
    #[serde(default)]
    conversation_phase: ConversationPhase,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub urgency_level: Option<Urgency>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub has_previous_lawyer: Option<bool>,
    #[serde(default)]
    contact_info: ContactInfo,
    #[serde(default)]
    pub case_draft: Option<CaseDraft>,
    #[serde(default)]
    processed_files: Vec<String>,
    /// Consumed once per pipeline run; always `None` after the run ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_attachments: Option<Vec<Attachment>>,
    #[serde(default)]
    pub file_analysis: Option<FileAnalysisRecord>,
    #[serde(default)]
    pub generated_pdf: Option<GeneratedPdf>,
    #[serde(default)]
    pub lawyer_review: Option<LawyerReviewRequest>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_updated: i64,
    /// Bumped by the store on every save; compare-and-save token.
    #[serde(default)]
    pub revision: u64,
}

impl ConversationContext {
    pub fn new(session_id: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            team_id: team_id.into(),
            established_matters: Vec::new(),
            jurisdiction: None,
            safety_flags: Vec::new(),
            user_intent: UserIntent::Unclear,
            conversation_phase: ConversationPhase::Initial,
            message_count: 0,
            urgency_level: None,
            timeline: None,
            has_previous_lawyer: None,
            contact_info: ContactInfo::default(),
            case_draft: None,
            processed_files: Vec::new(),
            current_attachments: None,
            file_analysis: None,
            generated_pdf: None,
            lawyer_review: None,
            last_updated: Utc::now().timestamp_millis(),
            revision: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    // ── Append-only collections ───────────────────────────────────

    pub fn established_matters(&self) -> &[String] {
        &self.established_matters
    }

    /// Returns `true` when the matter was new.
    pub fn add_matter(&mut self, label: &str) -> bool {
        let label = label.trim();
        if label.is_empty() || self.established_matters.iter().any(|m| m == label) {
            return false;
        }
        self.established_matters.push(label.to_owned());
        true
    }

    pub fn safety_flags(&self) -> &[SafetyFlag] {
        &self.safety_flags
    }

    pub fn add_safety_flag(&mut self, flag: SafetyFlag) {
        self.safety_flags.push(flag);
    }

    pub fn has_safety_flag(&self, flag: SafetyFlag) -> bool {
        self.safety_flags.contains(&flag)
    }

    pub fn processed_files(&self) -> &[String] {
        &self.processed_files
    }

    pub fn is_processed(&self, file_id: &str) -> bool {
        self.processed_files.iter().any(|f| f == file_id)
    }

    /// Returns `true` when the id was not yet in the ledger.
    pub fn mark_processed(&mut self, file_id: &str) -> bool {
        if self.is_processed(file_id) {
            return false;
        }
        self.processed_files.push(file_id.to_owned());
        true
    }

    // ── Contact info ──────────────────────────────────────────────

    pub fn contact_info(&self) -> &ContactInfo {
        &self.contact_info
    }

    pub fn merge_contact(&mut self, incoming: &ContactInfo) {
        self.contact_info.merge(incoming);
    }

    // ── Derived views ─────────────────────────────────────────────

    pub fn user_intent(&self) -> UserIntent {
        self.user_intent
    }

    pub fn conversation_phase(&self) -> ConversationPhase {
        self.conversation_phase
    }

    /// Recompute phase and intent from the current snapshot.
    pub fn refresh_derived(&mut self, latest_user_text: Option<&str>, rules: &RuleTable) {
        self.refresh_phase();
        self.user_intent = derive_intent(latest_user_text, &self.established_matters, rules);
    }

    /// Recompute the phase alone. Call after any change to contact info or
    /// matters outside a user turn.
    pub fn refresh_phase(&mut self) {
        self.conversation_phase =
            derive_phase(&self.contact_info, &self.established_matters, self.message_count);
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now().timestamp_millis();
    }
}

/// Phase as a pure function of contact info, matters and turn count.
pub fn derive_phase(
    contact: &ContactInfo,
    matters: &[String],
    message_count: u32,
) -> ConversationPhase {
    let has_name = contact.name.as_deref().is_some_and(|n| !n.trim().is_empty());
    let has_matter = !matters.is_empty();
    match (has_name, has_matter) {
        (true, true) if contact.has_contact_method() => ConversationPhase::Completed,
        (true, true) => ConversationPhase::ContactCollection,
        (_, true) => ConversationPhase::Qualifying,
        _ if message_count > 1 || !contact.is_empty() => ConversationPhase::GatheringInfo,
        _ => ConversationPhase::Initial,
    }
}

/// Intent of the latest user message, given what is already established.
pub fn derive_intent(text: Option<&str>, matters: &[String], rules: &RuleTable) -> UserIntent {
    let text = text.unwrap_or_default();
    if rules.matches(RuleCategory::LawyerContact, text) {
        UserIntent::LawyerContact
    } else if !matters.is_empty() || rules.matches(RuleCategory::IntakeSignal, text) {
        UserIntent::Intake
    } else if rules.matches(RuleCategory::GeneralInfo, text) {
        UserIntent::GeneralInfo
    } else {
        UserIntent::Unclear
    }
}
