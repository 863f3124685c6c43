//! Case-draft builder: turns an explicit "build my case" request into a
//! structured draft on the context and a readable summary.
//!
//! Extraction is keyword-driven and best-effort.

use async_trait::async_trait;
use chrono::Utc;

use li_domain::case::{CaseDraft, Urgency};
use li_domain::config::TeamConfig;
use li_domain::context::ConversationContext;
use li_domain::error::Result;
use li_domain::message::{self, Message};
use li_domain::rules::{RuleCategory, RuleTable};

use crate::pipeline::{Middleware, MiddlewareResult, PipelineEnv};

/// Label used when no matter can be identified.
pub const GENERAL_MATTER: &str = "General Consultation";

/// Topic keywords and the fact each one contributes to a draft.
const FACT_TABLE: &[(&[&str], &str)] = &[
    (
        &["fired", "terminated", "termination", "laid off", "let go"],
        "Client reports termination of employment",
    ),
    (
        &["divorce", "separation", "separated"],
        "Client is pursuing or responding to a divorce or separation",
    ),
    (
        &["contract", "agreement", "breach"],
        "Dispute involves the terms of a contract or agreement",
    ),
    (
        &["injury", "injured", "accident", "hurt"],
        "Client reports a physical injury",
    ),
];

const NEXT_STEPS: &[&str] = &[
    "Review the facts above and tell me anything that is missing or incorrect",
    "Gather related documents (contracts, letters, photos, receipts) and upload them here",
    "Share your name and the best way to reach you so an attorney can follow up",
    "Ask me to generate a PDF of this case draft when you're ready",
];

pub struct CaseDraftBuilder;

/// Canned facts triggered by topic keywords in `text`, in table order.
pub fn keyword_facts(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    FACT_TABLE
        .iter()
        .filter(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, fact)| *fact)
        .collect()
}

/// What one request contributes to the draft.
#[derive(Debug, Default)]
pub struct DraftUpdate {
    pub matter_type: Option<String>,
    pub facts: Vec<String>,
    pub urgency: Option<Urgency>,
    pub jurisdiction: Option<String>,
    pub opposing_party: Option<String>,
}

/// Create the draft if absent, otherwise update it in place. Returns the
/// resulting draft.
pub fn upsert_draft<'a>(context: &'a mut ConversationContext, update: DraftUpdate) -> &'a CaseDraft {
    let now = Utc::now();
    let fallback_matter = context
        .established_matters()
        .first()
        .cloned()
        .unwrap_or_else(|| GENERAL_MATTER.to_owned());
    let timeline = context.timeline.clone();
    let context_urgency = context.urgency_level;
    let context_jurisdiction = context.jurisdiction.clone();

    let draft = context.case_draft.get_or_insert_with(|| {
        let mut fresh = CaseDraft::new(fallback_matter, now);
        fresh.urgency = context_urgency.unwrap_or_default();
        fresh
    });

    if let Some(matter) = update.matter_type {
        draft.matter_type = matter;
    }
    if let Some(urgency) = update.urgency.or(context_urgency) {
        draft.urgency = urgency;
    }
    if let Some(jurisdiction) = update.jurisdiction.or(context_jurisdiction) {
        draft.jurisdiction = Some(jurisdiction);
    }
    if timeline.is_some() {
        draft.timeline = timeline;
    }
    if let Some(party) = update.opposing_party {
        draft.add_party(party);
    }
    draft.add_facts(update.facts);
    draft.touch(now);
    draft
}

pub fn render_summary(draft: &CaseDraft) -> String {
    let mut out = String::from("**Case Draft Summary**\n\n");
    out.push_str(&format!("**Matter Type:** {}\n", draft.matter_type));
    out.push_str(&format!(
        "**Jurisdiction:** {}\n",
        draft.jurisdiction.as_deref().unwrap_or("Not yet specified")
    ));
    out.push_str(&format!("**Urgency:** {}\n", draft.urgency.as_str()));
    if let Some(timeline) = &draft.timeline {
        out.push_str(&format!("**Timeline:** {timeline}\n"));
    }

    out.push_str("\n**Key Facts Identified:**\n");
    if draft.key_facts.is_empty() {
        out.push_str("1. No specific facts identified yet. Tell me more about what happened.\n");
    } else {
        for (i, fact) in draft.key_facts.iter().enumerate() {
            out.push_str(&format!("{}. {fact}\n", i + 1));
        }
    }

    out.push_str("\n**Next Steps:**\n");
    for step in NEXT_STEPS {
        out.push_str(&format!("- {step}\n"));
    }
    out
}

fn update_from_text(text: &str, rules: &RuleTable) -> DraftUpdate {
    DraftUpdate {
        matter_type: rules.detect_matters(text).first().map(|m| (*m).to_owned()),
        facts: keyword_facts(text).into_iter().map(str::to_owned).collect(),
        urgency: rules.detect_urgency(text),
        jurisdiction: rules.detect_us_state(text).map(str::to_owned),
        opposing_party: None,
    }
}

#[async_trait]
impl Middleware for CaseDraftBuilder {
    fn name(&self) -> &'static str {
        "case_draft"
    }

    async fn execute(
        &self,
        messages: &[Message],
        mut context: ConversationContext,
        _team: &TeamConfig,
        env: &PipelineEnv,
    ) -> Result<MiddlewareResult> {
        let Some(text) = message::latest_user_text(messages) else {
            return Ok(MiddlewareResult::pass(context));
        };
        // "Create a PDF of my case draft" belongs to the export stage.
        if !env.rules.matches(RuleCategory::CaseDraftRequest, text)
            || env.rules.matches(RuleCategory::PdfRequest, text)
        {
            return Ok(MiddlewareResult::pass(context));
        }

        let created = context.case_draft.is_none();
        let summary = render_summary(upsert_draft(&mut context, update_from_text(text, &env.rules)));
        tracing::info!(
            session_id = %context.session_id(),
            created,
            "case draft updated"
        );
        Ok(MiddlewareResult::respond(context, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::test_env;
    use li_domain::case::CaseStatus;

    async fn run(text: &str, ctx: ConversationContext) -> MiddlewareResult {
        CaseDraftBuilder
            .execute(&[Message::user(text)], ctx, &TeamConfig::default(), &test_env())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn builds_draft_from_request() {
        let out = run(
            "build a case draft for my contract dispute, it's urgent",
            ConversationContext::new("s", "t"),
        )
        .await;
        assert!(out.should_stop);
        let draft = out.context.case_draft.as_ref().unwrap();
        assert_eq!(draft.matter_type, "Contract Review");
        assert_eq!(draft.urgency, Urgency::High);
        assert_eq!(draft.status, CaseStatus::Draft);

        let text = out.response.unwrap();
        assert!(text.contains("**Key Facts Identified:**\n1. Dispute involves the terms of a contract"));
        assert!(text.contains("**Next Steps:**"));
    }

    #[tokio::test]
    async fn second_request_updates_in_place() {
        let first = run("organize my case, I was fired", ConversationContext::new("s", "t")).await;
        let created_at = first.context.case_draft.as_ref().unwrap().created_at;

        let second = run("organize my case, I was also injured in Ohio", first.context).await;
        let draft = second.context.case_draft.as_ref().unwrap();
        assert_eq!(draft.created_at, created_at);
        assert_eq!(draft.key_facts.len(), 2);
        assert_eq!(draft.jurisdiction.as_deref(), Some("Ohio"));
        assert!(draft.updated_at >= created_at);
    }

    #[tokio::test]
    async fn ignores_unrelated_and_pdf_requests() {
        let out = run("my landlord kept the deposit", ConversationContext::new("s", "t")).await;
        assert!(out.response.is_none());

        let out = run("create a pdf of my case draft", ConversationContext::new("s", "t")).await;
        assert!(out.response.is_none());
        assert!(out.context.case_draft.is_none());
    }

    #[test]
    fn fallback_matter_comes_from_context() {
        let mut ctx = ConversationContext::new("s", "t");
        assert_eq!(upsert_draft(&mut ctx, DraftUpdate::default()).matter_type, GENERAL_MATTER);

        let mut ctx = ConversationContext::new("s", "t");
        ctx.add_matter("Family Law");
        assert_eq!(upsert_draft(&mut ctx, DraftUpdate::default()).matter_type, "Family Law");
        assert!(ctx.established_matters().iter().all(|m| m != GENERAL_MATTER));
    }
}
