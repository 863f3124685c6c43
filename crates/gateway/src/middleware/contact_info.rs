//! Picks contact details out of free text, validates them and records
//! them on the context.

use async_trait::async_trait;

use li_domain::config::TeamConfig;
use li_domain::context::{ContactInfo, ConversationContext, SafetyFlag};
use li_domain::error::Result;
use li_domain::message::{self, Message};
use li_domain::rules::{RuleCategory, RuleTable};

use super::file_analysis::file_id;
use super::jurisdiction;
use super::validation::{self, ContactValidation};
use crate::pipeline::{Middleware, MiddlewareResult, PipelineEnv};

pub struct ContactInfoCollector;

/// Whether a later stage has work this turn (new uploads, a case-draft
/// or PDF request). Contact details are then recorded without replying.
fn later_stage_pending(text: &str, context: &ConversationContext, rules: &RuleTable) -> bool {
    let new_upload = context
        .current_attachments
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|a| !context.is_processed(&file_id(&a.url)));
    new_upload
        || rules.matches(RuleCategory::CaseDraftRequest, text)
        || rules.matches(RuleCategory::PdfRequest, text)
}

/// Out-of-area advisory for a newly accepted location, flagged once per
/// place. The conversation continues either way.
fn location_advisory(
    context: &mut ConversationContext,
    location: Option<&str>,
    team: &TeamConfig,
    rules: &RuleTable,
) -> Option<String> {
    let jurisdiction = team.jurisdiction.as_ref().filter(|j| j.is_well_formed())?;
    let location = location.map(str::trim).filter(|l| !l.is_empty())?;
    if jurisdiction.supports(location) {
        return None;
    }
    let place = rules.detect_us_state(location).unwrap_or(location).to_owned();
    if context.has_safety_flag(SafetyFlag::OutOfJurisdiction)
        && context.jurisdiction.as_deref() == Some(place.as_str())
    {
        return None;
    }
    let warning = jurisdiction::out_of_area_message(&place, jurisdiction);
    jurisdiction::record_out_of_area(context, place);
    Some(warning)
}

#[async_trait]
impl Middleware for ContactInfoCollector {
    fn name(&self) -> &'static str {
        "contact_info"
    }

    async fn execute(
        &self,
        messages: &[Message],
        mut context: ConversationContext,
        team: &TeamConfig,
        env: &PipelineEnv,
    ) -> Result<MiddlewareResult> {
        let Some(text) = message::latest_user_text(messages) else {
            return Ok(MiddlewareResult::pass(context));
        };

        let mut extracted = env.rules.extract_contact(text);
        if extracted.name.as_deref().is_some_and(validation::is_sentence_word) {
            extracted.name = None;
        }
        // A bare location is left to the jurisdiction stage and the agent.
        if extracted.name.is_none() && extracted.email.is_none() && extracted.phone.is_none() {
            return Ok(MiddlewareResult::pass(context));
        }

        let input = ContactInfo {
            name: extracted.name,
            email: extracted.email,
            phone: extracted.phone,
            location: extracted.location,
        };

        match validation::validate_contact(&input, context.contact_info(), team) {
            ContactValidation::Rejected { field, message } => {
                tracing::info!(session_id = %context.session_id(), field, "contact info rejected");
                Ok(MiddlewareResult::respond(context, message))
            }
            ContactValidation::Accepted { contact, warnings } => {
                if !warnings.is_empty() {
                    tracing::warn!(session_id = %context.session_id(), ?warnings, "contact info accepted with warnings");
                }
                context.merge_contact(&contact);
                let advisory =
                    location_advisory(&mut context, contact.location.as_deref(), team, &env.rules);
                if later_stage_pending(text, &context, &env.rules) {
                    return Ok(MiddlewareResult::pass(context));
                }
                let mut reply = validation::acknowledgement(
                    context.contact_info(),
                    !context.established_matters().is_empty(),
                );
                if let Some(advisory) = advisory {
                    reply.push_str("\n\n");
                    reply.push_str(&advisory);
                }
                Ok(MiddlewareResult::respond(context, reply))
            }
        }
    }
}
