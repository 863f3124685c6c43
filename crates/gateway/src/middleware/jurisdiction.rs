//! Service-area check. Advisory only: an out-of-area location is flagged
//! and the user is told once, but the conversation carries on.

use async_trait::async_trait;

use li_domain::config::{JurisdictionConfig, TeamConfig};
use li_domain::context::{ConversationContext, SafetyFlag};
use li_domain::error::Result;
use li_domain::message::{self, Message};
use li_domain::rules::RuleTable;
use li_domain::trace::TraceEvent;

use crate::pipeline::{Middleware, MiddlewareResult, PipelineEnv};

pub struct JurisdictionValidator;

pub fn out_of_area_message(location: &str, jurisdiction: &JurisdictionConfig) -> String {
    format!(
        "It looks like you're located in {location}. Our firm primarily serves {}. \
         You're welcome to keep going: share the details of your situation and we'll \
         let you know whether we can help or point you to someone who can.",
        jurisdiction.describe()
    )
}

pub fn location_request_message(jurisdiction: &JurisdictionConfig) -> String {
    format!(
        "Before we go further, could you tell me which state you're located in? \
         Our firm serves {}, so your location helps us confirm we can assist.",
        jurisdiction.describe()
    )
}

/// Flag `location` as outside the service area and remember it, so the
/// advisory is not repeated for the same place.
pub fn record_out_of_area(context: &mut ConversationContext, location: String) {
    tracing::info!(
        session_id = %context.session_id(),
        location = %location,
        "location outside service area"
    );
    TraceEvent::JurisdictionAdvisory {
        session_id: context.session_id().to_owned(),
        location: location.clone(),
    }
    .emit();
    context.jurisdiction = Some(location);
    context.add_safety_flag(SafetyFlag::OutOfJurisdiction);
}

/// Best available location for this turn, most authoritative first.
fn resolve_location(
    context: &ConversationContext,
    latest: Option<&str>,
    rules: &RuleTable,
) -> Option<String> {
    if let Some(known) = context.jurisdiction.as_deref().filter(|j| !j.trim().is_empty()) {
        return Some(known.to_owned());
    }
    if let Some(text) = latest {
        if let Some(state) = rules.detect_us_state(text) {
            return Some(state.to_owned());
        }
        if let Some(stated) = rules.extract_contact(text).location {
            return Some(stated);
        }
    }
    context.contact_info().location.clone()
}

#[async_trait]
impl Middleware for JurisdictionValidator {
    fn name(&self) -> &'static str {
        "jurisdiction"
    }

    async fn execute(
        &self,
        messages: &[Message],
        mut context: ConversationContext,
        team: &TeamConfig,
        env: &PipelineEnv,
    ) -> Result<MiddlewareResult> {
        let Some(jurisdiction) = team.jurisdiction.as_ref().filter(|j| j.is_well_formed()) else {
            return Ok(MiddlewareResult::pass(context));
        };

        let latest = message::latest_user_text(messages);
        let Some(location) = resolve_location(&context, latest, &env.rules) else {
            if jurisdiction.requires_location && latest.is_some() {
                return Ok(MiddlewareResult::advise(
                    context,
                    location_request_message(jurisdiction),
                ));
            }
            return Ok(MiddlewareResult::pass(context));
        };

        if jurisdiction.supports(&location) {
            return Ok(MiddlewareResult::pass(context));
        }

        let already_warned = context.has_safety_flag(SafetyFlag::OutOfJurisdiction)
            && context.jurisdiction.as_deref() == Some(location.as_str());
        if already_warned {
            return Ok(MiddlewareResult::pass(context));
        }

        let warning = out_of_area_message(&location, jurisdiction);
        record_out_of_area(&mut context, location);
        Ok(MiddlewareResult::advise(context, warning))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::test_env;

    fn nc_team(requires_location: bool) -> TeamConfig {
        TeamConfig {
            name: "Carolina Legal".into(),
            jurisdiction: Some(JurisdictionConfig {
                supported_states: vec!["North Carolina".into()],
                requires_location,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    async fn run(text: &str, ctx: ConversationContext, team: &TeamConfig) -> MiddlewareResult {
        JurisdictionValidator
            .execute(&[Message::user(text)], ctx, team, &test_env())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn out_of_area_warns_once_without_stopping() {
        let team = nc_team(false);
        let out = run("I was fired in Texas", ConversationContext::new("s", "t"), &team).await;
        assert!(!out.should_stop);
        assert!(out.response.as_deref().unwrap().contains("Texas"));
        assert_eq!(out.context.jurisdiction.as_deref(), Some("Texas"));
        assert!(out.context.has_safety_flag(SafetyFlag::OutOfJurisdiction));

        let again = run("what should I do next", out.context, &team).await;
        assert!(again.response.is_none());
        assert_eq!(again.context.safety_flags().len(), 1);
    }

    #[tokio::test]
    async fn supported_location_passes_unchanged() {
        let out = run("I live in Charlotte, NC", ConversationContext::new("s", "t"), &nc_team(false)).await;
        assert!(out.response.is_none());
        assert!(out.context.jurisdiction.is_none());
        assert!(out.context.safety_flags().is_empty());
    }

    #[tokio::test]
    async fn missing_or_malformed_config_fails_open() {
        let out = run("I'm in Texas", ConversationContext::new("s", "t"), &TeamConfig::default()).await;
        assert!(out.response.is_none());

        let mut team = nc_team(true);
        if let Some(j) = team.jurisdiction.as_mut() {
            j.supported_states = vec!["  ".into()];
        }
        let out = run("hello", ConversationContext::new("s", "t"), &team).await;
        assert!(out.response.is_none());
    }

    #[tokio::test]
    async fn required_location_is_requested_without_flagging() {
        let out = run("I need help with a divorce", ConversationContext::new("s", "t"), &nc_team(true)).await;
        assert!(!out.should_stop);
        assert!(out.response.as_deref().unwrap().contains("which state"));
        assert!(out.context.safety_flags().is_empty());
    }
}
