//! Exports the current case draft as a PDF. Once triggered this stage
//! always answers the turn.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use li_capabilities::{Brand, RenderRequest};
use li_domain::config::TeamConfig;
use li_domain::context::{ConversationContext, GeneratedPdf};
use li_domain::error::Result;
use li_domain::message::{self, Message};
use li_domain::rules::RuleCategory;

use crate::pipeline::{Middleware, MiddlewareResult, PipelineEnv};

pub const NO_DRAFT_RESPONSE: &str = "I don't have a case draft for you yet, so there's nothing to export. \
Tell me about your situation and say \"build a case draft\" when you're ready; then I can create the PDF.";

pub const RENDER_FAILED_RESPONSE: &str = "I wasn't able to generate the PDF just now. \
Please try again in a moment. If it keeps failing, ask me to rebuild your case draft and then request the PDF again.";

pub struct PdfGeneration;

/// `case-summary-<matter-slug>-<YYYYMMDD>.pdf`
pub fn pdf_filename(matter_type: &str, at: DateTime<Utc>) -> String {
    let mut slug = String::new();
    for c in matter_type.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "matter" } else { slug };
    format!("case-summary-{slug}-{}.pdf", at.format("%Y%m%d"))
}

pub fn brand_for(team: &TeamConfig) -> Brand {
    Brand {
        team_name: team.name.clone(),
        brand_color: team.brand_color.clone(),
        owner_email: team.owner_email.clone(),
    }
}

#[async_trait]
impl Middleware for PdfGeneration {
    fn name(&self) -> &'static str {
        "pdf_generation"
    }

    async fn execute(
        &self,
        messages: &[Message],
        mut context: ConversationContext,
        team: &TeamConfig,
        env: &PipelineEnv,
    ) -> Result<MiddlewareResult> {
        let requested = message::latest_user_text(messages)
            .is_some_and(|text| env.rules.matches(RuleCategory::PdfRequest, text));
        if !requested {
            return Ok(MiddlewareResult::pass(context));
        }

        let Some(draft) = context.case_draft.clone() else {
            return Ok(MiddlewareResult::respond(context, NO_DRAFT_RESPONSE));
        };

        let matter_type = draft.matter_type.clone();
        let req = RenderRequest {
            case_draft: draft,
            client_name: context.contact_info().name.clone(),
            brand: brand_for(team),
        };

        let outcome = match tokio::time::timeout(env.capability_timeout(), env.renderer.render(req)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!(session_id = %context.session_id(), error = %e, "pdf render failed");
                return Ok(MiddlewareResult::respond(context, RENDER_FAILED_RESPONSE));
            }
            Err(_) => {
                tracing::warn!(session_id = %context.session_id(), "pdf render timed out");
                return Ok(MiddlewareResult::respond(context, RENDER_FAILED_RESPONSE));
            }
        };

        let pdf = match outcome.pdf {
            Some(bytes) if outcome.success && !bytes.is_empty() => bytes,
            _ => {
                tracing::warn!(
                    session_id = %context.session_id(),
                    error = outcome.error.as_deref().unwrap_or("empty document"),
                    "pdf renderer reported failure"
                );
                return Ok(MiddlewareResult::respond(context, RENDER_FAILED_RESPONSE));
            }
        };

        let generated_at = Utc::now();
        let filename = pdf_filename(&matter_type, generated_at);
        let size = pdf.len() as u64;
        tracing::info!(session_id = %context.session_id(), filename = %filename, size, "pdf generated");

        let response = format!(
            "I've generated your case summary as **{filename}** ({} KB) and noted it on your intake. \
             It covers your {matter_type} matter as drafted so far, and the firm will share a copy \
             when an attorney reviews your case. Let me know if anything should be updated first.",
            size.div_ceil(1024)
        );
        context.generated_pdf = Some(GeneratedPdf {
            filename,
            size,
            generated_at,
            matter_type,
        });
        Ok(MiddlewareResult::respond(context, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use li_capabilities::{PdfRenderer, RenderOutcome};
    use li_domain::case::CaseDraft;

    use crate::pipeline::tests::test_env;

    struct FixedRenderer(RenderOutcome);

    #[async_trait]
    impl PdfRenderer for FixedRenderer {
        async fn render(&self, _req: RenderRequest) -> Result<RenderOutcome> {
            Ok(self.0.clone())
        }
    }

    fn with_draft() -> ConversationContext {
        let mut ctx = ConversationContext::new("s", "t");
        ctx.case_draft = Some(CaseDraft::new("Landlord/Tenant", Utc::now()));
        ctx
    }

    async fn run(env: &PipelineEnv, ctx: ConversationContext) -> MiddlewareResult {
        PdfGeneration
            .execute(&[Message::user("please generate a pdf")], ctx, &TeamConfig::default(), env)
            .await
            .unwrap()
    }

    #[test]
    fn filename_slugs_matter_and_dates() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(pdf_filename("Landlord/Tenant", at), "case-summary-landlord-tenant-20260309.pdf");
        assert_eq!(pdf_filename("  ", at), "case-summary-matter-20260309.pdf");
    }

    #[tokio::test]
    async fn guidance_when_no_draft() {
        let out = run(&test_env(), ConversationContext::new("s", "t")).await;
        assert!(out.should_stop);
        assert_eq!(out.response.as_deref(), Some(NO_DRAFT_RESPONSE));
    }

    #[tokio::test]
    async fn records_generated_pdf() {
        let mut env = test_env();
        env.renderer = Arc::new(FixedRenderer(RenderOutcome::rendered(vec![7u8; 3000])));
        let out = run(&env, with_draft()).await;
        let pdf = out.context.generated_pdf.as_ref().unwrap();
        assert_eq!(pdf.size, 3000);
        assert_eq!(pdf.matter_type, "Landlord/Tenant");
        assert!(pdf.filename.starts_with("case-summary-landlord-tenant-"));
        let reply = out.response.unwrap();
        assert!(reply.contains("3 KB"));
        assert!(reply.contains(&pdf.filename));
        assert!(!reply.contains("ready"));
    }

    struct StalledRenderer;

    #[async_trait]
    impl PdfRenderer for StalledRenderer {
        async fn render(&self, _req: RenderRequest) -> Result<RenderOutcome> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_renderer_times_out() {
        let mut env = test_env();
        env.renderer = Arc::new(StalledRenderer);
        let out = run(&env, with_draft()).await;
        assert!(out.should_stop);
        assert_eq!(out.response.as_deref(), Some(RENDER_FAILED_RESPONSE));
        assert!(out.context.generated_pdf.is_none());
    }

    #[tokio::test]
    async fn failures_degrade_gracefully() {
        let mut env = test_env();
        env.renderer = Arc::new(FixedRenderer(RenderOutcome::failed("template missing")));
        let out = run(&env, with_draft()).await;
        assert_eq!(out.response.as_deref(), Some(RENDER_FAILED_RESPONSE));
        assert!(out.context.generated_pdf.is_none());

        let out = run(&test_env(), with_draft()).await;
        assert_eq!(out.response.as_deref(), Some(RENDER_FAILED_RESPONSE));
    }

    #[tokio::test]
    async fn unrelated_message_passes() {
        let out = PdfGeneration
            .execute(&[Message::user("thanks")], with_draft(), &TeamConfig::default(), &test_env())
            .await
            .unwrap();
        assert!(out.response.is_none());
    }
}
