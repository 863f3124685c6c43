//! Ordered middleware execution for one conversational turn.
//!
//! Stages run strictly in sequence against a shared context. The first
//! stage that produces a non-empty response ends the run; a stage that
//! signals `should_stop` without a response ends it too, leaving the turn
//! to the intake agent. A stage that errors or panics is logged and
//! skipped with the context it was given left untouched.

pub mod observe;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde::Serialize;

use li_capabilities::{DocumentAnalyzer, PdfRenderer};
use li_domain::config::{PipelineConfig, TeamConfig};
use li_domain::context::ConversationContext;
use li_domain::error::{Error, Result};
use li_domain::message::Message;
use li_domain::rules::RuleTable;
use li_domain::trace::TraceEvent;

use crate::middleware;

/// Sentinel returned when no stage answered and the agent must take over.
pub const AI_HANDLE: &str = "AI_HANDLE";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Environment
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process-wide collaborators every stage may use.
pub struct PipelineEnv {
    pub rules: Arc<RuleTable>,
    pub analyzer: Arc<dyn DocumentAnalyzer>,
    pub renderer: Arc<dyn PdfRenderer>,
    pub config: PipelineConfig,
}

impl PipelineEnv {
    pub fn capability_timeout(&self) -> Duration {
        Duration::from_secs(self.config.capability_timeout_secs)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Middleware contract
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug)]
pub struct MiddlewareResult {
    pub context: ConversationContext,
    pub response: Option<String>,
    pub should_stop: bool,
}

impl MiddlewareResult {
    /// Nothing to say; continue with the (possibly mutated) context.
    pub fn pass(context: ConversationContext) -> Self {
        Self { context, response: None, should_stop: false }
    }

    /// Final answer for this turn.
    pub fn respond(context: ConversationContext, response: impl Into<String>) -> Self {
        Self { context, response: Some(response.into()), should_stop: true }
    }

    /// Informational reply that does not mark the conversation as halted.
    /// Still ends this run because it carries a response.
    pub fn advise(context: ConversationContext, response: impl Into<String>) -> Self {
        Self { context, response: Some(response.into()), should_stop: false }
    }

    fn has_response(&self) -> bool {
        self.response.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        messages: &[Message],
        context: ConversationContext,
        team: &TeamConfig,
        env: &PipelineEnv,
    ) -> Result<MiddlewareResult>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Runner
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum PipelineResponse {
    /// A stage answered; return this text verbatim.
    Canned(String),
    /// No stage answered; hand the turn to the agent.
    AiHandle,
}

impl PipelineResponse {
    pub fn as_text(&self) -> &str {
        match self {
            Self::Canned(text) => text,
            Self::AiHandle => AI_HANDLE,
        }
    }
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub context: ConversationContext,
    pub response: PipelineResponse,
    pub middleware_used: Vec<String>,
}

pub struct Pipeline {
    stages: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn Middleware>>) -> Self {
        Self { stages }
    }

    /// Build from configured stage names, in the given order.
    pub fn from_names(names: &[String]) -> Result<Self> {
        let stages = names
            .iter()
            .map(|name| {
                middleware::by_name(name)
                    .ok_or_else(|| Error::Config(format!("unknown middleware '{name}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(stages))
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order. Never fails: stage errors and panics are
    /// logged and that stage's effect is dropped. `current_attachments` is
    /// always cleared on the returned context.
    pub async fn run(
        &self,
        messages: &[Message],
        context: ConversationContext,
        team: &TeamConfig,
        env: &PipelineEnv,
    ) -> PipelineOutcome {
        let mut context = context;
        let mut middleware_used = Vec::new();
        let mut response = PipelineResponse::AiHandle;

        for stage in &self.stages {
            let name = stage.name();
            let attempt = AssertUnwindSafe(stage.execute(messages, context.clone(), team, env))
                .catch_unwind()
                .await;

            let result = match attempt {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    tracing::warn!(middleware = name, error = %e, "middleware failed, skipping");
                    TraceEvent::MiddlewareFailed {
                        middleware: name.to_owned(),
                        error: e.to_string(),
                    }
                    .emit();
                    continue;
                }
                Err(panic) => {
                    let error = panic_message(panic.as_ref());
                    tracing::error!(middleware = name, error = %error, "middleware panicked, skipping");
                    TraceEvent::MiddlewareFailed {
                        middleware: name.to_owned(),
                        error,
                    }
                    .emit();
                    continue;
                }
            };

            let responded = result.has_response();
            TraceEvent::MiddlewareCompleted {
                middleware: name.to_owned(),
                responded,
                stopped: result.should_stop,
            }
            .emit();

            context = result.context;
            middleware_used.push(name.to_owned());

            if responded {
                response = PipelineResponse::Canned(result.response.unwrap_or_default());
                break;
            }
            if result.should_stop {
                break;
            }
        }

        context.current_attachments = None;
        context.touch();

        TraceEvent::PipelineCompleted {
            session_id: context.session_id().to_owned(),
            middleware_used: middleware_used.clone(),
            short_circuited: matches!(response, PipelineResponse::Canned(_)),
        }
        .emit();

        PipelineOutcome {
            context,
            response,
            middleware_used,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".into()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use li_capabilities::{UnavailableAnalyzer, UnavailableRenderer};
    use li_domain::context::SafetyFlag;

    pub(crate) fn test_env() -> PipelineEnv {
        PipelineEnv {
            rules: Arc::new(RuleTable::builtin().unwrap()),
            analyzer: Arc::new(UnavailableAnalyzer),
            renderer: Arc::new(UnavailableRenderer),
            config: PipelineConfig::default(),
        }
    }

    /// Scripted stage for exercising runner semantics.
    enum Script {
        Flag,
        Fail,
        Panic,
        Stop,
        Answer(&'static str),
    }

    struct Scripted(&'static str, Script);

    #[async_trait]
    impl Middleware for Scripted {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn execute(
            &self,
            _messages: &[Message],
            mut context: ConversationContext,
            _team: &TeamConfig,
            _env: &PipelineEnv,
        ) -> Result<MiddlewareResult> {
            match self.1 {
                Script::Flag => {
                    context.add_safety_flag(SafetyFlag::SpamContent);
                    Ok(MiddlewareResult::pass(context))
                }
                Script::Fail => {
                    context.add_matter("Should Not Stick");
                    Err(Error::Other("boom".into()))
                }
                Script::Panic => panic!("stage exploded"),
                Script::Stop => Ok(MiddlewareResult {
                    context,
                    response: Some("   ".into()),
                    should_stop: true,
                }),
                Script::Answer(text) => Ok(MiddlewareResult::respond(context, text)),
            }
        }
    }

    fn pipeline(stages: Vec<Scripted>) -> Pipeline {
        Pipeline::new(
            stages
                .into_iter()
                .map(|s| Arc::new(s) as Arc<dyn Middleware>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn empty_pipeline_hands_off_to_agent() {
        let out = Pipeline::new(Vec::new())
            .run(&[], ConversationContext::new("s", "t"), &TeamConfig::default(), &test_env())
            .await;
        assert_eq!(out.response, PipelineResponse::AiHandle);
        assert_eq!(out.response.as_text(), AI_HANDLE);
        assert!(out.middleware_used.is_empty());
    }

    #[tokio::test]
    async fn failing_and_panicking_stages_are_isolated() {
        let p = pipeline(vec![
            Scripted("flag", Script::Flag),
            Scripted("fail", Script::Fail),
            Scripted("panic", Script::Panic),
            Scripted("answer", Script::Answer("done")),
        ]);
        let out = p
            .run(&[], ConversationContext::new("s", "t"), &TeamConfig::default(), &test_env())
            .await;
        assert_eq!(out.response, PipelineResponse::Canned("done".into()));
        assert_eq!(out.middleware_used, vec!["flag", "answer"]);
        assert_eq!(out.context.safety_flags(), [SafetyFlag::SpamContent]);
        assert!(out.context.established_matters().is_empty());
    }

    #[tokio::test]
    async fn first_response_short_circuits() {
        let p = pipeline(vec![
            Scripted("first", Script::Answer("one")),
            Scripted("second", Script::Answer("two")),
        ]);
        let out = p
            .run(&[], ConversationContext::new("s", "t"), &TeamConfig::default(), &test_env())
            .await;
        assert_eq!(out.response.as_text(), "one");
        assert_eq!(out.middleware_used, vec!["first"]);
    }

    #[tokio::test]
    async fn stop_without_response_still_hands_off() {
        let p = pipeline(vec![
            Scripted("stop", Script::Stop),
            Scripted("never", Script::Answer("unreachable")),
        ]);
        let mut ctx = ConversationContext::new("s", "t");
        ctx.current_attachments = Some(Vec::new());
        let out = p.run(&[], ctx, &TeamConfig::default(), &test_env()).await;
        assert_eq!(out.response, PipelineResponse::AiHandle);
        assert_eq!(out.middleware_used, vec!["stop"]);
        assert!(out.context.current_attachments.is_none());
    }

    #[test]
    fn from_names_rejects_unknown_stage() {
        assert!(Pipeline::from_names(&["content_policy".into(), "nope".into()]).is_err());
        let p = Pipeline::from_names(&PipelineConfig::default().middleware).unwrap();
        assert_eq!(p.stage_names()[0], "content_policy");
        assert_eq!(p.stage_names().len(), 6);
    }
}
