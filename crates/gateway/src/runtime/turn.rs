use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;

use li_capabilities::{AgentRequest, IntakeAgent};
use li_domain::config::TeamConfig;
use li_domain::context::ConversationContext;
use li_domain::error::Error;
use li_domain::message::{self, Message};
use li_sessions::context_key;

use crate::pipeline::observe::observe_turn;
use crate::pipeline::{PipelineResponse, AI_HANDLE};
use crate::state::AppState;
use crate::tools::{self, ToolResponse};

use super::{ToolResultRecord, TurnError, TurnInput, TurnOutput, TurnReply, AGENT_FALLBACK};

/// Run one conversational turn end to end.
///
/// Only an unknown team, a session that stays busy, or a context-store
/// failure produce an error; everything else ends in a reply.
pub async fn run_turn(state: &AppState, input: TurnInput) -> Result<TurnOutput, TurnError> {
    let team = state
        .team(&input.team_id)
        .cloned()
        .ok_or_else(|| TurnError::UnknownTeam(input.team_id.clone()))?;

    let key = context_key(&input.session_id, &input.team_id);
    let _permit = state.session_locks.acquire(&key).await?;

    let span = tracing::info_span!(
        "turn",
        session_id = %input.session_id,
        team_id = %input.team_id,
    );
    run_locked(state, &team, key, input).instrument(span).await
}

async fn run_locked(
    state: &AppState,
    team: &TeamConfig,
    key: String,
    input: TurnInput,
) -> Result<TurnOutput, TurnError> {
    let TurnInput { session_id, team_id, messages, attachments } = input;

    // 1. Load and fold in the new turn.
    let mut ctx = state.store.load(&session_id, &team_id).await?;
    let loaded_revision = ctx.revision;
    observe_turn(&mut ctx, &messages, attachments, &state.env.rules);

    // 2. Middleware.
    let outcome = state.pipeline.run(&messages, ctx, team, &state.env).await;
    let mut ctx = outcome.context;

    // 3. Agent, when nobody answered.
    let (reply, tool_results) = match outcome.response {
        PipelineResponse::Canned(text) => (TurnReply::Middleware { text }, Vec::new()),
        PipelineResponse::AiHandle => match &state.agent {
            Some(agent) => run_agent(state, agent, team, &mut ctx, &messages).await,
            None => (
                TurnReply::AiHandle { sentinel: AI_HANDLE.to_owned() },
                Vec::new(),
            ),
        },
    };
    ctx.refresh_derived(message::latest_user_text(&messages), &state.env.rules);

    // 4. Persist.
    if state.config.store.optimistic_concurrency {
        if !state.store.compare_and_save(&mut ctx, loaded_revision).await? {
            let found = state
                .store
                .get(&session_id, &team_id)
                .await?
                .map(|c| c.revision)
                .unwrap_or(0);
            return Err(Error::StoreConflict {
                key,
                expected: loaded_revision,
                found,
            }
            .into());
        }
    } else {
        state.store.save(&mut ctx).await?;
    }

    tracing::info!(
        middleware_used = ?outcome.middleware_used,
        reply = reply_kind(&reply),
        tools = tool_results.len(),
        phase = ?ctx.conversation_phase(),
        "turn complete"
    );

    Ok(TurnOutput {
        session_id,
        reply,
        middleware_used: outcome.middleware_used,
        tool_results,
        context: ctx,
    })
}

fn reply_kind(reply: &TurnReply) -> &'static str {
    match reply {
        TurnReply::Middleware { .. } => "middleware",
        TurnReply::Agent { .. } => "agent",
        TurnReply::AiHandle { .. } => "ai_handle",
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Call the agent, dispatch its tool calls against `ctx` and feed the
/// results back, for at most `max_tool_rounds` rounds.
async fn run_agent(
    state: &AppState,
    agent: &Arc<dyn IntakeAgent>,
    team: &TeamConfig,
    ctx: &mut ConversationContext,
    messages: &[Message],
) -> (TurnReply, Vec<ToolResultRecord>) {
    let definitions = tools::tool_definitions();
    let mut transcript = messages.to_vec();
    let mut results = Vec::new();
    let mut last_text = String::new();

    for round in 0..state.env.config.max_tool_rounds {
        let req = AgentRequest {
            session_id: ctx.session_id().to_owned(),
            team_id: ctx.team_id().to_owned(),
            messages: transcript.clone(),
            tools: definitions.clone(),
            context: serde_json::to_value(&*ctx).unwrap_or(Value::Null),
        };

        let reply = match tokio::time::timeout(state.env.capability_timeout(), agent.respond(req)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, round, "intake agent failed");
                return (TurnReply::Agent { text: AGENT_FALLBACK.into() }, results);
            }
            Err(_) => {
                tracing::warn!(round, "intake agent timed out");
                return (TurnReply::Agent { text: AGENT_FALLBACK.into() }, results);
            }
        };

        if !reply.text.trim().is_empty() {
            last_text = reply.text.clone();
        }
        if reply.tool_calls.is_empty() {
            let text = if last_text.is_empty() { AGENT_FALLBACK.to_owned() } else { last_text };
            return (TurnReply::Agent { text }, results);
        }
        if !reply.text.trim().is_empty() {
            transcript.push(Message::assistant(reply.text));
        }

        for call in reply.tool_calls {
            let response =
                match tools::dispatch_call(&call.tool_name, &call.arguments, ctx, team, &state.env).await {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::warn!(tool = %call.tool_name, error = %e, "tool call rejected");
                        ToolResponse::fail(e.to_string())
                    }
                };
            let content = serde_json::to_string(&response).unwrap_or_default();
            transcript.push(Message::tool_result(call.call_id.clone(), content));
            results.push(ToolResultRecord {
                call_id: call.call_id,
                tool_name: call.tool_name,
                response,
            });
        }
    }

    tracing::warn!(
        max_rounds = state.env.config.max_tool_rounds,
        "agent hit the tool round limit"
    );
    let text = if last_text.is_empty() { AGENT_FALLBACK.to_owned() } else { last_text };
    (TurnReply::Agent { text }, results)
}
