//! Intake tools the agent can call, parsed into typed requests at the
//! boundary. Unknown fields or wrong types fail closed with
//! `Error::InvalidToolArguments` instead of being coerced.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use li_domain::case::Urgency;
use li_domain::config::TeamConfig;
use li_domain::context::{ContactInfo, ConversationContext, LawyerReviewRequest};
use li_domain::error::{Error, Result};
use li_domain::message::ToolDefinition;
use li_domain::trace::TraceEvent;

use crate::middleware::case_draft::{self, DraftUpdate};
use crate::middleware::file_analysis::{self, AnalysisType};
use crate::middleware::validation::{self, ContactValidation};
use crate::pipeline::PipelineEnv;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Requests and responses
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const TOOL_NAMES: &[&str] = &[
    "collect_contact_info",
    "create_matter",
    "analyze_document",
    "request_lawyer_review",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "snake_case")]
pub enum ToolRequest {
    CollectContactInfo(CollectContactInfoArgs),
    CreateMatter(CreateMatterArgs),
    AnalyzeDocument(AnalyzeDocumentArgs),
    RequestLawyerReview(RequestLawyerReviewArgs),
}

impl ToolRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CollectContactInfo(_) => "collect_contact_info",
            Self::CreateMatter(_) => "create_matter",
            Self::AnalyzeDocument(_) => "analyze_document",
            Self::RequestLawyerReview(_) => "request_lawyer_review",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectContactInfoArgs {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMatterArgs {
    pub matter_type: String,
    pub description: String,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub opposing_party: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeDocumentArgs {
    pub file_id: String,
    #[serde(default)]
    pub analysis_type: Option<String>,
    #[serde(default)]
    pub specific_question: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestLawyerReviewArgs {
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub complexity: Option<String>,
    #[serde(default)]
    pub matter_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ToolResponse {
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self { success: true, message: message.into(), data }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), data: Value::Null }
    }
}

/// Parse a raw tool call. `null` arguments are treated as `{}`.
pub fn parse_tool_call(tool_name: &str, arguments: &Value) -> Result<ToolRequest> {
    if !TOOL_NAMES.contains(&tool_name) {
        return Err(Error::UnknownTool(tool_name.to_owned()));
    }
    let arguments = if arguments.is_null() { json!({}) } else { arguments.clone() };
    serde_json::from_value(json!({ "tool": tool_name, "arguments": arguments })).map_err(|e| {
        Error::InvalidToolArguments {
            tool: tool_name.to_owned(),
            message: e.to_string(),
        }
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dispatch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse and run a raw tool call against `context`.
pub async fn dispatch_call(
    tool_name: &str,
    arguments: &Value,
    context: &mut ConversationContext,
    team: &TeamConfig,
    env: &PipelineEnv,
) -> Result<ToolResponse> {
    let request = parse_tool_call(tool_name, arguments)?;
    Ok(dispatch(request, context, team, env).await)
}

pub async fn dispatch(
    request: ToolRequest,
    context: &mut ConversationContext,
    team: &TeamConfig,
    env: &PipelineEnv,
) -> ToolResponse {
    let tool_name = request.name();
    let response = match request {
        ToolRequest::CollectContactInfo(args) => collect_contact_info(args, context, team),
        ToolRequest::CreateMatter(args) => create_matter(args, context),
        ToolRequest::AnalyzeDocument(args) => analyze_document(args, context, env).await,
        ToolRequest::RequestLawyerReview(args) => request_lawyer_review(args, context),
    };
    context.refresh_phase();
    context.touch();

    tracing::debug!(
        session_id = %context.session_id(),
        tool = tool_name,
        success = response.success,
        "tool dispatched"
    );
    TraceEvent::ToolDispatched {
        session_id: context.session_id().to_owned(),
        tool_name: tool_name.to_owned(),
        success: response.success,
    }
    .emit();
    response
}

fn collect_contact_info(
    args: CollectContactInfoArgs,
    context: &mut ConversationContext,
    team: &TeamConfig,
) -> ToolResponse {
    let input = ContactInfo {
        name: args.name,
        email: args.email,
        phone: args.phone,
        location: args.location,
    };
    match validation::validate_contact(&input, context.contact_info(), team) {
        ContactValidation::Rejected { field, message } => ToolResponse {
            success: false,
            message,
            data: json!({ "field": field }),
        },
        ContactValidation::Accepted { contact, warnings } => {
            context.merge_contact(&contact);
            let message = validation::acknowledgement(
                context.contact_info(),
                !context.established_matters().is_empty(),
            );
            ToolResponse::ok(
                message,
                json!({ "contact": context.contact_info(), "warnings": warnings }),
            )
        }
    }
}

fn create_matter(args: CreateMatterArgs, context: &mut ConversationContext) -> ToolResponse {
    if context.contact_info().name.is_none() {
        return ToolResponse::fail(
            "I need the client's name before opening a matter. Please collect their name first.",
        );
    }
    let matter_type = args.matter_type.trim().to_owned();
    if matter_type.is_empty() {
        return ToolResponse::fail("A matter type is required.");
    }

    let urgency = match args.urgency.as_deref() {
        Some(raw) => match Urgency::parse(raw) {
            Some(u) => Some(u),
            None => return ToolResponse::fail(format!("Unknown urgency '{raw}'; use low, medium or high.")),
        },
        None => None,
    };
    if let Some(urgency) = urgency {
        context.urgency_level = Some(urgency);
    }

    context.add_matter(&matter_type);
    let mut facts = vec![args.description.trim().to_owned()];
    facts.extend(case_draft::keyword_facts(&args.description).into_iter().map(str::to_owned));
    let draft = case_draft::upsert_draft(
        context,
        DraftUpdate {
            matter_type: Some(matter_type.clone()),
            facts,
            urgency,
            jurisdiction: None,
            opposing_party: args.opposing_party.map(|p| p.trim().to_owned()),
        },
    );
    ToolResponse::ok(
        format!("Opened a {matter_type} matter and updated the case draft."),
        json!({ "case_draft": draft }),
    )
}

async fn analyze_document(
    args: AnalyzeDocumentArgs,
    context: &mut ConversationContext,
    env: &PipelineEnv,
) -> ToolResponse {
    let file_id = args.file_id.trim();
    if file_id.is_empty() {
        return ToolResponse::fail("A file_id is required.");
    }
    let analysis_type = match args.analysis_type.as_deref() {
        Some(raw) => match AnalysisType::parse(raw) {
            Some(t) => t,
            None => return ToolResponse::fail(format!("Unknown analysis_type '{raw}'.")),
        },
        None => AnalysisType::General,
    };

    let analysis =
        file_analysis::analyze_file(env, file_id, analysis_type, args.specific_question.as_deref()).await;
    context.mark_processed(file_id);

    if analysis.succeeded() {
        ToolResponse::ok(analysis.summary.clone(), json!({ "analysis": analysis }))
    } else {
        ToolResponse::fail(
            "The document could not be analyzed right now. Ask the client to describe its contents.",
        )
    }
}

fn request_lawyer_review(args: RequestLawyerReviewArgs, context: &mut ConversationContext) -> ToolResponse {
    let urgency = args
        .urgency
        .as_deref()
        .and_then(Urgency::parse)
        .or(context.urgency_level)
        .unwrap_or_default();
    let matter_type = args
        .matter_type
        .filter(|m| !m.trim().is_empty())
        .or_else(|| context.established_matters().first().cloned());

    let review = LawyerReviewRequest {
        requested_at: Utc::now(),
        urgency,
        complexity: args.complexity,
        matter_type,
    };
    let data = json!({ "lawyer_review": &review });
    context.lawyer_review = Some(review);
    let message = match urgency {
        Urgency::High => "An attorney review has been requested and marked urgent.",
        _ => "An attorney review has been requested.",
    };
    ToolResponse::ok(message, data)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Definitions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// JSON-schema definitions for every intake tool.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "collect_contact_info".into(),
            description: "Record the client's contact details once they have shared them.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Full name" },
                    "email": { "type": "string", "description": "Email address" },
                    "phone": { "type": "string", "description": "Phone number" },
                    "location": { "type": "string", "description": "City and state" }
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "create_matter".into(),
            description: "Open a legal matter for the client and add it to their case draft.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "matter_type": { "type": "string", "description": "e.g. Employment Law, Family Law" },
                    "description": { "type": "string", "description": "One or two sentences on what happened" },
                    "urgency": { "type": "string", "enum": ["low", "medium", "high"] },
                    "opposing_party": { "type": "string", "description": "Person or organization on the other side" }
                },
                "required": ["matter_type", "description"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "analyze_document".into(),
            description: "Analyze a document the client uploaded.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_id": { "type": "string" },
                    "analysis_type": {
                        "type": "string",
                        "enum": ["contract", "medical_document", "government_form", "resume", "image", "legal_document", "general"]
                    },
                    "specific_question": { "type": "string" }
                },
                "required": ["file_id"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "request_lawyer_review".into(),
            description: "Ask an attorney to review the client's matter.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "urgency": { "type": "string", "enum": ["low", "medium", "high"] },
                    "complexity": { "type": "string" },
                    "matter_type": { "type": "string" }
                },
                "additionalProperties": false
            }),
        },
    ]
}
