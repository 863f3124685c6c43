//! Capability interfaces the intake pipeline calls out to.
//!
//! Implementations may talk to a real REST service, stand in as
//! "unavailable", or be in-process test doubles.

use async_trait::async_trait;
use li_domain::context::DocumentAnalysis;
use li_domain::error::Result;

use crate::types::{AgentReply, AgentRequest, AnalyzeRequest, RenderOutcome, RenderRequest};

#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    /// Analyze one uploaded file. `Ok(None)` means the service had nothing
    /// to say about it.
    async fn analyze(&self, req: AnalyzeRequest) -> Result<Option<DocumentAnalysis>>;
}

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Render a case draft. Rendering failures the service reports come
    /// back as `Ok` with `success == false`; transport failures as `Err`.
    async fn render(&self, req: RenderRequest) -> Result<RenderOutcome>;
}

/// The opaque LLM agent that takes over when no middleware answered.
#[async_trait]
pub trait IntakeAgent: Send + Sync {
    async fn respond(&self, req: AgentRequest) -> Result<AgentReply>;
}
