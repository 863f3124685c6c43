//! `li-capabilities`: external services the intake pipeline depends on.
//!
//! | Trait              | REST client             | When unconfigured       |
//! |--------------------|-------------------------|-------------------------|
//! | [`DocumentAnalyzer`] | [`RestDocumentAnalyzer`] | [`UnavailableAnalyzer`] |
//! | [`PdfRenderer`]      | [`RestPdfRenderer`]      | [`UnavailableRenderer`] |
//! | [`IntakeAgent`]      | [`RestIntakeAgent`]      | none (turn ends in `AI_HANDLE`) |

pub mod rest;
pub mod traits;
pub mod types;
pub mod unavailable;

pub use rest::{from_reqwest, RestDocumentAnalyzer, RestEndpoint, RestIntakeAgent, RestPdfRenderer};
pub use traits::{DocumentAnalyzer, IntakeAgent, PdfRenderer};
pub use types::{AgentReply, AgentRequest, AnalyzeRequest, Brand, RenderOutcome, RenderRequest};
pub use unavailable::{UnavailableAnalyzer, UnavailableRenderer};

use std::sync::Arc;

use li_domain::config::EndpointConfig;
use li_domain::error::Result;

pub fn create_document_analyzer(cfg: Option<&EndpointConfig>) -> Result<Arc<dyn DocumentAnalyzer>> {
    match cfg {
        Some(cfg) => {
            tracing::info!(url = %cfg.url, "document analysis via REST");
            Ok(Arc::new(RestDocumentAnalyzer::new(cfg)?))
        }
        None => {
            tracing::warn!("document analysis not configured; uploads will get the manual-description fallback");
            Ok(Arc::new(UnavailableAnalyzer))
        }
    }
}

pub fn create_pdf_renderer(cfg: Option<&EndpointConfig>) -> Result<Arc<dyn PdfRenderer>> {
    match cfg {
        Some(cfg) => {
            tracing::info!(url = %cfg.url, "pdf rendering via REST");
            Ok(Arc::new(RestPdfRenderer::new(cfg)?))
        }
        None => {
            tracing::warn!("pdf rendering not configured");
            Ok(Arc::new(UnavailableRenderer))
        }
    }
}

/// `None` when no agent endpoint is configured; the caller then hands the
/// turn back with the `AI_HANDLE` sentinel.
pub fn create_agent(cfg: Option<&EndpointConfig>) -> Result<Option<Arc<dyn IntakeAgent>>> {
    match cfg {
        Some(cfg) => {
            tracing::info!(url = %cfg.url, "intake agent via REST");
            Ok(Some(Arc::new(RestIntakeAgent::new(cfg)?)))
        }
        None => Ok(None),
    }
}
