//! Stand-ins used when a capability has no configured endpoint. Every
//! call fails with `Error::Capability`, which the middleware turn into
//! their graceful-degradation replies.

use async_trait::async_trait;

use li_domain::context::DocumentAnalysis;
use li_domain::error::{Error, Result};

use crate::traits::{DocumentAnalyzer, PdfRenderer};
use crate::types::{AnalyzeRequest, RenderOutcome, RenderRequest};

fn unavailable(capability: &str) -> Error {
    Error::Capability {
        capability: capability.to_owned(),
        message: "not configured".into(),
    }
}

pub struct UnavailableAnalyzer;

#[async_trait]
impl DocumentAnalyzer for UnavailableAnalyzer {
    async fn analyze(&self, _req: AnalyzeRequest) -> Result<Option<DocumentAnalysis>> {
        Err(unavailable("document_analysis"))
    }
}

pub struct UnavailableRenderer;

#[async_trait]
impl PdfRenderer for UnavailableRenderer {
    async fn render(&self, _req: RenderRequest) -> Result<RenderOutcome> {
        Err(unavailable("pdf_render"))
    }
}
