//! Conversational middleware stages.
//!
//! Each stage inspects the turn and either passes the context through,
//! mutates it, or answers the turn outright. Stages are looked up by the
//! names listed in `[pipeline] middleware`.

pub mod case_draft;
pub mod contact_info;
pub mod content_policy;
pub mod file_analysis;
pub mod jurisdiction;
pub mod pdf_generation;
pub mod validation;

use std::sync::Arc;

use crate::pipeline::Middleware;

/// Resolve a configured stage name.
pub fn by_name(name: &str) -> Option<Arc<dyn Middleware>> {
    let stage: Arc<dyn Middleware> = match name {
        "content_policy" => Arc::new(content_policy::ContentPolicy),
        "jurisdiction" => Arc::new(jurisdiction::JurisdictionValidator),
        "case_draft" => Arc::new(case_draft::CaseDraftBuilder),
        "file_analysis" => Arc::new(file_analysis::FileAnalysis),
        "pdf_generation" => Arc::new(pdf_generation::PdfGeneration),
        "contact_info" => Arc::new(contact_info::ContactInfoCollector),
        _ => return None,
    };
    Some(stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use li_domain::config::KNOWN_MIDDLEWARE;

    #[test]
    fn every_known_name_resolves_to_itself() {
        for name in KNOWN_MIDDLEWARE {
            let stage = by_name(name).unwrap_or_else(|| panic!("{name} missing"));
            assert_eq!(stage.name(), *name);
        }
        assert!(by_name("rate_limit").is_none());
    }
}
