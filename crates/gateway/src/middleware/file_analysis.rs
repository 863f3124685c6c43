//! Analyzes newly uploaded files before the agent sees the turn.
//!
//! Files are keyed by a stable id derived from their URL. Every attempted
//! id goes into the processed-file ledger as soon as its analysis settles,
//! so a re-sent attachment is never analyzed twice.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use li_capabilities::AnalyzeRequest;
use li_domain::config::TeamConfig;
use li_domain::context::{
    AnalysisStatus, AnalyzedFile, ConversationContext, DocumentAnalysis, FileAnalysisRecord,
};
use li_domain::error::Result;
use li_domain::message::{self, Attachment, Message};

use crate::pipeline::{Middleware, MiddlewareResult, PipelineEnv};

pub struct FileAnalysis;

// ── Classification ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisType {
    Contract,
    MedicalDocument,
    GovernmentForm,
    Resume,
    Image,
    LegalDocument,
    General,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contract => "contract",
            Self::MedicalDocument => "medical_document",
            Self::GovernmentForm => "government_form",
            Self::Resume => "resume",
            Self::Image => "image",
            Self::LegalDocument => "legal_document",
            Self::General => "general",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [
            Self::Contract,
            Self::MedicalDocument,
            Self::GovernmentForm,
            Self::Resume,
            Self::Image,
            Self::LegalDocument,
            Self::General,
        ]
        .into_iter()
        .find(|t| t.as_str() == raw.trim())
    }

    /// Question sent to the analysis capability for this kind of file.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Contract => "Summarize this contract: the parties, key obligations, payment terms, deadlines, termination clauses and any terms that may be unfavorable to the client.",
            Self::MedicalDocument => "Summarize this medical document: injuries or conditions, treatment, providers, dates of care and anything relevant to a personal injury or disability claim.",
            Self::GovernmentForm => "Identify this government form, what it is used for, the filing deadlines and any fields or amounts that matter legally.",
            Self::Resume => "Summarize this resume: employers, positions, dates of employment and anything relevant to an employment dispute.",
            Self::Image => "Describe what this image shows that could matter legally: damage, injuries, documents, people, places and visible dates.",
            Self::LegalDocument => "Summarize this legal document: its type, the court or agency, the parties, deadlines and what response is required.",
            Self::General => "Summarize this document and extract the people, organizations, dates and key facts relevant to a legal matter.",
        }
    }
}

const CONTRACT_WORDS: &[&str] = &["contract", "agreement", "lease", "nda", "terms", "addendum"];
const MEDICAL_WORDS: &[&str] = &["medical", "diagnosis", "hospital", "prescription", "health", "clinic", "xray"];
const GOVERNMENT_WORDS: &[&str] = &["form", "irs", "tax", "w2", "1099", "i9", "permit", "license", "uscis"];
const RESUME_WORDS: &[&str] = &["resume", "cv", "curriculum"];
const LEGAL_WORDS: &[&str] = &[
    "complaint", "summons", "court", "motion", "subpoena", "judgment", "petition", "notice", "order", "citation",
];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "heic", "webp", "bmp", "tiff"];

/// Pick an analysis type from the file name, then the MIME type.
pub fn classify(name: &str, mime_type: &str) -> AnalysisType {
    let lower = name.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let has = |words: &[&str]| tokens.iter().any(|t| words.contains(t));

    if has(CONTRACT_WORDS) {
        AnalysisType::Contract
    } else if has(MEDICAL_WORDS) {
        AnalysisType::MedicalDocument
    } else if has(GOVERNMENT_WORDS) {
        AnalysisType::GovernmentForm
    } else if has(RESUME_WORDS) {
        AnalysisType::Resume
    } else if mime_type.to_lowercase().starts_with("image/")
        || tokens.last().is_some_and(|ext| IMAGE_EXTENSIONS.contains(ext))
    {
        AnalysisType::Image
    } else if has(LEGAL_WORDS) {
        AnalysisType::LegalDocument
    } else {
        AnalysisType::General
    }
}

/// Stable id for an uploaded file: the file stem plus a short digest of
/// the URL without its query string, so re-signed links map to one id.
pub fn file_id(url: &str) -> String {
    let base = url.split(['?', '#']).next().unwrap_or(url);
    let digest = format!("{:x}", Sha256::digest(base.as_bytes()));
    let stem = base
        .rsplit('/')
        .find(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(|segment| segment.split('.').next().unwrap_or(segment))
        .filter(|stem| !stem.is_empty());
    match stem {
        Some(stem) => format!("{stem}-{}", &digest[..12]),
        None => digest,
    }
}

// ── Capability call ────────────────────────────────────────────────

/// Analyze one file under the capability timeout. Failures come back as a
/// zero-confidence analysis rather than an error.
pub async fn analyze_file(
    env: &PipelineEnv,
    file_id: &str,
    analysis_type: AnalysisType,
    question: Option<&str>,
) -> DocumentAnalysis {
    let req = AnalyzeRequest {
        file_id: file_id.to_owned(),
        analysis_type: analysis_type.as_str().to_owned(),
        question: question.unwrap_or(analysis_type.prompt()).to_owned(),
    };
    match tokio::time::timeout(env.capability_timeout(), env.analyzer.analyze(req)).await {
        Ok(Ok(Some(analysis))) => analysis,
        Ok(Ok(None)) => DocumentAnalysis::failed("no analysis available"),
        Ok(Err(e)) => {
            tracing::warn!(file_id, error = %e, "document analysis failed");
            DocumentAnalysis::failed(e.to_string())
        }
        Err(_) => {
            tracing::warn!(file_id, "document analysis timed out");
            DocumentAnalysis::failed("analysis timed out")
        }
    }
}

// ── Response text ──────────────────────────────────────────────────

fn push_list(out: &mut String, label: &str, items: &[String]) {
    if !items.is_empty() {
        out.push_str(&format!("**{label}:** {}\n", items.join(", ")));
    }
}

fn push_bullets(out: &mut String, label: &str, items: &[String]) {
    if !items.is_empty() {
        out.push_str(&format!("**{label}:**\n"));
        for item in items {
            out.push_str(&format!("- {item}\n"));
        }
    }
}

pub fn render_results(files: &[AnalyzedFile]) -> String {
    let mut out = String::from("I've reviewed what you uploaded.\n");
    for file in files {
        out.push_str(&format!("\n**Document: {}**\n", file.name));
        let analysis = &file.analysis;
        if !analysis.succeeded() {
            out.push_str(
                "I couldn't analyze this file. Could you describe what it says in a few sentences?\n",
            );
            continue;
        }
        if !analysis.summary.trim().is_empty() {
            out.push_str(&format!("{}\n", analysis.summary.trim()));
        }
        push_list(&mut out, "Parties", &analysis.entities.people);
        push_list(&mut out, "Organizations", &analysis.entities.orgs);
        push_list(&mut out, "Dates", &analysis.entities.dates);
        push_bullets(&mut out, "Key Facts", &analysis.key_facts);
        push_bullets(&mut out, "Recommended Actions", &analysis.action_items);
    }
    out.push_str("\nWould you like me to add these details to your case draft?");
    out
}

pub fn apology(files: &[AnalyzedFile]) -> String {
    let names = files.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", ");
    format!(
        "I'm sorry, I wasn't able to analyze {names} right now. \
         Could you describe what the document says in a few sentences? \
         I can still help based on your description, and you're welcome to try uploading it again later."
    )
}

// ── Stage ──────────────────────────────────────────────────────────

#[async_trait]
impl Middleware for FileAnalysis {
    fn name(&self) -> &'static str {
        "file_analysis"
    }

    async fn execute(
        &self,
        messages: &[Message],
        mut context: ConversationContext,
        _team: &TeamConfig,
        env: &PipelineEnv,
    ) -> Result<MiddlewareResult> {
        let attachments = context.current_attachments.take().unwrap_or_default();
        let from_user = message::latest(messages).is_some_and(Message::is_user);
        if attachments.is_empty() || !from_user {
            return Ok(MiddlewareResult::pass(context));
        }

        let mut seen = HashSet::new();
        let fresh: Vec<(String, Attachment)> = attachments
            .into_iter()
            .map(|a| (file_id(&a.url), a))
            .filter(|(id, _)| !context.is_processed(id) && seen.insert(id.clone()))
            .collect();
        if fresh.is_empty() {
            tracing::debug!(session_id = %context.session_id(), "attachments already processed");
            return Ok(MiddlewareResult::pass(context));
        }

        let started_at = Utc::now();
        let mut files = Vec::with_capacity(fresh.len());
        for (id, attachment) in fresh {
            let analysis_type = classify(&attachment.name, &attachment.mime_type);
            let analysis = analyze_file(env, &id, analysis_type, None).await;
            context.mark_processed(&id);
            files.push(AnalyzedFile {
                file_id: id,
                name: attachment.name,
                mime_type: attachment.mime_type,
                analysis_type: analysis_type.as_str().to_owned(),
                analysis,
            });
        }

        let succeeded = files.iter().filter(|f| f.analysis.succeeded()).count();
        tracing::info!(
            session_id = %context.session_id(),
            files = files.len(),
            succeeded,
            "file analysis finished"
        );

        if succeeded == 0 {
            return Ok(MiddlewareResult::respond(context, apology(&files)));
        }

        let response = render_results(&files);
        let status = if succeeded == files.len() {
            AnalysisStatus::Completed
        } else {
            AnalysisStatus::Partial
        };
        context.file_analysis = Some(FileAnalysisRecord {
            status,
            files,
            started_at,
            completed_at: Utc::now(),
        });
        Ok(MiddlewareResult::respond(context, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use li_capabilities::DocumentAnalyzer;
    use li_domain::context::Entities;

    use crate::pipeline::tests::test_env;

    struct CountingAnalyzer {
        calls: AtomicUsize,
        confidence: f64,
    }

    #[async_trait]
    impl DocumentAnalyzer for CountingAnalyzer {
        async fn analyze(&self, req: AnalyzeRequest) -> Result<Option<DocumentAnalysis>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(DocumentAnalysis {
                confidence: self.confidence,
                summary: format!("Analysis of {}", req.file_id),
                entities: Entities {
                    people: vec!["Pat Lee".into()],
                    ..Default::default()
                },
                key_facts: vec!["Signed in March".into()],
                action_items: Vec::new(),
            }))
        }
    }

    fn env_with(confidence: f64) -> (PipelineEnv, Arc<CountingAnalyzer>) {
        let analyzer = Arc::new(CountingAnalyzer { calls: AtomicUsize::new(0), confidence });
        let mut env = test_env();
        env.analyzer = analyzer.clone();
        (env, analyzer)
    }

    fn upload(name: &str) -> Attachment {
        Attachment {
            name: name.into(),
            size: 2048,
            mime_type: "application/pdf".into(),
            url: format!("https://files.example.com/uploads/{name}?sig=abc"),
        }
    }

    fn staged(files: Vec<Attachment>) -> ConversationContext {
        let mut ctx = ConversationContext::new("s", "t");
        ctx.current_attachments = Some(files);
        ctx
    }

    #[test]
    fn classification_uses_name_then_mime() {
        assert_eq!(classify("Employment_Agreement.pdf", "application/pdf"), AnalysisType::Contract);
        assert_eq!(classify("hospital-bill.pdf", ""), AnalysisType::MedicalDocument);
        assert_eq!(classify("irs-w2.pdf", ""), AnalysisType::GovernmentForm);
        assert_eq!(classify("jane_resume.docx", ""), AnalysisType::Resume);
        assert_eq!(classify("IMG_0042.HEIC", ""), AnalysisType::Image);
        assert_eq!(classify("scan", "image/png"), AnalysisType::Image);
        assert_eq!(classify("eviction notice.pdf", ""), AnalysisType::LegalDocument);
        assert_eq!(classify("information.pdf", ""), AnalysisType::General);
    }

    #[test]
    fn file_id_ignores_query_and_is_stable() {
        let a = file_id("https://files.example.com/u/lease.pdf?sig=1");
        let b = file_id("https://files.example.com/u/lease.pdf?sig=2");
        assert_eq!(a, b);
        assert!(a.starts_with("lease-"));
        assert_ne!(a, file_id("https://files.example.com/other/lease.pdf"));
        assert_eq!(file_id("https://").len(), 64);
    }

    #[tokio::test]
    async fn successful_analysis_records_and_stops() {
        let (env, analyzer) = env_with(0.9);
        let out = FileAnalysis
            .execute(
                &[Message::user("here is my lease")],
                staged(vec![upload("lease.pdf")]),
                &TeamConfig::default(),
                &env,
            )
            .await
            .unwrap();
        assert!(out.should_stop);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
        let text = out.response.unwrap();
        assert!(text.contains("**Parties:** Pat Lee"));
        assert!(text.contains("- Signed in March"));
        let record = out.context.file_analysis.as_ref().unwrap();
        assert_eq!(record.status, AnalysisStatus::Completed);
        assert_eq!(record.files[0].analysis_type, "contract");
        assert_eq!(out.context.processed_files().len(), 1);
        assert!(out.context.current_attachments.is_none());
    }

    #[tokio::test]
    async fn zero_confidence_apologizes_and_marks_attempted() {
        let (env, _) = env_with(0.0);
        let out = FileAnalysis
            .execute(
                &[Message::user("see attached")],
                staged(vec![upload("scan.pdf")]),
                &TeamConfig::default(),
                &env,
            )
            .await
            .unwrap();
        assert!(out.response.unwrap().contains("describe what the document says"));
        assert_eq!(out.context.processed_files().len(), 1);
        assert!(out.context.file_analysis.is_none());
        assert!(out.context.current_attachments.is_none());
    }

    #[tokio::test]
    async fn processed_and_duplicate_files_are_skipped() {
        let (env, analyzer) = env_with(0.9);
        let mut ctx = staged(vec![upload("lease.pdf"), upload("lease.pdf")]);
        let first = FileAnalysis
            .execute(&[Message::user("one")], ctx, &TeamConfig::default(), &env)
            .await
            .unwrap();
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);

        ctx = first.context;
        ctx.current_attachments = Some(vec![upload("lease.pdf")]);
        let again = FileAnalysis
            .execute(&[Message::user("again")], ctx, &TeamConfig::default(), &env)
            .await
            .unwrap();
        assert!(again.response.is_none());
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(again.context.processed_files().len(), 1);
    }

    #[tokio::test]
    async fn stale_attachments_ignored_when_latest_is_not_user() {
        let (env, analyzer) = env_with(0.9);
        let out = FileAnalysis
            .execute(
                &[Message::user("hi"), Message::assistant("hello")],
                staged(vec![upload("lease.pdf")]),
                &TeamConfig::default(),
                &env,
            )
            .await
            .unwrap();
        assert!(out.response.is_none());
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
        assert!(out.context.current_attachments.is_none());
    }

    struct StalledAnalyzer;

    #[async_trait]
    impl DocumentAnalyzer for StalledAnalyzer {
        async fn analyze(&self, _req: AnalyzeRequest) -> Result<Option<DocumentAnalysis>> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_analyzer_times_out_to_apology() {
        let mut env = test_env();
        env.analyzer = Arc::new(StalledAnalyzer);

        let analysis = analyze_file(&env, "lease-1", AnalysisType::Contract, None).await;
        assert_eq!(analysis.confidence, 0.0);
        assert!(!analysis.succeeded());

        let out = FileAnalysis
            .execute(
                &[Message::user("here is my lease")],
                staged(vec![upload("lease.pdf")]),
                &TeamConfig::default(),
                &env,
            )
            .await
            .unwrap();
        assert!(out.should_stop);
        assert!(out.response.unwrap().starts_with("I'm sorry, I wasn't able to analyze lease.pdf"));
        assert!(out.context.is_processed(&file_id(&upload("lease.pdf").url)));
        assert!(out.context.file_analysis.is_none());
    }

    #[tokio::test]
    async fn unavailable_capability_degrades_to_apology() {
        let out = FileAnalysis
            .execute(
                &[Message::user("here")],
                staged(vec![upload("notes.txt")]),
                &TeamConfig::default(),
                &test_env(),
            )
            .await
            .unwrap();
        assert!(out.response.unwrap().starts_with("I'm sorry"));
    }
}
