//! REST implementations of the capability traits.
//!
//! All three share [`RestEndpoint`]: a `reqwest::Client` bound to one URL
//! with bearer auth and retry + exponential back-off on transient (5xx /
//! timeout / connect) failures. 4xx answers are permanent.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use uuid::Uuid;

use li_domain::config::EndpointConfig;
use li_domain::context::DocumentAnalysis;
use li_domain::error::{Error, Result};
use li_domain::trace::TraceEvent;

use crate::traits::{DocumentAnalyzer, IntakeAgent, PdfRenderer};
use crate::types::{AgentReply, AgentRequest, AnalyzeRequest, RenderOutcome, RenderRequest};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Endpoint + retry engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct RestEndpoint {
    capability: &'static str,
    http: Client,
    url: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl RestEndpoint {
    pub fn new(capability: &'static str, cfg: &EndpointConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        let api_key = cfg
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|k| !k.is_empty());
        if cfg.api_key_env.is_some() && api_key.is_none() {
            tracing::warn!(capability, "api_key_env is set but the variable is empty; calling without auth");
        }

        Ok(Self {
            capability,
            http,
            url: cfg.url.trim_end_matches('/').to_owned(),
            api_key,
            max_retries: cfg.max_retries,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn fail(&self, message: String) -> Error {
        Error::Capability {
            capability: self.capability.to_owned(),
            message,
        }
    }

    /// POST `body` as JSON with retry on transient failures.
    ///
    /// Emits a `TraceEvent::CapabilityCall` after every attempt.
    pub async fn post_json<T: Serialize + Sync>(&self, body: &T) -> Result<Response> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }

            let mut rb = self
                .http
                .post(&self.url)
                .header("X-Trace-Id", Uuid::new_v4().to_string())
                .json(body);
            if let Some(ref key) = self.api_key {
                rb = rb.bearer_auth(key);
            }

            let start = Instant::now();
            let result = rb.send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    self.trace(status.as_u16(), duration_ms);

                    if status.is_server_error() {
                        let body = resp.text().await.unwrap_or_default();
                        last_err = Some(self.fail(format!("returned {status}: {body}")));
                        continue;
                    }
                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        return Err(self.fail(format!("auth failed ({status})")));
                    }
                    return Ok(resp);
                }
                Err(e) => {
                    self.trace(e.status().map(|s| s.as_u16()).unwrap_or(0), duration_ms);
                    last_err = Some(from_reqwest(e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| self.fail("all retries exhausted".into())))
    }

    fn trace(&self, status: u16, duration_ms: u64) {
        TraceEvent::CapabilityCall {
            capability: self.capability.to_owned(),
            endpoint: self.url.clone(),
            status,
            duration_ms,
        }
        .emit();
    }

    async fn error_body(&self, resp: Response) -> Error {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        self.fail(format!("returned {status}: {body}"))
    }
}

/// Timeouts become `Error::Timeout`; everything else `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct RestDocumentAnalyzer {
    endpoint: RestEndpoint,
}

impl RestDocumentAnalyzer {
    pub fn new(cfg: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            endpoint: RestEndpoint::new("document_analysis", cfg)?,
        })
    }
}

#[async_trait]
impl DocumentAnalyzer for RestDocumentAnalyzer {
    async fn analyze(&self, req: AnalyzeRequest) -> Result<Option<DocumentAnalysis>> {
        let resp = self.endpoint.post_json(&req).await?;
        match resp.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => return Ok(None),
            s if !s.is_success() => return Err(self.endpoint.error_body(resp).await),
            _ => {}
        }
        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str::<Option<DocumentAnalysis>>(&body)
            .map_err(|e| self.endpoint.fail(format!("unparseable analysis: {e}")))
    }
}

pub struct RestPdfRenderer {
    endpoint: RestEndpoint,
}

impl RestPdfRenderer {
    pub fn new(cfg: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            endpoint: RestEndpoint::new("pdf_render", cfg)?,
        })
    }
}

#[async_trait]
impl PdfRenderer for RestPdfRenderer {
    async fn render(&self, req: RenderRequest) -> Result<RenderOutcome> {
        let resp = self.endpoint.post_json(&req).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Ok(RenderOutcome::failed(format!("renderer returned {status}: {body}")));
        }
        let bytes = resp.bytes().await.map_err(from_reqwest)?;
        if bytes.is_empty() {
            return Ok(RenderOutcome::failed("renderer returned an empty document"));
        }
        Ok(RenderOutcome::rendered(bytes.to_vec()))
    }
}

pub struct RestIntakeAgent {
    endpoint: RestEndpoint,
}

impl RestIntakeAgent {
    pub fn new(cfg: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            endpoint: RestEndpoint::new("agent", cfg)?,
        })
    }
}

#[async_trait]
impl IntakeAgent for RestIntakeAgent {
    async fn respond(&self, req: AgentRequest) -> Result<AgentReply> {
        let resp = self.endpoint.post_json(&req).await?;
        if !resp.status().is_success() {
            return Err(self.endpoint.error_body(resp).await);
        }
        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body).map_err(|e| self.endpoint.fail(format!("unparseable reply: {e}")))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
