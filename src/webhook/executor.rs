//! Sends a [`SubmissionRequest`] and classifies what came back
//!
//! 1. Transport failure (no HTTP response) → retryable, silent
//! 2. `200` → success, observers get the coordinate
//! 3. Anything else → parse the GraphQL `errors` body, notify, then
//!    `401`/`511` are permanent and everything else is retryable

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

use super::error::SubmitError;
use super::request::SubmissionRequest;
use super::types::{ErrorReport, GraphQlErrorBody, SubmissionOutcome, SubmittedLocation};
use crate::config::ServiceConfig;
use crate::notify::Notifier;

/// Performs one webhook round trip per call
pub struct SubmissionExecutor {
    http: Client,
    notifier: Arc<dyn Notifier>,
}

impl SubmissionExecutor {
    /// Create an executor with the configured timeouts
    pub fn new(config: &ServiceConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self::with_client(http, notifier))
    }

    pub fn with_client(http: Client, notifier: Arc<dyn Notifier>) -> Self {
        Self { http, notifier }
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Submit once. Never fails: every path resolves to an outcome.
    ///
    /// Dropping the returned future aborts the request and reports nothing.
    pub async fn submit(&self, request: &SubmissionRequest) -> SubmissionOutcome {
        let coordinate = request.coordinate();
        self.notifier.submitting(&coordinate);

        match self.send(request).await {
            Ok(()) => {
                self.notifier.location_submitted(&SubmittedLocation {
                    coordinate,
                    submitted_at: Utc::now(),
                });
                SubmissionOutcome::Success(coordinate)
            }
            Err(err) => {
                match &err {
                    SubmitError::Transport(e) => {
                        debug!("Submission to {} failed in transport: {}", request.endpoint(), e)
                    }
                    other => warn!("Submission to {} failed: {}", request.endpoint(), other),
                }
                if let Some(message) = err.notification() {
                    self.notifier.error(&message);
                }
                err.into_outcome()
            }
        }
    }

    async fn send(&self, request: &SubmissionRequest) -> Result<(), SubmitError> {
        debug!("POST {} for {}", request.endpoint(), request.coordinate());

        let resp = self
            .http
            .request(request.method(), request.endpoint().clone())
            .header(CONTENT_TYPE, request.content_type())
            .json(request.body())
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::OK {
            // Body is not needed, but drain it so the connection can be reused
            match read_body(resp).await {
                Ok(body) => debug!("Webhook accepted: {}", String::from_utf8_lossy(&body)),
                Err(e) => debug!("Webhook accepted, body unreadable: {}", e),
            }
            return Ok(());
        }

        // Status decides the class; undecodable bytes still make a readable report
        let body = read_body(resp).await?;
        let text = String::from_utf8_lossy(&body);
        warn!("Webhook returned HTTP {}: {}", status, text);

        Err(SubmitError::Service {
            status,
            report: parse_error_report(status, &text),
        })
    }
}

/// Read the body the same way whatever the status was
async fn read_body(resp: Response) -> Result<Vec<u8>, SubmitError> {
    match resp.bytes().await {
        Ok(bytes) => Ok(bytes.to_vec()),
        Err(e) if e.is_decode() => Err(SubmitError::Protocol(format!(
            "response body could not be decoded: {}",
            e
        ))),
        Err(e) => Err(SubmitError::Transport(e)),
    }
}

/// Collect `errors[].message`; fall back to the raw text, then the status line
pub fn parse_error_report(status: StatusCode, body: &str) -> ErrorReport {
    match serde_json::from_str::<GraphQlErrorBody>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => ErrorReport {
            messages: parsed.errors.into_iter().map(|e| e.message).collect(),
        },
        _ if body.trim().is_empty() => ErrorReport::single(format!("HTTP {}", status)),
        _ => ErrorReport::single(body.trim()),
    }
}
