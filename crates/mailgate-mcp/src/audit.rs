// crates/mailgate-mcp/src/audit.rs
// ============================================================================
// Module: Mail Audit Log
// Description: Audit records for inbound mail content and their delivery.
// Purpose: Record what was read before it reaches the caller.
// Dependencies: mailgate-config, reqwest, serde
// ============================================================================

//! ## Overview
//! Every gated read and attachment download produces an [`AuditRecord`] that
//! is delivered to an [`AuditLogSink`] before any content is returned.
//! Delivery is best-effort: the gate downgrades every [`AuditSinkError`] to
//! `logged = false` and a local warning.
//!
//! [`HttpAuditLogSink`] posts `{channel, text, record}` as JSON to
//! `{base_url}/messages` with a bearer token, using the per-agent
//! [`AuditLogConfig`] resolved for the call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use mailgate_config::AuditLogConfig;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum body characters carried in one audit record.
pub const MAX_AUDIT_BODY_CHARS: usize = 3500;
/// Marker appended to truncated bodies.
pub const TRUNCATION_MARKER: &str = "\n[truncated]";
/// Identity label when no agent is bound.
pub const UNKNOWN_AGENT: &str = "unknown";
/// Placeholder for absent message identifiers and attachments.
pub const NONE_PLACEHOLDER: &str = "(none)";
/// Placeholder for messages without a body.
pub const NO_BODY_PLACEHOLDER: &str = "(no body)";
/// Default connect timeout for the HTTP sink.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default request timeout for the HTTP sink.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// SECTION: Records
// ============================================================================

/// Kind of content access being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// Full message read.
    EmailRead,
    /// Attachment download.
    AttachmentDownload,
}

impl AuditKind {
    /// Returns the heading used in the rendered text.
    const fn heading(self) -> &'static str {
        match self {
            Self::EmailRead => "Email read",
            Self::AttachmentDownload => "Attachment download",
        }
    }
}

/// One audited content access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    /// Access kind.
    pub kind: AuditKind,
    /// Message reference (`mailbox:uid`).
    pub reference: String,
    /// Mailbox name.
    pub mailbox: String,
    /// Bound agent or `unknown`.
    pub agent: String,
    /// Sender.
    pub from: String,
    /// Recipients, comma separated.
    pub to: String,
    /// Subject, or empty.
    pub subject: String,
    /// Date header, or empty.
    pub date: String,
    /// `Message-ID`, or `(none)`.
    pub message_id: String,
    /// Attachment summary lines, or `(none)`.
    pub attachments: String,
    /// Body excerpt, or `(no body)`.
    pub body: String,
}

impl AuditRecord {
    /// Renders the record as the plain-text message posted to the channel.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "{} ({})", self.kind.heading(), self.reference);
        let _ = writeln!(text, "Agent: {}", self.agent);
        let _ = writeln!(text, "Mailbox: {}", self.mailbox);
        let _ = writeln!(text, "From: {}", self.from);
        let _ = writeln!(text, "To: {}", self.to);
        let _ = writeln!(text, "Subject: {}", self.subject);
        let _ = writeln!(text, "Date: {}", self.date);
        let _ = writeln!(text, "Message-ID: {}", self.message_id);
        let _ = writeln!(text, "Attachments: {}", self.attachments);
        let _ = write!(text, "\n{}", self.body);
        text
    }
}

/// Truncates `body` to [`MAX_AUDIT_BODY_CHARS`] characters, appending
/// [`TRUNCATION_MARKER`] when anything was cut.
#[must_use]
pub fn truncate_body(body: &str) -> String {
    if body.chars().nth(MAX_AUDIT_BODY_CHARS).is_none() {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(MAX_AUDIT_BODY_CHARS).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Audit delivery failures. Never surfaced to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditSinkError {
    /// URL or token is not configured for this call.
    #[error("audit log is not configured")]
    NotConfigured,
    /// Request could not be built or sent.
    #[error("audit log transport error: {0}")]
    Transport(String),
    /// Service answered with a non-success status.
    #[error("audit log returned status {0}")]
    Status(u16),
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for audit records.
#[async_trait]
pub trait AuditLogSink: Send + Sync {
    /// Delivers `record` using the destination settings resolved for the call.
    ///
    /// # Errors
    ///
    /// Returns [`AuditSinkError`] when delivery fails.
    async fn deliver(
        &self,
        config: &AuditLogConfig,
        record: &AuditRecord,
    ) -> Result<(), AuditSinkError>;
}

/// Wire body posted by [`HttpAuditLogSink`].
#[derive(Serialize)]
struct AuditLogPost<'a> {
    /// Destination channel.
    channel: &'a str,
    /// Rendered text.
    text: String,
    /// Structured record.
    record: &'a AuditRecord,
}

/// HTTP audit log sink.
#[derive(Debug, Clone)]
pub struct HttpAuditLogSink {
    /// HTTP client configured with timeouts.
    client: Client,
}

impl HttpAuditLogSink {
    /// Builds a sink with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`AuditSinkError::Transport`] when the client cannot be built.
    pub fn new(
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, AuditSinkError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|err| AuditSinkError::Transport(err.to_string()))?;
        Ok(Self {
            client,
        })
    }

    /// Builds a sink with the default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`AuditSinkError::Transport`] when the client cannot be built.
    pub fn with_default_timeouts() -> Result<Self, AuditSinkError> {
        Self::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }
}

#[async_trait]
impl AuditLogSink for HttpAuditLogSink {
    async fn deliver(
        &self,
        config: &AuditLogConfig,
        record: &AuditRecord,
    ) -> Result<(), AuditSinkError> {
        let (Some(base_url), Some(token)) = (&config.base_url, &config.token) else {
            return Err(AuditSinkError::NotConfigured);
        };
        let url = format!("{}/messages", base_url.trim_end_matches('/'));
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| AuditSinkError::Transport("invalid audit log token".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);
        let body = AuditLogPost {
            channel: &config.channel,
            text: record.render_text(),
            record,
        };
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|err| AuditSinkError::Transport(err.without_url().to_string()))?;
        let status = response.status();
        if status.is_success() { Ok(()) } else { Err(AuditSinkError::Status(status.as_u16())) }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
