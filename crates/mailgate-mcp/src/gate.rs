// crates/mailgate-mcp/src/gate.rs
// ============================================================================
// Module: Gated Mail Reads
// Description: Audited read path for inbound message content.
// Purpose: Log every content access before returning sanitized content.
// Dependencies: mailgate-core, mailgate-config, tracing
// ============================================================================

//! ## Overview
//! A gated read resolves the caller's IMAP settings, fetches the message,
//! delivers an [`AuditRecord`] to the audit log, and only then returns
//! content. The returned metadata carries caller-safe fields only; subject
//! and `Message-ID` stay in the audit record. Bodies are returned wrapped in
//! one untrusted-content boundary pair after forged markers are neutralized.
//!
//! Audit delivery never fails the read: a missing destination, transport
//! error, or non-success status yields `logged = false` and a warning.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use mailgate_config::ConfigError;
use mailgate_config::ConfigResolver;
use mailgate_core::Attachment;
use mailgate_core::AttachmentContent;
use mailgate_core::MailError;
use mailgate_core::MailTransport;
use mailgate_core::MessageDetail;
use mailgate_core::current_agent_id;
use serde::Serialize;
use thiserror::Error;

use crate::audit::AuditKind;
use crate::audit::AuditLogSink;
use crate::audit::AuditRecord;
use crate::audit::NO_BODY_PLACEHOLDER;
use crate::audit::NONE_PLACEHOLDER;
use crate::audit::UNKNOWN_AGENT;
use crate::audit::truncate_body;
use crate::sanitize::BoundarySanitizer;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Reference to one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRef {
    /// Mailbox name.
    pub mailbox: String,
    /// Message UID within the mailbox.
    pub uid: u32,
}

impl MessageRef {
    /// Builds a reference.
    #[must_use]
    pub fn new(mailbox: impl Into<String>, uid: u32) -> Self {
        Self {
            mailbox: mailbox.into(),
            uid,
        }
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.mailbox, self.uid)
    }
}

/// Caller-safe attachment metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentSummary {
    /// MIME part identifier.
    pub part: String,
    /// Declared filename.
    pub filename: Option<String>,
    /// Declared content type.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
}

impl From<&Attachment> for AttachmentSummary {
    fn from(attachment: &Attachment) -> Self {
        Self {
            part: attachment.part.clone(),
            filename: attachment.filename.clone(),
            content_type: attachment.content_type.clone(),
            size: attachment.size,
        }
    }
}

/// Caller-safe message metadata plus audit outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafeMetadata {
    /// Message UID.
    pub uid: u32,
    /// Mailbox name.
    pub mailbox: String,
    /// Sender.
    pub from: String,
    /// Recipients.
    pub to: Vec<String>,
    /// Date header.
    pub date: Option<String>,
    /// IMAP flags.
    pub flags: Vec<String>,
    /// Attachment metadata.
    pub attachments: Vec<AttachmentSummary>,
    /// Whether the audit record reached the audit log.
    pub logged: bool,
    /// Channel the record was addressed to.
    pub audit_channel: String,
}

/// Result of a gated read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateReadResult {
    /// Caller-safe metadata.
    pub metadata: SafeMetadata,
    /// Wrapped plain-text body, when requested and present.
    pub text: Option<String>,
    /// Wrapped HTML body, when requested and present.
    pub html: Option<String>,
}

/// Result of a gated attachment download.
#[derive(Debug, Clone)]
pub struct GatedAttachment {
    /// Attachment bytes and declared metadata.
    pub content: AttachmentContent,
    /// Whether the audit record reached the audit log.
    pub logged: bool,
    /// Channel the record was addressed to.
    pub audit_channel: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gated read failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Settings for the call could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The mail transport failed.
    #[error(transparent)]
    Mail(#[from] MailError),
}

// ============================================================================
// SECTION: Gate Reader
// ============================================================================

/// Audited read path over a mail transport.
#[derive(Clone)]
pub struct GateReader {
    /// Per-call settings.
    resolver: ConfigResolver,
    /// Mail collaborator.
    transport: Arc<dyn MailTransport>,
    /// Audit destination.
    audit_sink: Arc<dyn AuditLogSink>,
    /// Marker neutralizer.
    sanitizer: BoundarySanitizer,
}

impl GateReader {
    /// Builds a gate reader.
    #[must_use]
    pub fn new(
        resolver: ConfigResolver,
        transport: Arc<dyn MailTransport>,
        audit_sink: Arc<dyn AuditLogSink>,
        sanitizer: BoundarySanitizer,
    ) -> Self {
        Self {
            resolver,
            transport,
            audit_sink,
            sanitizer,
        }
    }

    /// Returns the sanitizer applied to returned content.
    #[must_use]
    pub const fn sanitizer(&self) -> &BoundarySanitizer {
        &self.sanitizer
    }

    /// Reads one message, audits it, and returns caller-safe content.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when settings cannot be resolved or the fetch
    /// fails. Audit failures are not errors.
    pub async fn gate_read(
        &self,
        message: &MessageRef,
        include_body: bool,
    ) -> Result<GateReadResult, GateError> {
        let imap = self.resolver.imap_config()?;
        let detail = self.transport.get_message(&imap, &message.mailbox, message.uid).await?;
        let record = email_record(message, &detail);
        let (logged, audit_channel) = self.deliver(&record).await;
        let (text, html) = if include_body {
            (
                detail.text.as_deref().map(|text| self.sanitizer.wrap(text)),
                detail.html.as_deref().map(|html| self.sanitizer.wrap(html)),
            )
        } else {
            (None, None)
        };
        Ok(GateReadResult {
            metadata: SafeMetadata {
                uid: detail.uid,
                mailbox: detail.mailbox,
                from: detail.from,
                to: detail.to,
                date: detail.date,
                flags: detail.flags,
                attachments: detail.attachments.iter().map(AttachmentSummary::from).collect(),
                logged,
                audit_channel,
            },
            text,
            html,
        })
    }

    /// Downloads one attachment, auditing the access before returning bytes.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when settings cannot be resolved or the fetch
    /// fails. Audit failures are not errors.
    pub async fn gate_attachment(
        &self,
        message: &MessageRef,
        part: &str,
    ) -> Result<GatedAttachment, GateError> {
        let imap = self.resolver.imap_config()?;
        let detail = self.transport.get_message(&imap, &message.mailbox, message.uid).await?;
        let content = self
            .transport
            .download_attachment(&imap, &message.mailbox, message.uid, part)
            .await?;
        let record = attachment_record(message, &detail, part, &content);
        let (logged, audit_channel) = self.deliver(&record).await;
        Ok(GatedAttachment {
            content,
            logged,
            audit_channel,
        })
    }

    /// Delivers `record`, downgrading failures to a warning.
    async fn deliver(&self, record: &AuditRecord) -> (bool, String) {
        let config = self.resolver.audit_log_config();
        match self.audit_sink.deliver(&config, record).await {
            Ok(()) => (true, config.channel),
            Err(err) => {
                tracing::warn!(
                    reference = %record.reference,
                    agent = %record.agent,
                    channel = %config.channel,
                    error = %err,
                    "audit log delivery failed; content returned unlogged"
                );
                (false, config.channel)
            }
        }
    }
}

impl fmt::Debug for GateReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateReader").finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the bound agent label for audit records.
fn agent_label() -> String {
    current_agent_id().map_or_else(|| UNKNOWN_AGENT.to_string(), |agent| agent.to_string())
}

/// Formats one attachment as `filename (content type, N bytes)`.
fn attachment_line(filename: Option<&str>, content_type: &str, size: u64) -> String {
    format!("{} ({content_type}, {size} bytes)", filename.unwrap_or("(unnamed)"))
}

/// Summarizes every attachment, or returns the placeholder.
fn attachment_summary(attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return NONE_PLACEHOLDER.to_string();
    }
    attachments
        .iter()
        .map(|item| attachment_line(item.filename.as_deref(), &item.content_type, item.size))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Builds the audit record for a message read.
fn email_record(message: &MessageRef, detail: &MessageDetail) -> AuditRecord {
    let body = detail
        .text
        .as_deref()
        .filter(|text| !text.is_empty())
        .or_else(|| detail.html.as_deref().filter(|html| !html.is_empty()))
        .map_or_else(|| NO_BODY_PLACEHOLDER.to_string(), truncate_body);
    header_record(AuditKind::EmailRead, message, detail, attachment_summary(&detail.attachments), body)
}

/// Builds the audit record for an attachment download.
fn attachment_record(
    message: &MessageRef,
    detail: &MessageDetail,
    part: &str,
    content: &AttachmentContent,
) -> AuditRecord {
    let size = u64::try_from(content.data.len()).unwrap_or(u64::MAX);
    let line = attachment_line(content.filename.as_deref(), &content.content_type, size);
    header_record(
        AuditKind::AttachmentDownload,
        message,
        detail,
        format!("part {part}: {line}"),
        NO_BODY_PLACEHOLDER.to_string(),
    )
}

/// Fills the header fields shared by every record kind.
fn header_record(
    kind: AuditKind,
    message: &MessageRef,
    detail: &MessageDetail,
    attachments: String,
    body: String,
) -> AuditRecord {
    AuditRecord {
        kind,
        reference: message.to_string(),
        mailbox: message.mailbox.clone(),
        agent: agent_label(),
        from: detail.from.clone(),
        to: detail.to.join(", "),
        subject: detail.subject.clone().unwrap_or_default(),
        date: detail.date.clone().unwrap_or_default(),
        message_id: detail.message_id.clone().unwrap_or_else(|| NONE_PLACEHOLDER.to_string()),
        attachments,
        body,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
