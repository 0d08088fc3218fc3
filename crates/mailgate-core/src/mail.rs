// crates/mailgate-core/src/mail.rs
// ============================================================================
// Module: Mail Transport Interface
// Description: Mail data model and the transport collaborator contract.
// Purpose: Decouple Mail Gate from the SMTP/IMAP wire implementation.
// Dependencies: async-trait, serde, thiserror
// ============================================================================

//! ## Overview
//! Mail Gate never speaks SMTP or IMAP itself. It resolves connection
//! settings per call and hands them to a [`MailTransport`], consuming typed
//! results and [`MailError`] failures.
//!
//! Security posture: every string in [`MessageDetail`] and
//! [`MessageSummary`] originates from an external sender and is untrusted.
//! Connection settings carry passwords; their `Debug` output is redacted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Connection Settings
// ============================================================================

/// Resolved SMTP settings for one call.
#[derive(Clone, PartialEq, Eq)]
pub struct EmailConfig {
    /// SMTP server host.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Envelope and header sender address.
    pub from: String,
    /// Optional SMTP username.
    pub user: Option<String>,
    /// Optional SMTP password.
    pub pass: Option<String>,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("from", &self.from)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Resolved IMAP settings for one call.
#[derive(Clone, PartialEq, Eq)]
pub struct ImapConfig {
    /// IMAP server host.
    pub host: String,
    /// IMAP server port.
    pub port: u16,
    /// IMAP username.
    pub user: String,
    /// IMAP password.
    pub pass: String,
    /// Whether to connect with implicit TLS.
    pub tls: bool,
}

impl fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("tls", &self.tls)
            .finish()
    }
}

// ============================================================================
// SECTION: Mail Data Model
// ============================================================================

/// Mailbox (folder) on the IMAP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    /// Full mailbox name, e.g. `INBOX` or `INBOX/Receipts`.
    pub name: String,
    /// Hierarchy delimiter reported by the server.
    pub delimiter: Option<String>,
    /// Mailbox attributes such as `\Sent` or `\Noselect`.
    #[serde(default)]
    pub flags: Vec<String>,
}

/// Attachment metadata within a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME part identifier used for downloads.
    pub part: String,
    /// Declared filename, if any.
    pub filename: Option<String>,
    /// Declared content type.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
}

/// Envelope-level view of a message, as returned by list and search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Message UID within the mailbox.
    pub uid: u32,
    /// Mailbox the message lives in.
    pub mailbox: String,
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    #[serde(default)]
    pub to: Vec<String>,
    /// Subject line.
    pub subject: Option<String>,
    /// Date header.
    pub date: Option<String>,
    /// IMAP flags.
    #[serde(default)]
    pub flags: Vec<String>,
    /// Whether the message carries attachments.
    #[serde(default)]
    pub has_attachments: bool,
}

/// Fully fetched message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDetail {
    /// Message UID within the mailbox.
    pub uid: u32,
    /// Mailbox the message lives in.
    pub mailbox: String,
    /// `Message-ID` header.
    pub message_id: Option<String>,
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    #[serde(default)]
    pub to: Vec<String>,
    /// Carbon-copy addresses.
    #[serde(default)]
    pub cc: Vec<String>,
    /// Subject line.
    pub subject: Option<String>,
    /// Date header.
    pub date: Option<String>,
    /// IMAP flags.
    #[serde(default)]
    pub flags: Vec<String>,
    /// Plain-text body.
    pub text: Option<String>,
    /// HTML body.
    pub html: Option<String>,
    /// Attachment metadata.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Search filters passed to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    /// Sender contains.
    pub from: Option<String>,
    /// Recipient contains.
    pub to: Option<String>,
    /// Subject contains.
    pub subject: Option<String>,
    /// Body or headers contain.
    pub text: Option<String>,
    /// Received on or after (`YYYY-MM-DD`).
    pub since: Option<String>,
    /// Received before (`YYYY-MM-DD`).
    pub before: Option<String>,
    /// Only messages without the `\Seen` flag.
    pub unseen: bool,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

/// Downloaded attachment bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentContent {
    /// Declared filename, if any.
    pub filename: Option<String>,
    /// Declared content type.
    pub content_type: String,
    /// Decoded attachment bytes.
    pub data: Vec<u8>,
}

/// Message to submit over SMTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Sender address.
    pub from: String,
    /// Primary recipients.
    pub to: Vec<String>,
    /// Carbon-copy recipients.
    pub cc: Vec<String>,
    /// Blind carbon-copy recipients.
    pub bcc: Vec<String>,
    /// Optional `Reply-To` address.
    pub reply_to: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text: Option<String>,
    /// HTML body.
    pub html: Option<String>,
}

/// Result of an SMTP submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// `Message-ID` assigned to the sent message.
    pub message_id: Option<String>,
    /// Recipients accepted by the server.
    pub accepted: Vec<String>,
    /// Recipients rejected by the server.
    pub rejected: Vec<String>,
    /// Raw RFC 5322 bytes, when the transport can provide them for the Sent folder.
    pub raw: Option<Vec<u8>>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Mail transport failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailError {
    /// Server could not be reached.
    #[error("mail connection failed: {0}")]
    Connection(String),
    /// Server rejected the credentials.
    #[error("mail authentication failed: {0}")]
    Authentication(String),
    /// Mailbox, message, or part does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Server rejected the submission or recipients.
    #[error("mail rejected: {0}")]
    Rejected(String),
    /// Unexpected protocol response.
    #[error("mail protocol error: {0}")]
    Protocol(String),
}

// ============================================================================
// SECTION: Transport Contract
// ============================================================================

/// SMTP/IMAP collaborator. Implementations own connection handling and timeouts.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Lists mailboxes visible to the IMAP account.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the server call fails.
    async fn list_mailboxes(&self, config: &ImapConfig) -> Result<Vec<Mailbox>, MailError>;

    /// Lists messages newest first, skipping `offset` and returning at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the server call fails.
    async fn list_messages(
        &self,
        config: &ImapConfig,
        mailbox: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MessageSummary>, MailError>;

    /// Fetches one message with bodies and attachment metadata.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the server call fails.
    async fn get_message(
        &self,
        config: &ImapConfig,
        mailbox: &str,
        uid: u32,
    ) -> Result<MessageDetail, MailError>;

    /// Searches a mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the server call fails.
    async fn search_messages(
        &self,
        config: &ImapConfig,
        mailbox: &str,
        criteria: &SearchCriteria,
    ) -> Result<Vec<MessageSummary>, MailError>;

    /// Downloads one attachment part.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the server call fails.
    async fn download_attachment(
        &self,
        config: &ImapConfig,
        mailbox: &str,
        uid: u32,
        part: &str,
    ) -> Result<AttachmentContent, MailError>;

    /// Appends a raw message to the account's Sent folder.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the server call fails.
    async fn append_to_sent(&self, config: &ImapConfig, raw: &[u8]) -> Result<(), MailError>;

    /// Submits a message over SMTP.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the submission fails.
    async fn send_mail(
        &self,
        config: &EmailConfig,
        message: &OutgoingMessage,
    ) -> Result<SentMessage, MailError>;
}
