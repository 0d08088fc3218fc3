// crates/mailgate-mcp/src/tools.rs
// ============================================================================
// Module: Email Tool Router
// Description: Authenticated dispatch for the email tool surface.
// Purpose: Authenticate each call, bind its agent, and run the tool handler.
// Dependencies: mailgate-core, mailgate-config, base64, serde, serde_json
// ============================================================================

//! ## Overview
//! The outer protocol hands every `tools/call` to
//! [`ToolRouter::handle_tool_call`]. The router parses the tool name,
//! authenticates the caller, and runs the handler inside the caller's agent
//! scope so each settings lookup resolves for that agent. Reads of message
//! content go through the [`GateReader`]; summaries returned by list and
//! search wrap subjects with the same boundary sanitizer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use mailgate_config::ConfigError;
use mailgate_config::ConfigResolver;
use mailgate_core::MailError;
use mailgate_core::MailTransport;
use mailgate_core::MessageSummary;
use mailgate_core::OutgoingMessage;
use mailgate_core::SearchCriteria;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::audit::AuditLogSink;
use crate::auth::AuthError;
use crate::auth::Authenticator;
use crate::auth::RequestContext;
use crate::auth::UNAUTHORIZED_MESSAGE;
use crate::gate::GateError;
use crate::gate::GateReader;
use crate::gate::MessageRef;
use crate::sanitize::BoundarySanitizer;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Mailbox used when a request names none.
pub const DEFAULT_MAILBOX: &str = "INBOX";
/// Default list/search page size.
const DEFAULT_LIST_LIMIT: usize = 20;
/// Maximum list/search page size.
const MAX_LIST_LIMIT: usize = 100;

// ============================================================================
// SECTION: Tool Names
// ============================================================================

/// Email tools exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Send a message over SMTP.
    SendEmail,
    /// List IMAP mailboxes.
    ListMailboxes,
    /// List messages in a mailbox.
    ListMessages,
    /// Search a mailbox.
    SearchMessages,
    /// Gated read of one message.
    ReadEmail,
    /// Gated attachment download.
    DownloadAttachment,
}

impl ToolName {
    /// Every tool, in listing order.
    pub const ALL: [Self; 6] = [
        Self::SendEmail,
        Self::ListMailboxes,
        Self::ListMessages,
        Self::SearchMessages,
        Self::ReadEmail,
        Self::DownloadAttachment,
    ];

    /// Parses a wire tool name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    /// Returns the wire tool name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SendEmail => "send_email",
            Self::ListMailboxes => "list_mailboxes",
            Self::ListMessages => "list_messages",
            Self::SearchMessages => "search_messages",
            Self::ReadEmail => "read_email",
            Self::DownloadAttachment => "download_attachment",
        }
    }

    /// Returns the one-line tool description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SendEmail => "Send an email from the caller's configured account.",
            Self::ListMailboxes => "List mailboxes in the caller's IMAP account.",
            Self::ListMessages => "List recent messages in a mailbox, newest first.",
            Self::SearchMessages => "Search a mailbox by sender, recipient, subject, or text.",
            Self::ReadEmail => "Read one message; content is audited and returned as untrusted.",
            Self::DownloadAttachment => "Download one attachment as base64; the access is audited.",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDefinition {
    /// Wire tool name.
    pub name: ToolName,
    /// One-line description.
    pub description: &'static str,
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// `send_email` parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SendEmailRequest {
    /// Primary recipients.
    to: Vec<String>,
    /// Carbon-copy recipients.
    #[serde(default)]
    cc: Vec<String>,
    /// Blind carbon-copy recipients.
    #[serde(default)]
    bcc: Vec<String>,
    /// Subject line.
    subject: String,
    /// Plain-text body.
    #[serde(default)]
    text: Option<String>,
    /// HTML body.
    #[serde(default)]
    html: Option<String>,
    /// `Reply-To` address.
    #[serde(default)]
    reply_to: Option<String>,
}

/// `list_mailboxes` parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListMailboxesRequest {}

/// `list_messages` parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListMessagesRequest {
    /// Mailbox name.
    #[serde(default)]
    mailbox: Option<String>,
    /// Page size.
    #[serde(default)]
    limit: Option<usize>,
    /// Messages to skip.
    #[serde(default)]
    offset: Option<usize>,
}

/// `search_messages` parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchMessagesRequest {
    /// Mailbox name.
    #[serde(default)]
    mailbox: Option<String>,
    /// Sender contains.
    #[serde(default)]
    from: Option<String>,
    /// Recipient contains.
    #[serde(default)]
    to: Option<String>,
    /// Subject contains.
    #[serde(default)]
    subject: Option<String>,
    /// Body contains.
    #[serde(default)]
    text: Option<String>,
    /// Received on or after this date.
    #[serde(default)]
    since: Option<String>,
    /// Received before this date.
    #[serde(default)]
    before: Option<String>,
    /// Unseen messages only.
    #[serde(default)]
    unseen: bool,
    /// Result cap.
    #[serde(default)]
    limit: Option<usize>,
}

/// `read_email` parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReadEmailRequest {
    /// Mailbox name.
    #[serde(default)]
    mailbox: Option<String>,
    /// Message UID.
    uid: u32,
    /// Return bodies as well as metadata.
    #[serde(default)]
    include_body: Option<bool>,
}

/// `download_attachment` parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DownloadAttachmentRequest {
    /// Mailbox name.
    #[serde(default)]
    mailbox: Option<String>,
    /// Message UID.
    uid: u32,
    /// MIME part identifier.
    part: String,
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// `send_email` result.
#[derive(Debug, Serialize)]
struct SendEmailResponse {
    /// Assigned `Message-ID`.
    message_id: Option<String>,
    /// Accepted recipients.
    accepted: Vec<String>,
    /// Rejected recipients.
    rejected: Vec<String>,
    /// Whether a copy reached the Sent folder.
    saved_to_sent: bool,
}

/// `list_messages` and `search_messages` result.
#[derive(Debug, Serialize)]
struct MessageListResponse {
    /// Mailbox listed.
    mailbox: String,
    /// Number of messages returned.
    count: usize,
    /// Summaries with wrapped subjects.
    messages: Vec<MessageSummary>,
}

/// `download_attachment` result.
#[derive(Debug, Serialize)]
struct DownloadAttachmentResponse {
    /// Declared filename.
    filename: Option<String>,
    /// Declared content type.
    content_type: String,
    /// Size in bytes.
    size: usize,
    /// Base64 content.
    content_base64: String,
    /// Whether the access reached the audit log.
    logged: bool,
    /// Channel the access was addressed to.
    audit_channel: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool routing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Tool name not recognized.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Parameters failed to decode or validate.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// Authentication failed.
    #[error(transparent)]
    Unauthorized(#[from] AuthError),
    /// Settings for the call could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The mail transport failed.
    #[error(transparent)]
    Mail(#[from] MailError),
    /// Internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Returns the stable JSON-RPC error code.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::UnknownTool(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::Unauthorized(err) => err.code(),
            Self::Config(_) => -32010,
            Self::Mail(_) => -32020,
            Self::Internal(_) => -32050,
        }
    }

    /// Returns the message safe to show the caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthorized(AuthError::Unauthorized(_)) => UNAUTHORIZED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<GateError> for ToolError {
    fn from(error: GateError) -> Self {
        match error {
            GateError::Config(err) => Self::Config(err),
            GateError::Mail(err) => Self::Mail(err),
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Authenticated email tool router.
pub struct ToolRouter {
    /// Caller authentication.
    authenticator: Authenticator,
    /// Per-call settings.
    resolver: ConfigResolver,
    /// Mail collaborator.
    transport: Arc<dyn MailTransport>,
    /// Audited read path.
    gate: GateReader,
}

impl ToolRouter {
    /// Builds a router.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Internal`] when the boundary sanitizer cannot be
    /// compiled.
    pub fn new(
        authenticator: Authenticator,
        resolver: ConfigResolver,
        transport: Arc<dyn MailTransport>,
        audit_sink: Arc<dyn AuditLogSink>,
    ) -> Result<Self, ToolError> {
        let sanitizer =
            BoundarySanitizer::new().map_err(|err| ToolError::Internal(err.to_string()))?;
        let gate =
            GateReader::new(resolver.clone(), Arc::clone(&transport), audit_sink, sanitizer);
        Ok(Self {
            authenticator,
            resolver,
            transport,
            gate,
        })
    }

    /// Returns the authenticator.
    #[must_use]
    pub const fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Lists the available tools.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        ToolName::ALL
            .into_iter()
            .map(|name| ToolDefinition {
                name,
                description: name.description(),
            })
            .collect()
    }

    /// Handles a tool call by name with JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the name is unknown, authentication fails,
    /// or the handler fails.
    pub async fn handle_tool_call(
        &self,
        context: &RequestContext,
        name: &str,
        payload: Value,
    ) -> Result<Value, ToolError> {
        let tool = ToolName::parse(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        self.authenticator.run(context, Some(tool.as_str()), self.dispatch(tool, payload)).await?
    }

    /// Runs the handler for `tool`. Must be called inside the caller's scope.
    async fn dispatch(&self, tool: ToolName, payload: Value) -> Result<Value, ToolError> {
        match tool {
            ToolName::SendEmail => self.handle_send_email(decode(payload)?).await,
            ToolName::ListMailboxes => {
                let _: ListMailboxesRequest = decode(payload)?;
                self.handle_list_mailboxes().await
            }
            ToolName::ListMessages => self.handle_list_messages(decode(payload)?).await,
            ToolName::SearchMessages => self.handle_search_messages(decode(payload)?).await,
            ToolName::ReadEmail => self.handle_read_email(decode(payload)?).await,
            ToolName::DownloadAttachment => {
                self.handle_download_attachment(decode(payload)?).await
            }
        }
    }

    /// Sends a message, then copies it to the Sent folder when possible.
    async fn handle_send_email(&self, request: SendEmailRequest) -> Result<Value, ToolError> {
        if request.to.iter().all(|address| address.trim().is_empty()) {
            return Err(ToolError::InvalidParams("to must name at least one recipient".to_string()));
        }
        let email = self.resolver.email_config()?;
        let message = OutgoingMessage {
            from: email.from.clone(),
            to: request.to,
            cc: request.cc,
            bcc: request.bcc,
            reply_to: request.reply_to,
            subject: request.subject,
            text: request.text,
            html: request.html,
        };
        let sent = self.transport.send_mail(&email, &message).await?;
        let saved_to_sent = match sent.raw.as_deref() {
            Some(raw) => self.append_to_sent(raw).await,
            None => false,
        };
        encode(&SendEmailResponse {
            message_id: sent.message_id,
            accepted: sent.accepted,
            rejected: sent.rejected,
            saved_to_sent,
        })
    }

    /// Best-effort copy of a sent message to the Sent folder.
    async fn append_to_sent(&self, raw: &[u8]) -> bool {
        let imap = match self.resolver.imap_config() {
            Ok(imap) => imap,
            Err(err) => {
                tracing::warn!(error = %err, "sent copy skipped; imap settings unavailable");
                return false;
            }
        };
        match self.transport.append_to_sent(&imap, raw).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "sent copy failed");
                false
            }
        }
    }

    /// Lists mailboxes.
    async fn handle_list_mailboxes(&self) -> Result<Value, ToolError> {
        let imap = self.resolver.imap_config()?;
        let mailboxes = self.transport.list_mailboxes(&imap).await?;
        Ok(serde_json::json!({ "mailboxes": mailboxes }))
    }

    /// Lists a page of messages.
    async fn handle_list_messages(&self, request: ListMessagesRequest) -> Result<Value, ToolError> {
        let limit = normalize_limit(request.limit)?;
        let mailbox = mailbox_or_default(request.mailbox);
        let imap = self.resolver.imap_config()?;
        let summaries = self
            .transport
            .list_messages(&imap, &mailbox, limit, request.offset.unwrap_or(0))
            .await?;
        self.message_list(mailbox, summaries)
    }

    /// Searches a mailbox.
    async fn handle_search_messages(
        &self,
        request: SearchMessagesRequest,
    ) -> Result<Value, ToolError> {
        let limit = normalize_limit(request.limit)?;
        let mailbox = mailbox_or_default(request.mailbox);
        let criteria = SearchCriteria {
            from: request.from,
            to: request.to,
            subject: request.subject,
            text: request.text,
            since: request.since,
            before: request.before,
            unseen: request.unseen,
            limit: Some(limit),
        };
        let imap = self.resolver.imap_config()?;
        let mut summaries = self.transport.search_messages(&imap, &mailbox, &criteria).await?;
        summaries.truncate(limit);
        self.message_list(mailbox, summaries)
    }

    /// Reads one message through the gate.
    async fn handle_read_email(&self, request: ReadEmailRequest) -> Result<Value, ToolError> {
        let message = MessageRef::new(mailbox_or_default(request.mailbox), request.uid);
        let result = self.gate.gate_read(&message, request.include_body.unwrap_or(true)).await?;
        encode(&result)
    }

    /// Downloads one attachment through the gate.
    async fn handle_download_attachment(
        &self,
        request: DownloadAttachmentRequest,
    ) -> Result<Value, ToolError> {
        if request.part.trim().is_empty() {
            return Err(ToolError::InvalidParams("part must be non-empty".to_string()));
        }
        let message = MessageRef::new(mailbox_or_default(request.mailbox), request.uid);
        let gated = self.gate.gate_attachment(&message, &request.part).await?;
        encode(&DownloadAttachmentResponse {
            filename: gated.content.filename,
            content_type: gated.content.content_type,
            size: gated.content.data.len(),
            content_base64: STANDARD.encode(&gated.content.data),
            logged: gated.logged,
            audit_channel: gated.audit_channel,
        })
    }

    /// Wraps subjects and encodes a message list.
    fn message_list(
        &self,
        mailbox: String,
        mut messages: Vec<MessageSummary>,
    ) -> Result<Value, ToolError> {
        let sanitizer = self.gate.sanitizer();
        for summary in &mut messages {
            summary.subject = summary.subject.as_deref().map(|subject| sanitizer.wrap(subject));
        }
        encode(&MessageListResponse {
            mailbox,
            count: messages.len(),
            messages,
        })
    }
}

impl fmt::Debug for ToolRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRouter")
            .field("authenticator", &self.authenticator)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decodes a tool payload. `null` decodes as an empty object.
fn decode<T: for<'de> Deserialize<'de>>(payload: Value) -> Result<T, ToolError> {
    let payload = if payload.is_null() { Value::Object(serde_json::Map::new()) } else { payload };
    serde_json::from_value(payload).map_err(|err| ToolError::InvalidParams(err.to_string()))
}

/// Encodes a tool response.
fn encode<T: Serialize>(response: &T) -> Result<Value, ToolError> {
    serde_json::to_value(response).map_err(|err| ToolError::Internal(err.to_string()))
}

/// Normalizes list limits against defaults and bounds.
fn normalize_limit(limit: Option<usize>) -> Result<usize, ToolError> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit == 0 || limit > MAX_LIST_LIMIT {
        return Err(ToolError::InvalidParams(format!(
            "limit must be between 1 and {MAX_LIST_LIMIT}"
        )));
    }
    Ok(limit)
}

/// Returns the requested mailbox, or `INBOX` when absent or blank.
fn mailbox_or_default(mailbox: Option<String>) -> String {
    mailbox.filter(|name| !name.trim().is_empty()).unwrap_or_else(|| DEFAULT_MAILBOX.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
