// crates/mailgate-mcp/tests/common/mod.rs
// =============================================================================
// Module: MCP Test Helpers
// Description: Shared fixtures for auth, gate, and tool router tests.
// Purpose: Build routers over an in-memory transport and recording sinks.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use mailgate_config::AuditLogConfig;
use mailgate_config::ConfigResolver;
use mailgate_config::CredentialStore;
use mailgate_config::MapEnv;
use mailgate_config::ServerConfig;
use mailgate_core::Attachment;
use mailgate_core::InMemoryMailTransport;
use mailgate_core::MessageDetail;
use mailgate_mcp::AuditLogSink;
use mailgate_mcp::AuditRecord;
use mailgate_mcp::AuditSinkError;
use mailgate_mcp::Authenticator;
use mailgate_mcp::ToolRouter;
use mailgate_mcp::auth::AuthAuditEvent;
use mailgate_mcp::auth::AuthAuditSink;

/// Two agents with separate IMAP accounts and shared hosts.
pub const AGENTS_TOML: &str = r#"
[shared]
SMTP_HOST = "smtp.biz.com"
IMAP_HOST = "imap.biz.com"
AUDIT_LOG_URL = "http://audit.invalid"
AUDIT_LOG_TOKEN = "audit-token"

[agents.coo]
apiKey = "key-coo-123"
SMTP_FROM = "coo@biz.com"
IMAP_USER = "coo@biz.com"
IMAP_PASS = "coo-imap"
AUDIT_LOG_CHANNEL = "coo-audit"

[agents.cfo]
apiKey = "key-cfo-456"
SMTP_HOST = "smtp.finance.biz.com"
SMTP_USER = "cfo@biz.com"
IMAP_USER = "cfo@biz.com"
IMAP_PASS = "cfo-imap"
"#;

/// Parses [`AGENTS_TOML`].
pub fn agents() -> Result<Arc<CredentialStore>, String> {
    CredentialStore::from_toml_str(AGENTS_TOML).map(Arc::new).map_err(|err| err.to_string())
}

/// Server settings with no static key.
pub fn server_config(api_key: Option<&str>, require_auth: bool) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 3000,
        api_key: api_key.map(str::to_string),
        require_auth,
    }
}

/// Auth audit sink that keeps every event.
#[derive(Default)]
pub struct RecordingAuthAudit {
    /// Recorded events.
    events: Mutex<Vec<AuthAuditEvent>>,
}

impl RecordingAuthAudit {
    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<AuthAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl AuthAuditSink for RecordingAuthAudit {
    fn record(&self, event: &AuthAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Audit log sink that keeps every delivery and can be told to fail.
#[derive(Default)]
pub struct RecordingAuditLog {
    /// Delivered records with their destination settings.
    deliveries: Mutex<Vec<(AuditLogConfig, AuditRecord)>>,
    /// Failure to return instead of recording.
    failure: Mutex<Option<AuditSinkError>>,
}

impl RecordingAuditLog {
    /// Returns a copy of the delivered records.
    pub fn deliveries(&self) -> Vec<(AuditLogConfig, AuditRecord)> {
        self.deliveries.lock().map(|items| items.clone()).unwrap_or_default()
    }

    /// Makes subsequent deliveries fail with `error`.
    pub fn fail_with(&self, error: AuditSinkError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(error);
        }
    }
}

#[async_trait]
impl AuditLogSink for RecordingAuditLog {
    async fn deliver(
        &self,
        config: &AuditLogConfig,
        record: &AuditRecord,
    ) -> Result<(), AuditSinkError> {
        if let Some(error) = self.failure.lock().ok().and_then(|failure| failure.clone()) {
            return Err(error);
        }
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.push((config.clone(), record.clone()));
        }
        Ok(())
    }
}

/// Builds a message for `mailbox` with a plain-text body.
pub fn message(uid: u32, mailbox: &str, subject: &str, text: &str) -> MessageDetail {
    MessageDetail {
        uid,
        mailbox: mailbox.to_string(),
        message_id: Some(format!("<{uid}@vendor.example>")),
        from: "vendor@example.com".to_string(),
        to: vec!["coo@biz.com".to_string()],
        cc: Vec::new(),
        subject: Some(subject.to_string()),
        date: Some("Mon, 5 Oct 2026 09:00:00 +0000".to_string()),
        flags: vec!["\\Seen".to_string()],
        text: Some(text.to_string()),
        html: None,
        attachments: Vec::new(),
    }
}

/// Builds a PDF attachment descriptor.
pub fn pdf_attachment(part: &str, size: u64) -> Attachment {
    Attachment {
        part: part.to_string(),
        filename: Some("invoice.pdf".to_string()),
        content_type: "application/pdf".to_string(),
        size,
    }
}

/// Router fixture with handles to its collaborators.
pub struct Harness {
    /// Router under test.
    pub router: ToolRouter,
    /// Backing transport.
    pub transport: InMemoryMailTransport,
    /// Auth decisions.
    pub auth_audit: Arc<RecordingAuthAudit>,
    /// Audit deliveries.
    pub audit_log: Arc<RecordingAuditLog>,
}

/// Builds a multi-agent router over [`AGENTS_TOML`] and `env`.
pub fn harness(env: MapEnv) -> Result<Harness, String> {
    harness_with(agents()?, &server_config(None, false), env)
}

/// Builds a router over explicit credentials and server settings.
pub fn harness_with(
    credentials: Arc<CredentialStore>,
    server: &ServerConfig,
    env: MapEnv,
) -> Result<Harness, String> {
    let transport = InMemoryMailTransport::new();
    let auth_audit = Arc::new(RecordingAuthAudit::default());
    let audit_log = Arc::new(RecordingAuditLog::default());
    let authenticator = Authenticator::new(Arc::clone(&credentials), server, auth_audit.clone())
        .map_err(|err| err.to_string())?;
    let resolver = ConfigResolver::new(credentials, Arc::new(env));
    let router = ToolRouter::new(
        authenticator,
        resolver,
        Arc::new(transport.clone()),
        audit_log.clone(),
    )
    .map_err(|err| err.to_string())?;
    Ok(Harness {
        router,
        transport,
        auth_audit,
        audit_log,
    })
}
