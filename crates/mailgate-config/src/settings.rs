// crates/mailgate-config/src/settings.rs
// ============================================================================
// Module: Derived Settings
// Description: Server and audit log settings built from resolved values.
// Purpose: Typed settings records with defaults and secret redaction.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Typed records produced by [`crate::ConfigResolver`]. Mail settings live in
//! `mailgate-core` beside the transport that consumes them; the records here
//! cover the server surface and the audit log destination.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

// ============================================================================
// SECTION: Setting Names
// ============================================================================

/// Server bind host.
pub const MCP_HOST: &str = "MCP_HOST";
/// Server bind port.
pub const MCP_PORT: &str = "MCP_PORT";
/// Static API key for single-key mode.
pub const MCP_API_KEY: &str = "MCP_API_KEY";
/// Refuse to start without authentication.
pub const MCP_REQUIRE_AUTH: &str = "MCP_REQUIRE_AUTH";
/// SMTP host.
pub const SMTP_HOST: &str = "SMTP_HOST";
/// SMTP port.
pub const SMTP_PORT: &str = "SMTP_PORT";
/// Sender address.
pub const SMTP_FROM: &str = "SMTP_FROM";
/// SMTP username.
pub const SMTP_USER: &str = "SMTP_USER";
/// SMTP password.
pub const SMTP_PASS: &str = "SMTP_PASS";
/// IMAP host.
pub const IMAP_HOST: &str = "IMAP_HOST";
/// IMAP port.
pub const IMAP_PORT: &str = "IMAP_PORT";
/// IMAP username.
pub const IMAP_USER: &str = "IMAP_USER";
/// IMAP password.
pub const IMAP_PASS: &str = "IMAP_PASS";
/// IMAP TLS toggle.
pub const IMAP_TLS: &str = "IMAP_TLS";
/// Audit log service base URL.
pub const AUDIT_LOG_URL: &str = "AUDIT_LOG_URL";
/// Audit log bearer token.
pub const AUDIT_LOG_TOKEN: &str = "AUDIT_LOG_TOKEN";
/// Audit log channel.
pub const AUDIT_LOG_CHANNEL: &str = "AUDIT_LOG_CHANNEL";

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default server bind host (loopback).
pub const DEFAULT_MCP_HOST: &str = "127.0.0.1";
/// Default server bind port.
pub const DEFAULT_MCP_PORT: u16 = 3000;
/// Default SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;
/// Default IMAPS port.
pub const DEFAULT_IMAP_PORT: u16 = 993;
/// Default audit log channel.
pub const DEFAULT_AUDIT_LOG_CHANNEL: &str = "email-audit";

// ============================================================================
// SECTION: Records
// ============================================================================

/// Server surface settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Static API key for single-key mode.
    pub api_key: Option<String>,
    /// Refuse open mode when set.
    pub require_auth: bool,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("require_auth", &self.require_auth)
            .finish()
    }
}

/// Audit log destination settings.
#[derive(Clone, PartialEq, Eq)]
pub struct AuditLogConfig {
    /// Service base URL.
    pub base_url: Option<String>,
    /// Bearer token.
    pub token: Option<String>,
    /// Channel receiving audit records.
    pub channel: String,
}

impl AuditLogConfig {
    /// Returns true when both URL and token are present.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.token.is_some()
    }
}

impl fmt::Debug for AuditLogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLogConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("channel", &self.channel)
            .finish()
    }
}
