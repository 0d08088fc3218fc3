// crates/mailgate-config/src/resolver.rs
// ============================================================================
// Module: Config Resolver
// Description: Agent-scoped settings lookup and derived mail/server settings.
// Purpose: Resolve each setting for the agent bound to the current call.
// Dependencies: mailgate-core
// ============================================================================

//! ## Overview
//! Every lookup reads the identity bound by `mailgate_core::scope` at the
//! moment of the call and resolves through three tiers: the agent's own
//! override, the shared default, then the process environment. Nothing is
//! cached; two concurrent calls bound to different agents each see their own
//! values.
//!
//! Port and boolean values fail fast on malformed input and are never
//! clamped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use mailgate_core::EmailConfig;
use mailgate_core::ImapConfig;
use mailgate_core::current_agent_id;

use crate::credentials::CredentialStore;
use crate::env::EnvSource;
use crate::env::ProcessEnv;
use crate::error::ConfigError;
use crate::settings::AUDIT_LOG_CHANNEL;
use crate::settings::AUDIT_LOG_TOKEN;
use crate::settings::AUDIT_LOG_URL;
use crate::settings::AuditLogConfig;
use crate::settings::DEFAULT_AUDIT_LOG_CHANNEL;
use crate::settings::DEFAULT_IMAP_PORT;
use crate::settings::DEFAULT_MCP_HOST;
use crate::settings::DEFAULT_MCP_PORT;
use crate::settings::DEFAULT_SMTP_PORT;
use crate::settings::IMAP_HOST;
use crate::settings::IMAP_PASS;
use crate::settings::IMAP_PORT;
use crate::settings::IMAP_TLS;
use crate::settings::IMAP_USER;
use crate::settings::MCP_API_KEY;
use crate::settings::MCP_HOST;
use crate::settings::MCP_PORT;
use crate::settings::MCP_REQUIRE_AUTH;
use crate::settings::SMTP_FROM;
use crate::settings::SMTP_HOST;
use crate::settings::SMTP_PASS;
use crate::settings::SMTP_PORT;
use crate::settings::SMTP_USER;
use crate::settings::ServerConfig;

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves settings for the agent bound to the current call.
#[derive(Clone)]
pub struct ConfigResolver {
    /// Loaded agents and shared defaults.
    credentials: Arc<CredentialStore>,
    /// Process-wide tier.
    env: Arc<dyn EnvSource>,
}

impl ConfigResolver {
    /// Creates a resolver over `credentials` and `env`.
    #[must_use]
    pub fn new(credentials: Arc<CredentialStore>, env: Arc<dyn EnvSource>) -> Self {
        Self {
            credentials,
            env,
        }
    }

    /// Creates a resolver whose last tier is the process environment.
    #[must_use]
    pub fn with_process_env(credentials: Arc<CredentialStore>) -> Self {
        Self::new(credentials, Arc::new(ProcessEnv))
    }

    /// Returns the value for `key`: agent override, shared default, then
    /// environment. Empty values at any tier count as absent.
    #[must_use]
    pub fn get_env(&self, key: &str) -> Option<String> {
        if let Some(agent_id) = current_agent_id()
            && let Some(value) = self.credentials.agent_override(&agent_id, key)
            && !value.is_empty()
        {
            return Some(value.to_string());
        }
        self.env.get(key)
    }

    /// Returns the value for `key` or a missing-setting error naming the
    /// bound agent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when no tier supplies a value.
    pub fn get_required_env(&self, key: &str) -> Result<String, ConfigError> {
        self.get_env(key).ok_or_else(|| ConfigError::Missing {
            key: key.to_string(),
            agent: current_agent_id(),
        })
    }

    /// Resolves the server surface settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed port or flag.
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        Ok(ServerConfig {
            host: self.get_env(MCP_HOST).unwrap_or_else(|| DEFAULT_MCP_HOST.to_string()),
            port: self.port_or(MCP_PORT, DEFAULT_MCP_PORT)?,
            api_key: self.get_env(MCP_API_KEY),
            require_auth: self.bool_or(MCP_REQUIRE_AUTH, false)?,
        })
    }

    /// Resolves SMTP settings. `SMTP_FROM` falls back to `SMTP_USER`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the host or sender is missing or the
    /// port is malformed.
    pub fn email_config(&self) -> Result<EmailConfig, ConfigError> {
        let host = self.get_required_env(SMTP_HOST)?;
        let port = self.port_or(SMTP_PORT, DEFAULT_SMTP_PORT)?;
        let user = self.get_env(SMTP_USER);
        let from = match self.get_env(SMTP_FROM) {
            Some(from) => from,
            None => self.get_required_env(SMTP_USER)?,
        };
        Ok(EmailConfig {
            host,
            port,
            from,
            user,
            pass: self.get_env(SMTP_PASS),
        })
    }

    /// Resolves IMAP settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when host, user, or password is missing or a
    /// value is malformed.
    pub fn imap_config(&self) -> Result<ImapConfig, ConfigError> {
        Ok(ImapConfig {
            host: self.get_required_env(IMAP_HOST)?,
            port: self.port_or(IMAP_PORT, DEFAULT_IMAP_PORT)?,
            user: self.get_required_env(IMAP_USER)?,
            pass: self.get_required_env(IMAP_PASS)?,
            tls: self.bool_or(IMAP_TLS, true)?,
        })
    }

    /// Resolves the audit log destination. URL and token are optional.
    #[must_use]
    pub fn audit_log_config(&self) -> AuditLogConfig {
        AuditLogConfig {
            base_url: self.get_env(AUDIT_LOG_URL),
            token: self.get_env(AUDIT_LOG_TOKEN),
            channel: self
                .get_env(AUDIT_LOG_CHANNEL)
                .unwrap_or_else(|| DEFAULT_AUDIT_LOG_CHANNEL.to_string()),
        }
    }

    /// Resolves `key` as a port, using `default` when absent.
    fn port_or(&self, key: &str, default: u16) -> Result<u16, ConfigError> {
        self.get_env(key).map_or(Ok(default), |raw| parse_port(key, &raw))
    }

    /// Resolves `key` as a boolean flag, using `default` when absent.
    fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        self.get_env(key).map_or(Ok(default), |raw| parse_bool(key, &raw))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a TCP port in `1 ..= 65535`.
pub(crate) fn parse_port(key: &str, raw: &str) -> Result<u16, ConfigError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected an integer port in 1..=65535, got '{raw}'"),
        }),
    }
}

/// Parses `true/false/1/0/yes/no`, case-insensitive.
pub(crate) fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "expected one of true/false/1/0/yes/no".to_string(),
        }),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
