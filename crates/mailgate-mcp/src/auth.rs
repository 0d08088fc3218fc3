// crates/mailgate-mcp/src/auth.rs
// ============================================================================
// Module: MCP Authentication
// Description: API key authentication and agent binding for tool calls.
// Purpose: Provide a fail-closed gate that binds each call to its agent.
// Dependencies: mailgate-core, mailgate-config, serde, sha2, tracing
// ============================================================================

//! ## Overview
//! The authentication mode is chosen once at construction:
//! - `MultiAgent` when the agents file defines at least one agent.
//! - `StaticKey` when `MCP_API_KEY` is set and no agents are defined.
//! - `Open` otherwise (refused when `MCP_REQUIRE_AUTH` is set).
//!
//! Every call presents its key in the `x-api-key` header. Failures of any
//! kind surface to the caller as the same fixed `unauthorized` error; the
//! specific reason is only recorded in the auth audit event. Every decision
//! emits an [`AuthAuditEvent`] carrying a key fingerprint, never the key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use mailgate_config::CredentialStore;
use mailgate_config::ServerConfig;
use mailgate_core::AgentId;
use mailgate_core::constant_time_eq_str;
use mailgate_core::run_scoped;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";
/// JSON-RPC error code for every authentication failure.
pub const UNAUTHORIZED_CODE: i64 = -32001;
/// JSON-RPC error code when authentication is required but not configured.
pub const AUTH_NOT_CONFIGURED_CODE: i64 = -32010;
/// Caller-facing message for every authentication failure.
pub const UNAUTHORIZED_MESSAGE: &str = "unauthorized";
/// Maximum accepted API key header value size.
const MAX_API_KEY_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request carrier for the values authentication reads.
#[derive(Clone, Default)]
pub struct RequestContext {
    /// Every `x-api-key` header value presented, in order.
    api_key_values: Vec<String>,
    /// Optional request identifier for auditing.
    request_id: Option<String>,
}

impl RequestContext {
    /// Builds a context that presents no API key.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Builds a context presenting exactly one API key.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key_values: vec![api_key.into()],
            request_id: None,
        }
    }

    /// Builds a context from raw header pairs, keeping every `x-api-key`
    /// value (header names compare case-insensitively).
    #[must_use]
    pub fn from_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let api_key_values = headers
            .into_iter()
            .filter(|(name, _)| name.as_ref().eq_ignore_ascii_case(API_KEY_HEADER))
            .map(|(_, value)| value.into())
            .collect();
        Self {
            api_key_values,
            request_id: None,
        }
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns the request identifier, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns the single presented key, or the reason there is none.
    fn presented_key(&self) -> Result<&str, DenyReason> {
        let [value] = self.api_key_values.as_slice() else {
            return Err(if self.api_key_values.is_empty() {
                DenyReason::MissingKey
            } else {
                DenyReason::MultipleKeys
            });
        };
        if value.is_empty() {
            return Err(DenyReason::MissingKey);
        }
        if value.len() > MAX_API_KEY_HEADER_BYTES {
            return Err(DenyReason::KeyTooLarge);
        }
        if !value.bytes().all(|byte| byte.is_ascii_graphic()) {
            return Err(DenyReason::MalformedKey);
        }
        Ok(value)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("api_key_values", &self.api_key_values.len())
            .field("request_id", &self.request_id)
            .finish()
    }
}

// ============================================================================
// SECTION: Modes and Outcomes
// ============================================================================

/// Authentication mode, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// No authentication; every call runs without an agent.
    Open,
    /// One static key; calls run without an agent.
    StaticKey,
    /// Per-agent keys; calls run bound to the matching agent.
    MultiAgent,
}

impl AuthMode {
    /// Returns the stable label used in audit events.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::StaticKey => "static_key",
            Self::MultiAgent => "multi_agent",
        }
    }
}

/// Successful authentication result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Open mode; no caller identity.
    Anonymous,
    /// Static key matched; no agent identity.
    StaticKey,
    /// Agent key matched.
    Agent(AgentId),
}

impl AuthOutcome {
    /// Returns the bound agent, if any.
    #[must_use]
    pub const fn agent_id(&self) -> Option<&AgentId> {
        match self {
            Self::Agent(agent_id) => Some(agent_id),
            Self::Anonymous | Self::StaticKey => None,
        }
    }

    /// Consumes the outcome, returning the bound agent, if any.
    #[must_use]
    pub fn into_agent_id(self) -> Option<AgentId> {
        match self {
            Self::Agent(agent_id) => Some(agent_id),
            Self::Anonymous | Self::StaticKey => None,
        }
    }
}

/// Internal reason for a denied call. Never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No key, or an empty key.
    MissingKey,
    /// More than one `x-api-key` value.
    MultipleKeys,
    /// Key contains characters outside visible ASCII.
    MalformedKey,
    /// Key exceeds the header size limit.
    KeyTooLarge,
    /// Key does not match any configured key.
    UnknownKey,
}

impl DenyReason {
    /// Returns the stable label used in audit events.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingKey => "missing_key",
            Self::MultipleKeys => "multiple_keys",
            Self::MalformedKey => "malformed_key",
            Self::KeyTooLarge => "key_too_large",
            Self::UnknownKey => "unknown_key",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing, malformed, or mismatched key. Display is always `unauthorized`.
    #[error("unauthorized")]
    Unauthorized(DenyReason),
    /// Open mode was selected while authentication is required.
    #[error("authentication is required but no agents or MCP_API_KEY are configured")]
    OpenModeForbidden,
}

impl AuthError {
    /// Returns the JSON-RPC error code.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::Unauthorized(_) => UNAUTHORIZED_CODE,
            Self::OpenModeForbidden => AUTH_NOT_CONFIGURED_CODE,
        }
    }
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Audit sink for authentication decisions.
pub trait AuthAuditSink: Send + Sync {
    /// Records an auth audit event.
    fn record(&self, event: &AuthAuditEvent);
}

/// Auth audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Decision outcome (`allow` or `deny`).
    pub decision: &'static str,
    /// Authentication mode.
    pub mode: &'static str,
    /// Tool name, when known.
    pub tool: Option<String>,
    /// Bound agent, for multi-agent allows.
    pub agent_id: Option<String>,
    /// SHA-256 fingerprint of the presented key.
    pub key_fingerprint: Option<String>,
    /// Deny reason label.
    pub reason: Option<&'static str>,
    /// Request identifier, if provided.
    pub request_id: Option<String>,
}

impl AuthAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(
        mode: AuthMode,
        ctx: &RequestContext,
        tool: Option<&str>,
        outcome: &AuthOutcome,
    ) -> Self {
        Self {
            event: "mail_tool_auth",
            decision: "allow",
            mode: mode.label(),
            tool: tool.map(str::to_string),
            agent_id: outcome.agent_id().map(ToString::to_string),
            key_fingerprint: key_fingerprint(ctx),
            reason: None,
            request_id: ctx.request_id.clone(),
        }
    }

    /// Builds a deny event.
    #[must_use]
    pub fn denied(
        mode: AuthMode,
        ctx: &RequestContext,
        tool: Option<&str>,
        reason: DenyReason,
    ) -> Self {
        Self {
            event: "mail_tool_auth",
            decision: "deny",
            mode: mode.label(),
            tool: tool.map(str::to_string),
            agent_id: None,
            key_fingerprint: key_fingerprint(ctx),
            reason: Some(reason.label()),
            request_id: ctx.request_id.clone(),
        }
    }
}

/// Audit sink that emits each event as a JSON payload through `tracing`.
pub struct TracingAuthAuditSink;

impl AuthAuditSink for TracingAuthAuditSink {
    fn record(&self, event: &AuthAuditEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => tracing::info!(
                target: "mailgate::auth_audit",
                decision = event.decision,
                mode = event.mode,
                payload = %payload,
                "auth decision"
            ),
            Err(err) => tracing::warn!(
                target: "mailgate::auth_audit",
                error = %err,
                "auth audit event could not be serialized"
            ),
        }
    }
}

/// No-op audit sink.
pub struct NoopAuthAuditSink;

impl AuthAuditSink for NoopAuthAuditSink {
    fn record(&self, _event: &AuthAuditEvent) {}
}

// ============================================================================
// SECTION: Authenticator
// ============================================================================

/// Authenticates calls and runs them inside the matching agent scope.
pub struct Authenticator {
    /// Mode chosen at construction.
    mode: AuthMode,
    /// Agents used in multi-agent mode.
    credentials: Arc<CredentialStore>,
    /// Key used in static-key mode.
    static_key: Option<String>,
    /// Decision audit sink.
    audit: Arc<dyn AuthAuditSink>,
}

impl Authenticator {
    /// Chooses the mode from the loaded agents and server settings.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::OpenModeForbidden`] when no key source exists and
    /// `require_auth` is set.
    pub fn new(
        credentials: Arc<CredentialStore>,
        server: &ServerConfig,
        audit: Arc<dyn AuthAuditSink>,
    ) -> Result<Self, AuthError> {
        let static_key = server.api_key.clone().filter(|key| !key.is_empty());
        let mode = if credentials.has_agents() {
            AuthMode::MultiAgent
        } else if static_key.is_some() {
            AuthMode::StaticKey
        } else {
            AuthMode::Open
        };
        if mode == AuthMode::Open {
            if server.require_auth {
                return Err(AuthError::OpenModeForbidden);
            }
            tracing::warn!(
                host = %server.host,
                port = server.port,
                "no agents file entries or MCP_API_KEY configured; tool calls are unauthenticated"
            );
        }
        Ok(Self {
            mode,
            credentials,
            static_key,
            audit,
        })
    }

    /// Returns the active mode.
    #[must_use]
    pub const fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Authenticates one call and records the decision.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] for a missing, malformed, or
    /// mismatched key.
    pub fn authenticate(
        &self,
        ctx: &RequestContext,
        tool: Option<&str>,
    ) -> Result<AuthOutcome, AuthError> {
        match self.decide(ctx) {
            Ok(outcome) => {
                self.audit.record(&AuthAuditEvent::allowed(self.mode, ctx, tool, &outcome));
                Ok(outcome)
            }
            Err(reason) => {
                self.audit.record(&AuthAuditEvent::denied(self.mode, ctx, tool, reason));
                Err(AuthError::Unauthorized(reason))
            }
        }
    }

    /// Authenticates, then runs `body` bound to the caller's agent.
    ///
    /// Static-key and open calls run with no agent bound, even when an outer
    /// scope exists.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] without running `body` when authentication fails.
    pub async fn run<F>(
        &self,
        ctx: &RequestContext,
        tool: Option<&str>,
        body: F,
    ) -> Result<F::Output, AuthError>
    where
        F: Future,
    {
        let outcome = self.authenticate(ctx, tool)?;
        Ok(run_scoped(outcome.into_agent_id(), body).await)
    }

    /// Applies the mode to the presented key.
    fn decide(&self, ctx: &RequestContext) -> Result<AuthOutcome, DenyReason> {
        match self.mode {
            AuthMode::Open => Ok(AuthOutcome::Anonymous),
            AuthMode::StaticKey => {
                let presented = ctx.presented_key()?;
                let expected = self.static_key.as_deref().unwrap_or_default();
                if constant_time_eq_str(expected, presented) {
                    Ok(AuthOutcome::StaticKey)
                } else {
                    Err(DenyReason::UnknownKey)
                }
            }
            AuthMode::MultiAgent => {
                let presented = ctx.presented_key()?;
                self.credentials
                    .resolve_by_api_key(presented.as_bytes())
                    .map(AuthOutcome::Agent)
                    .ok_or(DenyReason::UnknownKey)
            }
        }
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("mode", &self.mode)
            .field("agents", &self.credentials.agent_ids())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Fingerprints the presented key when exactly one value was sent.
fn key_fingerprint(ctx: &RequestContext) -> Option<String> {
    let [value] = ctx.api_key_values.as_slice() else {
        return None;
    };
    if value.is_empty() {
        return None;
    }
    let digest = Sha256::digest(value.as_bytes());
    Some(hex_encode(&digest))
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
