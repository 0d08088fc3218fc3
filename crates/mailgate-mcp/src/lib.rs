// crates/mailgate-mcp/src/lib.rs
// ============================================================================
// Module: Mail Gate MCP Library
// Description: Authenticated, audited email tools for MCP callers.
// Purpose: Bind each call to its agent, gate inbound content, route tools.
// Dependencies: mailgate-core, mailgate-config, reqwest, regex, tracing
// ============================================================================

//! ## Overview
//! `mailgate-mcp` is the request-side layer of Mail Gate. Each tool call is
//! authenticated from its `x-api-key` header, executed inside the matching
//! agent scope so every setting lookup sees that agent's configuration, and
//! any inbound message content is delivered to the audit log before it is
//! returned wrapped in untrusted-content boundary markers.
//!
//! Security posture: message content is untrusted input and API keys are
//! secrets. Authentication fails closed and never says why to the caller.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod gate;
pub mod sanitize;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditLogSink;
pub use audit::AuditRecord;
pub use audit::AuditSinkError;
pub use audit::HttpAuditLogSink;
pub use auth::AuthError;
pub use auth::AuthMode;
pub use auth::Authenticator;
pub use auth::RequestContext;
pub use gate::GateError;
pub use gate::GateReadResult;
pub use gate::GateReader;
pub use gate::MessageRef;
pub use sanitize::BoundarySanitizer;
pub use tools::ToolError;
pub use tools::ToolName;
pub use tools::ToolRouter;
