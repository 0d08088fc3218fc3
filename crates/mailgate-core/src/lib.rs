// crates/mailgate-core/src/lib.rs
// ============================================================================
// Module: Mail Gate Core Library
// Description: Public API surface for the Mail Gate core.
// Purpose: Expose identifiers, call scoping, and the mail transport interface.
// Dependencies: crate::{identifiers, scope, security, mail, memory}
// ============================================================================

//! ## Overview
//! Mail Gate core holds the pieces every other crate agrees on: the agent
//! identifier, the call-scoped identity used to resolve per-agent settings,
//! constant-time secret comparison, and the mail transport interface that the
//! SMTP/IMAP implementation plugs into.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod mail;
pub mod memory;
pub mod scope;
pub mod security;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::AgentId;
pub use mail::Attachment;
pub use mail::AttachmentContent;
pub use mail::EmailConfig;
pub use mail::ImapConfig;
pub use mail::MailError;
pub use mail::MailTransport;
pub use mail::Mailbox;
pub use mail::MessageDetail;
pub use mail::MessageSummary;
pub use mail::OutgoingMessage;
pub use mail::SearchCriteria;
pub use mail::SentMessage;
pub use memory::InMemoryMailTransport;
pub use scope::current_agent_id;
pub use scope::run_scoped;
pub use scope::run_with_agent;
pub use scope::sync_with_agent;
pub use security::constant_time_eq;
pub use security::constant_time_eq_str;
