// crates/mailgate-config/src/lib.rs
// ============================================================================
// Module: Mail Gate Config Library
// Description: Agents file model and agent-scoped settings resolution.
// Purpose: Single source of truth for how a setting is resolved for a call.
// Dependencies: mailgate-core, serde, toml
// ============================================================================

//! ## Overview
//! `mailgate-config` loads the agents file (per-agent API keys and overrides
//! plus shared defaults) and resolves settings for the agent bound to the
//! current call: agent override, then shared default, then process
//! environment.
//!
//! Security posture: the agents file holds secrets and is treated as
//! untrusted input; loading fails closed on anything but a missing file.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod credentials;
pub mod env;
pub mod error;
pub mod resolver;
pub mod settings;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credentials::AGENTS_FILE_ENV_VAR;
pub use credentials::API_KEY_FIELD;
pub use credentials::CredentialLoader;
pub use credentials::CredentialRecord;
pub use credentials::CredentialStore;
pub use env::EnvSource;
pub use env::MapEnv;
pub use env::ProcessEnv;
pub use error::ConfigError;
pub use resolver::ConfigResolver;
pub use settings::AuditLogConfig;
pub use settings::ServerConfig;
