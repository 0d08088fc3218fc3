// crates/mailgate-config/src/error.rs
// ============================================================================
// Module: Config Errors
// Description: Error taxonomy for agents file loading and settings resolution.
// Purpose: Give callers typed, diagnosable configuration failures.
// Dependencies: mailgate-core, thiserror
// ============================================================================

//! ## Overview
//! `Io`, `Parse`, and `Invalid` come from loading the agents file and are
//! fatal. `Missing` and `InvalidValue` come from resolving one setting for
//! one call and are surfaced to that call's caller.

use mailgate_core::AgentId;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and resolution errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading the agents file.
    #[error("config io error: {0}")]
    Io(String),
    /// Agents file could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Agents file parsed but violates a constraint.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// A required setting resolved to nothing.
    #[error("missing required setting {key}{}", agent_suffix(.agent.as_ref()))]
    Missing {
        /// Setting name.
        key: String,
        /// Agent bound when resolution failed.
        agent: Option<AgentId>,
    },
    /// A setting resolved to a value that does not parse.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Setting name.
        key: String,
        /// Parse failure description (never the raw secret).
        message: String,
    },
}

/// Formats the agent part of a missing-setting message.
fn agent_suffix(agent: Option<&AgentId>) -> String {
    agent.map_or_else(String::new, |agent| format!(" for agent {agent}"))
}
