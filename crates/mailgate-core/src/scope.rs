// crates/mailgate-core/src/scope.rs
// ============================================================================
// Module: Agent Call Scope
// Description: Task-scoped agent identity for in-flight requests.
// Purpose: Carry the authenticated agent through one call without threading it.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! Each authenticated call runs inside a scope that binds the caller's
//! [`AgentId`]. Code transitively invoked from that call reads the identity
//! with [`current_agent_id`]; code outside any scope sees `None`.
//!
//! The binding lives in a tokio task-local slot owned by the scoped future.
//! It is restored every time the future is polled, so it survives `.await`
//! suspension points, and two scopes polled concurrently on the same thread
//! never observe each other's value.
//!
//! ## Invariants
//! - A scope's identity is immutable for the scope's lifetime.
//! - Futures handed to `tokio::spawn` do not inherit the identity; wrap them in
//!   their own scope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;

use crate::identifiers::AgentId;

// ============================================================================
// SECTION: Task-Local Slot
// ============================================================================

tokio::task_local! {
    /// Identity bound to the current call (`None` for anonymous calls).
    static CURRENT_AGENT: Option<AgentId>;
}

// ============================================================================
// SECTION: Scope Entry Points
// ============================================================================

/// Runs `body` with `agent_id` bound for its whole dynamic extent.
pub async fn run_with_agent<F>(agent_id: AgentId, body: F) -> F::Output
where
    F: Future,
{
    CURRENT_AGENT.scope(Some(agent_id), body).await
}

/// Runs `body` with the given identity, or explicitly anonymous when `None`.
///
/// An anonymous scope masks any identity bound by an enclosing scope.
pub async fn run_scoped<F>(agent_id: Option<AgentId>, body: F) -> F::Output
where
    F: Future,
{
    CURRENT_AGENT.scope(agent_id, body).await
}

/// Runs a synchronous closure with `agent_id` bound.
pub fn sync_with_agent<F, R>(agent_id: AgentId, body: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT_AGENT.sync_scope(Some(agent_id), body)
}

/// Returns the identity bound to the current call, if any.
#[must_use]
pub fn current_agent_id() -> Option<AgentId> {
    CURRENT_AGENT.try_with(Clone::clone).ok().flatten()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
