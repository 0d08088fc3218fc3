// crates/mailgate-core/src/scope/tests.rs
// ============================================================================
// Module: Agent Call Scope Tests
// Description: Unit tests for task-scoped agent identity.
// Purpose: Validate isolation across suspension points and concurrent scopes.
// Dependencies: mailgate-core, tokio
// ============================================================================

//! ## Overview
//! Exercises scope entry, masking, and interleaved concurrent scopes that
//! hand control back and forth through channels.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use tokio::sync::oneshot;

use super::current_agent_id;
use super::run_scoped;
use super::run_with_agent;
use super::sync_with_agent;
use crate::identifiers::AgentId;

// ============================================================================
// SECTION: Basic Scoping
// ============================================================================

#[test]
fn no_identity_outside_scope() {
    assert_eq!(current_agent_id(), None);
}

#[tokio::test]
async fn identity_visible_inside_scope() {
    let seen = run_with_agent(AgentId::new("coo"), async { current_agent_id() }).await;
    assert_eq!(seen, Some(AgentId::new("coo")));
    assert_eq!(current_agent_id(), None);
}

#[tokio::test]
async fn identity_survives_suspension() {
    let seen = run_with_agent(AgentId::new("cfo"), async {
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        current_agent_id()
    })
    .await;
    assert_eq!(seen, Some(AgentId::new("cfo")));
}

#[tokio::test]
async fn anonymous_scope_masks_outer_identity() {
    let seen = run_with_agent(AgentId::new("outer"), async {
        run_scoped(None, async { current_agent_id() }).await
    })
    .await;
    assert_eq!(seen, None);
}

#[tokio::test]
async fn nested_scope_restores_outer_identity() {
    let (inner, outer) = run_with_agent(AgentId::new("outer"), async {
        let inner = run_with_agent(AgentId::new("inner"), async { current_agent_id() }).await;
        (inner, current_agent_id())
    })
    .await;
    assert_eq!(inner, Some(AgentId::new("inner")));
    assert_eq!(outer, Some(AgentId::new("outer")));
}

#[test]
fn sync_scope_binds_identity() {
    let seen = sync_with_agent(AgentId::new("sync"), current_agent_id);
    assert_eq!(seen, Some(AgentId::new("sync")));
    assert_eq!(current_agent_id(), None);
}

// ============================================================================
// SECTION: Concurrent Scopes
// ============================================================================

#[tokio::test(flavor = "current_thread")]
async fn interleaved_scopes_never_observe_each_other() {
    let (to_b, from_a) = oneshot::channel::<()>();
    let (to_a, from_b) = oneshot::channel::<()>();

    let task_a = run_with_agent(AgentId::new("a"), async move {
        let before = current_agent_id();
        to_b.send(()).unwrap();
        from_b.await.unwrap();
        let after = current_agent_id();
        (before, after)
    });
    let task_b = run_with_agent(AgentId::new("b"), async move {
        from_a.await.unwrap();
        let during = current_agent_id();
        to_a.send(()).unwrap();
        tokio::task::yield_now().await;
        (during, current_agent_id())
    });

    let ((a_before, a_after), (b_during, b_after)) = tokio::join!(task_a, task_b);
    assert_eq!(a_before, Some(AgentId::new("a")));
    assert_eq!(a_after, Some(AgentId::new("a")));
    assert_eq!(b_during, Some(AgentId::new("b")));
    assert_eq!(b_after, Some(AgentId::new("b")));
    assert_eq!(current_agent_id(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_spawned_scopes_stay_isolated() {
    let mut handles = Vec::new();
    for index in 0 .. 64 {
        let agent = AgentId::new(format!("agent-{index}"));
        handles.push(tokio::spawn(run_with_agent(agent.clone(), async move {
            for _ in 0 .. 8 {
                tokio::task::yield_now().await;
                assert_eq!(current_agent_id(), Some(agent.clone()));
            }
            true
        })));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }
}
