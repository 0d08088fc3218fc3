// crates/mailgate-mcp/src/auth/tests.rs
// ============================================================================
// Module: Auth Unit Tests
// Description: Unit tests for key extraction, fingerprinting, and audit events.
// Purpose: Validate header parsing edge cases without a full authenticator.
// ============================================================================

use mailgate_core::AgentId;

use super::AUTH_NOT_CONFIGURED_CODE;
use super::AuthAuditEvent;
use super::AuthAuditSink;
use super::AuthError;
use super::AuthMode;
use super::AuthOutcome;
use super::DenyReason;
use super::RequestContext;
use super::TracingAuthAuditSink;
use super::UNAUTHORIZED_CODE;
use super::hex_encode;
use super::key_fingerprint;

#[test]
fn presented_key_requires_exactly_one_value() {
    assert_eq!(RequestContext::anonymous().presented_key(), Err(DenyReason::MissingKey));
    let two = RequestContext::from_headers([("x-api-key", "a"), ("X-Api-Key", "b")]);
    assert_eq!(two.presented_key(), Err(DenyReason::MultipleKeys));
    let one = RequestContext::from_headers([("content-type", "json"), ("X-API-KEY", "key-1")]);
    assert_eq!(one.presented_key(), Ok("key-1"));
}

#[test]
fn presented_key_rejects_empty_malformed_and_oversized() {
    assert_eq!(RequestContext::with_api_key("").presented_key(), Err(DenyReason::MissingKey));
    assert_eq!(
        RequestContext::with_api_key("key with space").presented_key(),
        Err(DenyReason::MalformedKey)
    );
    assert_eq!(
        RequestContext::with_api_key("kéy").presented_key(),
        Err(DenyReason::MalformedKey)
    );
    let large = "k".repeat(8 * 1024 + 1);
    assert_eq!(RequestContext::with_api_key(large).presented_key(), Err(DenyReason::KeyTooLarge));
    let limit = "k".repeat(8 * 1024);
    assert!(RequestContext::with_api_key(limit).presented_key().is_ok());
}

#[test]
fn fingerprint_is_sha256_hex_of_single_key() {
    let fingerprint = key_fingerprint(&RequestContext::with_api_key("abc"));
    assert_eq!(
        fingerprint.as_deref(),
        Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
    );
    assert_eq!(key_fingerprint(&RequestContext::anonymous()), None);
}

#[test]
fn hex_encode_is_lowercase() {
    assert_eq!(hex_encode(&[0x00, 0xab, 0xff]), "00abff");
}

#[test]
fn error_codes_separate_rejection_from_misconfiguration() {
    assert_eq!(AuthError::Unauthorized(DenyReason::UnknownKey).code(), UNAUTHORIZED_CODE);
    assert_eq!(AuthError::OpenModeForbidden.code(), AUTH_NOT_CONFIGURED_CODE);
    assert_ne!(UNAUTHORIZED_CODE, AUTH_NOT_CONFIGURED_CODE);
}

#[test]
fn request_id_flows_into_audit_events() {
    let ctx = RequestContext::with_api_key("key-coo-123").with_request_id("req-7");
    assert_eq!(ctx.request_id(), Some("req-7"));
    let outcome = AuthOutcome::Agent(AgentId::new("coo"));
    let allowed = AuthAuditEvent::allowed(AuthMode::MultiAgent, &ctx, Some("read_email"), &outcome);
    assert_eq!(allowed.request_id.as_deref(), Some("req-7"));
    assert_eq!(allowed.agent_id.as_deref(), Some("coo"));
    let denied =
        AuthAuditEvent::denied(AuthMode::MultiAgent, &ctx, None, DenyReason::UnknownKey);
    assert_eq!(denied.request_id.as_deref(), Some("req-7"));
    assert_eq!(denied.reason, Some("unknown_key"));
    assert_eq!(RequestContext::anonymous().request_id(), None);
}

#[test]
fn tracing_sink_accepts_events_without_subscriber() {
    let ctx = RequestContext::with_api_key("key-coo-123");
    let event = AuthAuditEvent::denied(AuthMode::StaticKey, &ctx, None, DenyReason::UnknownKey);
    let payload = serde_json::to_string(&event).unwrap_or_default();
    assert!(!payload.contains("key-coo-123"));
    assert!(payload.contains("\"decision\":\"deny\""));
    TracingAuthAuditSink.record(&event);
}
