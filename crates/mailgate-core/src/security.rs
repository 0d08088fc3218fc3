// crates/mailgate-core/src/security.rs
// ============================================================================
// Module: Secret Comparison Helpers
// Description: Constant-time comparison utilities for secret material.
// Purpose: Provide reusable, side-channel resistant comparisons.
// Dependencies: subtle
// ============================================================================

//! ## Overview
//! Exposes constant-time equality helpers for API keys. A length mismatch
//! returns early: the caller-supplied length is already public from the
//! request, so only the byte content is compared in constant time.

use subtle::ConstantTimeEq;

// ============================================================================
// SECTION: Constant-Time Comparisons
// ============================================================================

/// Compares two byte slices, constant-time over content.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Compares two strings, constant-time over content.
#[must_use]
pub fn constant_time_eq_str(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
