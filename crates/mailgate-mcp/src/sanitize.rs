// crates/mailgate-mcp/src/sanitize.rs
// ============================================================================
// Module: Boundary Sanitizer
// Description: Neutralizes forged boundary markers and wraps untrusted text.
// Purpose: Guarantee one trusted boundary pair around returned email content.
// Dependencies: regex
// ============================================================================

//! ## Overview
//! Email content returned to callers is wrapped in a single
//! `<untrusted-email-content>` pair. Before wrapping, anything in the content
//! that resembles a boundary marker (angle, bracket, or brace form, opening
//! or closing, any case, with or without its terminator) is replaced with
//! `[boundary-marker-removed]` so content cannot close the wrapper early or
//! open a nested one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Opening boundary marker.
pub const BOUNDARY_OPEN: &str = "<untrusted-email-content>";
/// Closing boundary marker.
pub const BOUNDARY_CLOSE: &str = "</untrusted-email-content>";
/// Replacement for forged markers.
pub const MARKER_REPLACEMENT: &str = "[boundary-marker-removed]";
/// Marker-like substrings in angle, bracket, and brace forms. The terminator
/// is optional and only `name=value` attributes (bounded) are consumed.
const MARKER_PATTERN: &str = concat!(
    r"(?i)",
    r#"<\s*/?\s*untrusted[\w-]*(?:\s+[\w-]+\s*=\s*(?:"[^"]{0,64}"|'[^']{0,64}'|[\w-]{1,64})){0,4}(?:\s*/?\s*>)?"#,
    r#"|\[\s*/?\s*untrusted[\w-]*(?:\s+[\w-]+\s*=\s*(?:"[^"]{0,64}"|'[^']{0,64}'|[\w-]{1,64})){0,4}(?:\s*\])?"#,
    r#"|\{\s*/?\s*untrusted[\w-]*(?:\s+[\w-]+\s*=\s*(?:"[^"]{0,64}"|'[^']{0,64}'|[\w-]{1,64})){0,4}(?:\s*\})?"#,
);

// ============================================================================
// SECTION: Sanitizer
// ============================================================================

/// Compiled marker matcher.
#[derive(Debug, Clone)]
pub struct BoundarySanitizer {
    /// Marker pattern.
    pattern: Regex,
}

impl BoundarySanitizer {
    /// Compiles the marker pattern.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if the pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(MARKER_PATTERN)?,
        })
    }

    /// Replaces every marker-like substring with [`MARKER_REPLACEMENT`].
    #[must_use]
    pub fn neutralize(&self, content: &str) -> String {
        self.pattern.replace_all(content, MARKER_REPLACEMENT).into_owned()
    }

    /// Neutralizes `content` and wraps it in exactly one boundary pair.
    #[must_use]
    pub fn wrap(&self, content: &str) -> String {
        format!("{BOUNDARY_OPEN}\n{}\n{BOUNDARY_CLOSE}", self.neutralize(content))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
