// crates/mailgate-config/src/resolver/tests.rs
// ============================================================================
// Module: Config Resolver Unit Tests
// Description: Unit tests for port and flag parsing.
// Purpose: Ensure malformed values fail fast rather than clamp.
// ============================================================================

use super::parse_bool;
use super::parse_port;
use crate::error::ConfigError;

#[test]
fn parse_port_accepts_full_range() {
    assert_eq!(parse_port("P", "1"), Ok(1));
    assert_eq!(parse_port("P", "65535"), Ok(65535));
    assert_eq!(parse_port("P", " 587 "), Ok(587));
}

#[test]
fn parse_port_rejects_out_of_range_and_garbage() {
    for raw in ["0", "65536", "70000", "-1", "abc", "3000.5"] {
        assert!(
            matches!(parse_port("MCP_PORT", raw), Err(ConfigError::InvalidValue { ref key, .. }) if key == "MCP_PORT"),
            "{raw}"
        );
    }
}

#[test]
fn parse_bool_accepts_known_spellings() {
    for raw in ["true", "TRUE", "1", "yes", "Yes"] {
        assert_eq!(parse_bool("B", raw), Ok(true), "{raw}");
    }
    for raw in ["false", "False", "0", "no", "NO"] {
        assert_eq!(parse_bool("B", raw), Ok(false), "{raw}");
    }
}

#[test]
fn parse_bool_rejects_unknown_spellings() {
    for raw in ["on", "off", "y", "2", "truthy"] {
        assert!(matches!(parse_bool("IMAP_TLS", raw), Err(ConfigError::InvalidValue { .. })));
    }
}
