// crates/mailgate-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared fixtures for credential and resolver tests.
// Purpose: Reduce duplication across integration tests for mailgate-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::io::Write;
use std::sync::Arc;

use mailgate_config::ConfigResolver;
use mailgate_config::CredentialStore;
use mailgate_config::MapEnv;
use tempfile::NamedTempFile;

/// Agents file with two agents and shared SMTP defaults.
pub const TWO_AGENTS_TOML: &str = r#"
[shared]
SMTP_HOST = "smtp.biz.com"
IMAP_HOST = "imap.biz.com"

[agents.coo]
apiKey = "key-coo-123"
SMTP_FROM = "coo@biz.com"
SMTP_USER = "coo-login@biz.com"
IMAP_USER = "coo@biz.com"
IMAP_PASS = "coo-imap-secret"

[agents.cfo]
apiKey = "key-cfo-456"
SMTP_HOST = "smtp.finance.biz.com"
SMTP_USER = "cfo@biz.com"
IMAP_USER = "cfo@biz.com"
IMAP_PASS = "cfo-imap-secret"
IMAP_TLS = "no"
"#;

/// Parses [`TWO_AGENTS_TOML`].
pub fn two_agents() -> Result<Arc<CredentialStore>, String> {
    CredentialStore::from_toml_str(TWO_AGENTS_TOML).map(Arc::new).map_err(|err| err.to_string())
}

/// Builds a resolver over `store` and a fixed environment.
pub fn resolver(store: Arc<CredentialStore>, env: MapEnv) -> ConfigResolver {
    ConfigResolver::new(store, Arc::new(env))
}

/// Writes `content` to a temporary file with the given suffix.
pub fn temp_agents_file(content: &[u8], suffix: &str) -> Result<NamedTempFile, String> {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .map_err(|err| err.to_string())?;
    file.write_all(content).map_err(|err| err.to_string())?;
    file.flush().map_err(|err| err.to_string())?;
    Ok(file)
}
