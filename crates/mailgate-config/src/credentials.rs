// crates/mailgate-config/src/credentials.rs
// ============================================================================
// Module: Agent Credential Store
// Description: Agents file loading, API key lookup, and override lookup.
// Purpose: Map API keys to agents and expose per-agent setting overrides.
// Dependencies: mailgate-core, serde, serde_json, toml
// ============================================================================

//! ## Overview
//! The agents file maps agent identifiers to an API key plus arbitrary string
//! overrides, alongside a `shared` block of defaults:
//!
//! ```toml
//! [shared]
//! SMTP_HOST = "smtp.biz.com"
//!
//! [agents.coo]
//! apiKey = "key-coo-123"
//! SMTP_FROM = "coo@biz.com"
//! ```
//!
//! A missing file means "no agents configured" (single-tenant mode). Any other
//! read or parse failure is fatal. The store is immutable once loaded and is
//! shared as a read-only [`Arc`] handle.
//!
//! ## Invariants
//! - The `apiKey` field is never reachable through [`CredentialStore::agent_override`].
//! - API keys are unique across agents; collisions are rejected at load time.
//! - Key lookup compares every record in constant time over content.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::OnceLock;

use mailgate_core::AgentId;
use mailgate_core::constant_time_eq;
use serde::Deserialize;

use crate::error::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Field holding an agent's API key.
pub const API_KEY_FIELD: &str = "apiKey";
/// Environment variable used to override the agents file path.
pub const AGENTS_FILE_ENV_VAR: &str = "MAILGATE_AGENTS_FILE";
/// Default agents filename when no path is specified.
const DEFAULT_AGENTS_FILE_NAME: &str = "agents.toml";
/// Maximum agents file size in bytes.
pub(crate) const MAX_AGENTS_FILE_SIZE: usize = 1024 * 1024;
/// Maximum number of agents in one file.
pub(crate) const MAX_AGENTS: usize = 1024;
/// Maximum agent identifier length.
pub(crate) const MAX_AGENT_ID_LENGTH: usize = 128;
/// Maximum API key length.
pub(crate) const MAX_API_KEY_LENGTH: usize = 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: File Model
// ============================================================================

/// On-disk agents file shape.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgentsFile {
    /// Agent entries: `apiKey` plus string overrides.
    #[serde(default)]
    agents: BTreeMap<String, BTreeMap<String, String>>,
    /// Defaults for agents lacking their own override.
    #[serde(default)]
    shared: BTreeMap<String, String>,
}

// ============================================================================
// SECTION: Credential Records
// ============================================================================

/// One agent's API key and overrides.
#[derive(Clone)]
pub struct CredentialRecord {
    /// Agent identifier.
    agent_id: AgentId,
    /// Secret API key (never exposed).
    api_key: String,
    /// Setting overrides, excluding the API key.
    overrides: BTreeMap<String, String>,
}

impl CredentialRecord {
    /// Builds a record from an identifier, key, and overrides.
    ///
    /// Any `apiKey` entry in `overrides` is discarded.
    #[must_use]
    pub fn new(
        agent_id: AgentId,
        api_key: impl Into<String>,
        mut overrides: BTreeMap<String, String>,
    ) -> Self {
        overrides.remove(API_KEY_FIELD);
        Self {
            agent_id,
            api_key: api_key.into(),
            overrides,
        }
    }

    /// Returns the agent identifier.
    #[must_use]
    pub const fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Returns the agent's own overrides.
    #[must_use]
    pub const fn overrides(&self) -> &BTreeMap<String, String> {
        &self.overrides
    }

    /// Compares `candidate` against this record's key, constant-time over content.
    #[must_use]
    pub fn matches_key(&self, candidate: &[u8]) -> bool {
        constant_time_eq(self.api_key.as_bytes(), candidate)
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("agent_id", &self.agent_id)
            .field("api_key", &"<redacted>")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// SECTION: Credential Store
// ============================================================================

/// Loaded agents and shared defaults. Immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    /// Records keyed by agent identifier.
    agents: BTreeMap<AgentId, CredentialRecord>,
    /// Shared defaults.
    shared: BTreeMap<String, String>,
}

impl CredentialStore {
    /// Returns a store with no agents and no shared defaults.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a store from records and shared defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when identifiers or keys violate limits
    /// or two agents share an API key.
    pub fn from_parts(
        records: Vec<CredentialRecord>,
        shared: BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        if records.len() > MAX_AGENTS {
            return Err(ConfigError::Invalid(format!(
                "agents file defines more than {MAX_AGENTS} agents"
            )));
        }
        if shared.contains_key(API_KEY_FIELD) {
            return Err(ConfigError::Invalid(format!(
                "shared defaults must not define {API_KEY_FIELD}"
            )));
        }
        let mut agents = BTreeMap::new();
        let mut owners: BTreeMap<String, AgentId> = BTreeMap::new();
        for record in records {
            validate_agent_id(record.agent_id.as_str())?;
            validate_api_key(&record.agent_id, &record.api_key)?;
            if agents.contains_key(&record.agent_id) {
                return Err(ConfigError::Invalid(format!(
                    "agent {} is defined more than once",
                    record.agent_id
                )));
            }
            if let Some(owner) = owners.insert(record.api_key.clone(), record.agent_id.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "agents {owner} and {} share the same {API_KEY_FIELD}",
                    record.agent_id
                )));
            }
            agents.insert(record.agent_id.clone(), record);
        }
        Ok(Self {
            agents,
            shared,
        })
    }

    /// Loads the agents file using the default resolution rules.
    ///
    /// Resolution order: `path`, then `MAILGATE_AGENTS_FILE`, then
    /// `agents.toml` in the working directory. A missing file yields
    /// [`CredentialStore::empty`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for any failure other than a missing file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::empty()),
            Err(err) => return Err(ConfigError::Io(err.to_string())),
        };
        if bytes.len() > MAX_AGENTS_FILE_SIZE {
            return Err(ConfigError::Invalid("agents file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("agents file must be utf-8".to_string()))?;
        let is_json =
            resolved.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
        if is_json { Self::from_json_str(content) } else { Self::from_toml_str(content) }
    }

    /// Parses an agents file in TOML form.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: AgentsFile =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        Self::from_file(file)
    }

    /// Parses an agents file in JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let file: AgentsFile =
            serde_json::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        Self::from_file(file)
    }

    /// Converts the parsed file into validated records.
    fn from_file(file: AgentsFile) -> Result<Self, ConfigError> {
        let mut records = Vec::with_capacity(file.agents.len());
        for (agent_id, mut entry) in file.agents {
            let api_key = entry.remove(API_KEY_FIELD).ok_or_else(|| {
                ConfigError::Invalid(format!("agent {agent_id} is missing {API_KEY_FIELD}"))
            })?;
            records.push(CredentialRecord::new(AgentId::new(agent_id), api_key, entry));
        }
        Self::from_parts(records, file.shared)
    }

    /// Returns true when at least one agent is configured.
    #[must_use]
    pub fn has_agents(&self) -> bool {
        !self.agents.is_empty()
    }

    /// Returns the configured agent identifiers in sorted order.
    #[must_use]
    pub fn agent_ids(&self) -> Vec<&AgentId> {
        self.agents.keys().collect()
    }

    /// Returns the agent whose API key equals `candidate`.
    ///
    /// Every record is compared, constant-time over content, so the work done
    /// does not depend on which record (if any) matches.
    #[must_use]
    pub fn resolve_by_api_key(&self, candidate: &[u8]) -> Option<AgentId> {
        let mut matched: Option<&AgentId> = None;
        for record in self.agents.values() {
            if record.matches_key(candidate) && matched.is_none() {
                matched = Some(&record.agent_id);
            }
        }
        matched.cloned()
    }

    /// Returns the override for `key`: the agent's own value, else the shared
    /// default. Empty values count as absent. `apiKey` is never returned.
    #[must_use]
    pub fn agent_override(&self, agent_id: &AgentId, key: &str) -> Option<&str> {
        if key == API_KEY_FIELD {
            return None;
        }
        self.agents
            .get(agent_id)
            .and_then(|record| record.overrides.get(key))
            .filter(|value| !value.is_empty())
            .or_else(|| self.shared.get(key).filter(|value| !value.is_empty()))
            .map(String::as_str)
    }
}

// ============================================================================
// SECTION: Memoized Loader
// ============================================================================

/// Loads the agents file once and hands out read-only handles.
///
/// A failed load is returned to the caller and not memoized.
#[derive(Debug, Default)]
pub struct CredentialLoader {
    /// Explicit agents file path, if any.
    path: Option<PathBuf>,
    /// Loaded store.
    cell: OnceLock<Arc<CredentialStore>>,
}

impl CredentialLoader {
    /// Creates a loader for `path` (or the default resolution rules when `None`).
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            cell: OnceLock::new(),
        }
    }

    /// Creates a loader that already holds `store`.
    #[must_use]
    pub fn preloaded(store: CredentialStore) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Arc::new(store));
        Self {
            path: None,
            cell,
        }
    }

    /// Returns the store, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the first load fails.
    pub fn get(&self) -> Result<Arc<CredentialStore>, ConfigError> {
        if let Some(store) = self.cell.get() {
            return Ok(Arc::clone(store));
        }
        let loaded = Arc::new(CredentialStore::load(self.path.as_deref())?);
        Ok(Arc::clone(self.cell.get_or_init(|| loaded)))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the agents file path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(AGENTS_FILE_ENV_VAR)
        && !env_path.is_empty()
    {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("agents file path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_AGENTS_FILE_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("agents file path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("agents file path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates an agent identifier.
fn validate_agent_id(agent_id: &str) -> Result<(), ConfigError> {
    if agent_id.is_empty() {
        return Err(ConfigError::Invalid("agent id must be non-empty".to_string()));
    }
    if agent_id.len() > MAX_AGENT_ID_LENGTH {
        return Err(ConfigError::Invalid(format!("agent id {agent_id} exceeds max length")));
    }
    if agent_id.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return Err(ConfigError::Invalid(format!(
            "agent id {agent_id} contains whitespace or control characters"
        )));
    }
    Ok(())
}

/// Validates an API key. Keys must be presentable as a single header value.
fn validate_api_key(agent_id: &AgentId, api_key: &str) -> Result<(), ConfigError> {
    if api_key.is_empty() {
        return Err(ConfigError::Invalid(format!("agent {agent_id} has an empty {API_KEY_FIELD}")));
    }
    if api_key.len() > MAX_API_KEY_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "agent {agent_id} {API_KEY_FIELD} exceeds max length"
        )));
    }
    if !api_key.bytes().all(|byte| byte.is_ascii_graphic()) {
        return Err(ConfigError::Invalid(format!(
            "agent {agent_id} {API_KEY_FIELD} must be visible ascii"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
