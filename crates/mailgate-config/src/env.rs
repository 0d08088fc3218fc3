// crates/mailgate-config/src/env.rs
// ============================================================================
// Module: Environment Sources
// Description: Process-wide setting sources consulted after agent overrides.
// Purpose: Make the environment tier injectable for embedding and tests.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The last resolution tier is the process environment. [`EnvSource`] hides
//! where that tier comes from so resolution can be tested without mutating
//! process state. Empty values are reported as absent by every source.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Process-wide setting source.
pub trait EnvSource: Send + Sync {
    /// Returns the non-empty value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
}

// ============================================================================
// SECTION: Sources
// ============================================================================

/// Reads settings from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|value| !value.is_empty())
    }
}

/// Fixed in-memory settings.
#[derive(Debug, Default, Clone)]
pub struct MapEnv {
    /// Setting values by name.
    values: BTreeMap<String, String>,
}

impl MapEnv {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for MapEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect(),
        }
    }
}

impl EnvSource for MapEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).filter(|value| !value.is_empty()).cloned()
    }
}
