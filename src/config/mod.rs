//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/testweave/config.toml)
//! 3. Project config (.testweave/config.toml)
//! 4. Environment variables (TESTWEAVE_*)
//!
//! Consumers read configuration through [`ConfigSource`], which always
//! returns a validated snapshot.

mod loader;
mod types;

use std::sync::{Arc, RwLock};

pub use loader::ConfigLoader;
pub use types::*;

use crate::types::Result;

/// Read access to the current configuration
pub trait ConfigSource: Send + Sync {
    /// Current configuration; callers never observe a half-applied update
    fn snapshot(&self) -> Config;
}

pub type SharedConfig = Arc<dyn ConfigSource>;

/// Configuration held in memory and replaced atomically
#[derive(Debug)]
pub struct InMemoryConfigSource {
    current: RwLock<Config>,
}

impl InMemoryConfigSource {
    pub fn new(config: Config) -> Self {
        Self {
            current: RwLock::new(config),
        }
    }

    /// Resolve from files and environment
    pub fn load() -> Result<Self> {
        Ok(Self::new(ConfigLoader::load()?))
    }

    /// Validate, then swap in `config`. On error the old value is kept.
    pub fn update(&self, config: Config) -> Result<()> {
        config.validate()?;
        let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
        *guard = config;
        Ok(())
    }

    /// Apply a change to a copy of the current config, then `update`
    pub fn modify(&self, f: impl FnOnce(&mut Config)) -> Result<()> {
        let mut next = self.snapshot();
        f(&mut next);
        self.update(next)
    }
}

impl Default for InMemoryConfigSource {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl ConfigSource for InMemoryConfigSource {
    fn snapshot(&self) -> Config {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_replaces_snapshot() {
        let source = InMemoryConfigSource::default();
        source
            .modify(|c| c.ai.provider = "claude".to_string())
            .unwrap();
        assert_eq!(source.snapshot().ai.provider, "claude");
    }

    #[test]
    fn test_invalid_update_keeps_previous() {
        let source = InMemoryConfigSource::default();
        let result = source.modify(|c| c.ai.max_tokens = 0);
        assert!(result.is_err());
        assert_eq!(source.snapshot().ai.max_tokens, 2048);
    }
}
