//! CLI Common Utilities
//!
//! Shared wiring for command handlers: configuration, the orchestrator and
//! the monitor are assembled once here.

use std::path::Path;
use std::sync::Arc;

use crate::ai::{Orchestrator, OrchestratorProbe, ResultCache};
use crate::cache::TtlCache;
use crate::config::{ConfigSource, InMemoryConfigSource};
use crate::logging::tracing_sink;
use crate::monitor::Monitor;
use crate::types::{ProviderKind, Result, TestWeaveError};

/// Service name the orchestrator is monitored under
pub const AI_SERVICE: &str = "AIService";

/// Command execution context
pub struct CommandContext {
    pub config: Arc<InMemoryConfigSource>,
    pub orchestrator: Arc<Orchestrator>,
    pub monitor: Arc<Monitor>,
}

impl CommandContext {
    /// Load config from files and environment, optionally forcing a provider
    ///
    /// Must be called inside a tokio runtime when caching is enabled.
    pub fn load(provider: Option<ProviderKind>) -> Result<Self> {
        let config = Arc::new(InMemoryConfigSource::load()?);
        if let Some(kind) = provider {
            config.modify(|c| c.ai.provider = kind.as_str().to_string())?;
        }
        Ok(Self::from_source(config))
    }

    pub fn from_source(config: Arc<InMemoryConfigSource>) -> Self {
        let snapshot = config.snapshot();

        let mut builder = Orchestrator::builder(config.clone());
        if snapshot.cache.enabled {
            let cache: ResultCache = TtlCache::spawn(snapshot.cache.cache_config());
            builder = builder.cache(Arc::new(cache));
        }
        let orchestrator = Arc::new(builder.build());

        let monitor = Arc::new(
            Monitor::with_capacity(tracing_sink(), snapshot.monitor.max_samples),
        );
        monitor.register_probe(
            AI_SERVICE,
            Arc::new(OrchestratorProbe::new(orchestrator.clone())),
        );
        monitor.register_default_probes();

        Self {
            config,
            orchestrator,
            monitor,
        }
    }
}

/// Parse a `--provider` value
pub fn parse_provider(value: &str) -> std::result::Result<ProviderKind, String> {
    value.parse::<ProviderKind>().map_err(|e| e.to_string())
}

/// Read a UTF-8 input file with the path in the error message
pub fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        TestWeaveError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}
