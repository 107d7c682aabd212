//! TestWeave - Resilient AI Test Generation
//!
//! Orchestrates unit-test generation across interchangeable AI providers
//! (OpenAI, Azure OpenAI, Google Vertex AI, Anthropic Claude) with retry
//! and backoff, result caching, and health monitoring.
//!
//! ## Quick Start
//!
//! ```ignore
//! use testweave::{GenerationRequest, InMemoryConfigSource, Orchestrator};
//!
//! let config = Arc::new(InMemoryConfigSource::load()?);
//! let orchestrator = Orchestrator::builder(config).build();
//! let result = orchestrator
//!     .generate_tests(GenerationRequest::new("Cover edge cases", source))
//!     .await?;
//! println!("{}", result.test_code);
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: provider adapters, response parsing, recovery, orchestration
//! - [`config`]: layered configuration (defaults, files, environment)
//! - [`cache`]: TTL cache for generation results
//! - [`credentials`]: API key lookup
//! - [`monitor`]: performance samples and service health

pub mod ai;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod logging;
pub mod monitor;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, ConfigSource, InMemoryConfigSource, SharedConfig};

// Error Types
pub use types::error::{ErrorKind, ErrorRecord, Result, TestWeaveError};

// Generation
pub use types::{
    GenerationDefaults, GenerationParams, GenerationRequest, GenerationResult, ProviderConfig,
    ProviderKind,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    Orchestrator, OrchestratorBuilder, OrchestratorProbe, ProviderRegistry, RecoveryEngine,
    ResponseParser, RetryPolicy, SharedProvider, TestGenerator, with_timeout,
};

// =============================================================================
// Infrastructure Re-exports
// =============================================================================

pub use cache::{CacheConfig, TtlCache};
pub use credentials::{CredentialStore, EnvCredentialStore, MemoryCredentialStore};
pub use logging::{LogSink, MemorySink, SharedSink, tracing_sink};
pub use monitor::{HealthProbe, HealthRecord, HealthStatus, Monitor, MonitorHandle, ProbeReport};
