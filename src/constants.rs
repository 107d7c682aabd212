//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// AI request defaults
pub mod ai {
    /// Default token budget per generation
    pub const DEFAULT_MAX_TOKENS: u32 = 2048;

    /// Default sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Token ceiling for configuration round-trips
    pub const VALIDATION_MAX_TOKENS: u32 = 10;

    /// Prompt used for configuration round-trips
    pub const VALIDATION_PROMPT: &str = "Test connection";
}

/// Recovery engine constants
pub mod retry {
    /// Maximum recovery attempts per handled error
    pub const MAX_RETRIES: u32 = 3;

    /// First backoff delay (milliseconds)
    pub const INITIAL_BACKOFF_MS: u64 = 1000;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: u32 = 2;
}

/// TTL cache constants
pub mod cache {
    /// Default entry lifetime (seconds)
    pub const DEFAULT_TTL_SECS: u64 = 5 * 60;

    /// Interval between background sweeps (seconds)
    pub const SWEEP_INTERVAL_SECS: u64 = 60;
}

/// Monitor constants
pub mod monitor {
    /// Ring buffer capacity for performance samples
    pub const MAX_SAMPLES: usize = 1000;

    /// Interval between health probes (seconds)
    pub const HEALTH_INTERVAL_SECS: u64 = 5 * 60;

    /// Upper bound on a single health probe (seconds)
    pub const PROBE_TIMEOUT_SECS: u64 = 30;

    /// Services probed by default
    pub const DEFAULT_SERVICES: &[&str] = &["AIService", "TestRunner", "FileWatcher"];
}

/// Response parser constants
pub mod parser {
    /// Coverage points per detected test construct
    pub const COVERAGE_WEIGHT: u32 = 5;

    /// Coverage ceiling
    pub const MAX_COVERAGE: u32 = 100;
}
