//! Unified Error Type System
//!
//! Centralized error types for the entire crate, plus the classifier that
//! routes every failure into one of four recovery kinds.
//!
//! ## Error Kinds
//!
//! - **Network**: Connectivity issues (retry with backoff)
//! - **RemoteService**: The AI backend misbehaved (retry with backoff)
//! - **LocalFramework**: The local test runner failed (fatal)
//! - **PlatformApi**: Everything else, including configuration (fatal)
//!
//! Classification is total: anything unrecognized lands in `PlatformApi`.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Error Kinds
// =============================================================================

/// Recovery kinds used to route a failure through the recovery engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Connectivity issues - retry with backoff
    Network,
    /// The AI backend failed or refused - retry with backoff
    RemoteService,
    /// The local test framework failed - fatal
    LocalFramework,
    /// Host/platform errors, configuration included - fatal
    PlatformApi,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "NETWORK"),
            Self::RemoteService => write!(f, "REMOTE_SERVICE"),
            Self::LocalFramework => write!(f, "LOCAL_FRAMEWORK"),
            Self::PlatformApi => write!(f, "PLATFORM_API"),
        }
    }
}

impl ErrorKind {
    /// Only network and remote-service failures are worth retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network | Self::RemoteService)
    }
}

// =============================================================================
// Error Record
// =============================================================================

/// Immutable description of one handled failure
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    /// Rendered `source()` chain, one cause per line
    pub stack: Option<String>,
    /// Free-text label of the operation that failed
    pub context: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: None,
            context: context.into(),
            timestamp: Utc::now(),
        }
    }

    /// Classify and capture an error
    pub fn from_error(err: &TestWeaveError, context: impl Into<String>) -> Self {
        // A fatal error already carries its original record
        if let TestWeaveError::Fatal { record, .. } = err {
            return Self {
                timestamp: Utc::now(),
                context: context.into(),
                ..(**record).clone()
            };
        }

        Self {
            kind: ErrorClassifier::classify(err),
            message: err.to_string(),
            stack: render_source_chain(err),
            context: context.into(),
            timestamp: Utc::now(),
        }
    }

    /// Log lines in fixed order: timestamp, kind, context, message, stack
    pub fn log_lines(&self) -> Vec<String> {
        vec![
            format!("[ERROR] {}", self.timestamp.to_rfc3339()),
            format!("Type: {}", self.kind),
            format!("Context: {}", self.context),
            format!("Message: {}", self.message),
            format!("Stack: {}", self.stack.as_deref().unwrap_or("<none>")),
            "---".to_string(),
        ]
    }
}

fn render_source_chain(err: &dyn std::error::Error) -> Option<String> {
    let mut rendered = String::new();
    let mut current = err.source();
    while let Some(cause) = current {
        if !rendered.is_empty() {
            rendered.push('\n');
        }
        let _ = write!(rendered, "caused by: {}", cause);
        current = cause.source();
    }
    if rendered.is_empty() {
        None
    } else {
        Some(rendered)
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

const NETWORK_PATTERNS: &[&str] = &[
    "network",
    "connection",
    "dns",
    "timeout",
    "timed out",
    "unreachable",
    "socket",
];

/// Vendor names are matched case-sensitively so "AI" does not hit "failed"
const REMOTE_SERVICE_EXACT: &[&str] = &["AI", "OpenAI", "Azure", "Vertex", "Gemini", "Anthropic", "Claude"];

const REMOTE_SERVICE_PATTERNS: &[&str] = &[
    "rate limit",
    "429",
    "overloaded",
    "service unavailable",
    "model",
];

const LOCAL_FRAMEWORK_PATTERNS: &[&str] =
    &["test runner", "test framework", "jest", "mocha", "assertion"];

/// Error classifier for recovery routing
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a bare message. Total: defaults to `PlatformApi`.
    pub fn classify_message(message: &str) -> ErrorKind {
        let lower = message.to_lowercase();

        if NETWORK_PATTERNS.iter().any(|p| lower.contains(p)) {
            return ErrorKind::Network;
        }

        if REMOTE_SERVICE_EXACT.iter().any(|p| message.contains(p))
            || REMOTE_SERVICE_PATTERNS.iter().any(|p| lower.contains(p))
        {
            return ErrorKind::RemoteService;
        }

        if LOCAL_FRAMEWORK_PATTERNS.iter().any(|p| lower.contains(p)) {
            return ErrorKind::LocalFramework;
        }

        ErrorKind::PlatformApi
    }

    /// Classify a typed error, using the variant before falling back to text
    pub fn classify(err: &TestWeaveError) -> ErrorKind {
        match err {
            TestWeaveError::Http(e) if e.is_timeout() || e.is_connect() => ErrorKind::Network,
            TestWeaveError::Http(_) => ErrorKind::RemoteService,
            TestWeaveError::Timeout { .. } => ErrorKind::Network,
            TestWeaveError::Vendor { message, .. } | TestWeaveError::Generation { message, .. } => {
                match Self::classify_message(message) {
                    ErrorKind::Network => ErrorKind::Network,
                    _ => ErrorKind::RemoteService,
                }
            }
            TestWeaveError::TestRunner(_) => ErrorKind::LocalFramework,
            TestWeaveError::Config(_)
            | TestWeaveError::UnsupportedProvider(_)
            | TestWeaveError::MissingCredential(_)
            | TestWeaveError::InvalidProviderConfig(_) => ErrorKind::PlatformApi,
            TestWeaveError::Fatal { record, .. } => record.kind,
            TestWeaveError::Io(_) | TestWeaveError::Json(_) => {
                Self::classify_message(&err.to_string())
            }
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum TestWeaveError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors (always fatal)
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("API key not found for provider: {0}")]
    MissingCredential(String),

    #[error("Invalid configuration for provider: {0}")]
    InvalidProviderConfig(String),

    // -------------------------------------------------------------------------
    // Provider Errors
    // -------------------------------------------------------------------------
    /// Raw vendor failure; never crosses the provider boundary
    #[error("{provider} API error ({status}): {message}")]
    Vendor {
        provider: String,
        status: u16,
        message: String,
    },

    /// Normalized provider failure carrying the original message
    #[error("Failed to generate tests: {message}")]
    Generation { provider: String, message: String },

    #[error("Test runner error: {0}")]
    TestRunner(String),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Recovery Outcome
    // -------------------------------------------------------------------------
    /// Non-recoverable, or recoverable but retries exhausted
    #[error("Fatal {} error in {}: {}", .record.kind, .record.context, .record.message)]
    Fatal {
        record: Box<ErrorRecord>,
        attempts: u32,
    },
}

pub type Result<T> = std::result::Result<T, TestWeaveError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl TestWeaveError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a normalized generation error
    pub fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a fatal error from a handled record
    pub fn fatal(record: ErrorRecord, attempts: u32) -> Self {
        Self::Fatal {
            record: Box::new(record),
            attempts,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// The handled record behind a fatal error
    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            Self::Fatal { record, .. } => Some(record),
            _ => None,
        }
    }

    /// Recovery kind of this error
    pub fn kind(&self) -> ErrorKind {
        ErrorClassifier::classify(self)
    }
}

// =============================================================================
// Tests
// =============================================================================
