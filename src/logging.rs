//! Append-only Log Sinks
//!
//! The recovery engine and monitor write human-readable lines to a sink.
//! Sinks are infallible: a failing sink must never surface into the caller.

use std::sync::{Arc, Mutex};

use tracing::info;

/// Append-only line sink
pub trait LogSink: Send + Sync {
    fn append_line(&self, line: &str);
}

/// Shared sink handle
pub type SharedSink = Arc<dyn LogSink>;

/// Forwards lines to `tracing` under the `testweave::output` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn append_line(&self, line: &str) {
        info!(target: "testweave::output", "{}", line);
    }
}

/// Collects lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of lines starting with `prefix`
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|l| l.starts_with(prefix))
            .count()
    }
}

impl LogSink for MemorySink {
    fn append_line(&self, line: &str) {
        // Poisoning only means another writer panicked mid-push; keep appending
        let mut lines = self
            .lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        lines.push(line.to_string());
    }
}

/// Default sink used when none is injected
pub fn tracing_sink() -> SharedSink {
    Arc::new(TracingSink)
}
