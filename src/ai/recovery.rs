//! Error Recovery Engine
//!
//! Classifies failures, logs them to the output sink and retries the
//! recoverable ones with exponential backoff.
//!
//! ## Flow
//!
//! 1. Classify the error and write its record (`[ERROR]` block)
//! 2. Non-recoverable kind, or no strategy for it: log `[FATAL]`, return
//!    `TestWeaveError::Fatal`
//! 3. Otherwise, for each attempt: sleep the backoff, then retry
//!    - success: log `[RECOVERED]` and return the value
//!    - failure: log `[RETRY]` and double the backoff
//! 4. Out of attempts: log `[FATAL]` carrying the original record
//!
//! Sleeps only suspend the recovering task. Dropping the returned future
//! cancels recovery at the next await point.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::RetrySettings;
use crate::constants::retry as retry_constants;
use crate::logging::SharedSink;
use crate::types::{ErrorKind, ErrorRecord, Result, TestWeaveError};

/// Bounded exponential retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: retry_constants::MAX_RETRIES,
            initial_backoff: Duration::from_millis(retry_constants::INITIAL_BACKOFF_MS),
            backoff_factor: retry_constants::BACKOFF_FACTOR,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            ..Self::default()
        }
    }
}

impl RetryPolicy {
    /// Sleep before retry `attempt` (1-based): initial × factor^(attempt-1)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let multiplier = self.backoff_factor.saturating_pow(exp);
        self.initial_backoff.saturating_mul(multiplier)
    }
}

/// Retry executor with per-kind strategies
#[derive(Clone)]
pub struct RecoveryEngine {
    sink: SharedSink,
    strategies: HashMap<ErrorKind, RetryPolicy>,
}

impl std::fmt::Debug for RecoveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryEngine")
            .field("strategies", &self.strategies)
            .finish()
    }
}

impl RecoveryEngine {
    /// Engine with the default policy for every recoverable kind
    pub fn new(sink: SharedSink) -> Self {
        Self::with_policy(sink, RetryPolicy::default())
    }

    pub fn with_policy(sink: SharedSink, policy: RetryPolicy) -> Self {
        let strategies = [ErrorKind::Network, ErrorKind::RemoteService]
            .into_iter()
            .map(|kind| (kind, policy))
            .collect();
        Self { sink, strategies }
    }

    /// Register or replace the policy for one recoverable kind.
    /// Local framework and platform errors are never retried, so a policy
    /// for them is ignored.
    pub fn with_strategy(mut self, kind: ErrorKind, policy: RetryPolicy) -> Self {
        if kind.is_recoverable() {
            self.strategies.insert(kind, policy);
        } else {
            warn!(kind = %kind, "Ignoring retry strategy for non-recoverable error kind");
        }
        self
    }

    pub fn strategy(&self, kind: ErrorKind) -> Option<&RetryPolicy> {
        self.strategies.get(&kind)
    }

    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    /// Run `op` once; on failure hand it to [`Self::handle`] with `op` as the retry
    pub async fn execute<T, F, Fut>(&self, context: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match op().await {
            Ok(value) => Ok(value),
            Err(err) => self.handle(err, context, op).await,
        }
    }

    /// Recover from `error` by re-running `retry`, or surface it as Fatal
    pub async fn handle<T, F, Fut>(
        &self,
        error: TestWeaveError,
        context: &str,
        mut retry: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let record = ErrorRecord::from_error(&error, context);
        self.log_record(&record);

        let policy = record
            .kind
            .is_recoverable()
            .then(|| self.strategies.get(&record.kind).copied())
            .flatten();
        let Some(policy) = policy else {
            return Err(self.surface(record, 0));
        };

        for attempt in 1..=policy.max_retries {
            let backoff = policy.backoff_for(attempt);
            debug!(
                context,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "Retrying after backoff"
            );
            sleep(backoff).await;

            match retry().await {
                Ok(value) => {
                    self.sink.append_line(&format!(
                        "[RECOVERED] {} succeeded after {} attempt(s)",
                        context, attempt
                    ));
                    info!(context, attempts = attempt, kind = %record.kind, "Recovered");
                    return Ok(value);
                }
                Err(err) => {
                    self.sink.append_line(&format!(
                        "[RETRY] {} attempt {}/{} failed: {}",
                        context, attempt, policy.max_retries, err
                    ));
                    warn!(
                        context,
                        attempt,
                        max_retries = policy.max_retries,
                        error = %err,
                        "Retry attempt failed"
                    );
                }
            }
        }

        Err(self.surface(record, policy.max_retries))
    }

    /// Log `error` and convert it to Fatal without retrying
    pub fn fail(&self, error: TestWeaveError, context: &str) -> TestWeaveError {
        if error.is_fatal() {
            return error;
        }
        let record = ErrorRecord::from_error(&error, context);
        self.log_record(&record);
        self.surface(record, 0)
    }

    fn log_record(&self, record: &ErrorRecord) {
        for line in record.log_lines() {
            self.sink.append_line(&line);
        }
    }

    fn surface(&self, record: ErrorRecord, attempts: u32) -> TestWeaveError {
        self.sink.append_line(&format!(
            "[FATAL] {} error in {} after {} attempt(s): {}",
            record.kind, record.context, attempts, record.message
        ));
        error!(
            kind = %record.kind,
            context = %record.context,
            attempts,
            message = %record.message,
            "Unrecoverable error"
        );
        TestWeaveError::fatal(record, attempts)
    }
}
