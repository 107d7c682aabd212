//! Performance Metrics & Health Monitoring
//!
//! - `track_performance` wraps any fallible future and records exactly one
//!   sample per call, success or failure, without altering the outcome
//! - Samples live in a fixed-capacity ring buffer (oldest evicted first)
//! - Health probes are registered per service name and run in their own task,
//!   so a probe that errors, panics or hangs becomes an Unhealthy record
//!   instead of tearing down the caller
//! - `start` runs `check_all` on a fixed interval until the handle is dropped
//!
//! ## Usage
//!
//! ```ignore
//! let monitor = Arc::new(Monitor::new(tracing_sink()));
//! let result = monitor.track_performance("generateTests", orchestrator.generate_tests(req)).await;
//! let _handle = monitor.start(Duration::from_secs(300));
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, warn};

use crate::ai::timeout::with_timeout_map;
use crate::constants::monitor as monitor_constants;
use crate::logging::SharedSink;
use crate::types::Result;

// =============================================================================
// Samples
// =============================================================================

/// One timed operation
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSample {
    pub operation: String,
    pub duration_ms: u64,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Latest known state of one service
#[derive(Debug, Clone, Serialize)]
pub struct HealthRecord {
    pub service: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// What a probe observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub status: HealthStatus,
    pub details: Option<String>,
}

impl ProbeReport {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            details: None,
        }
    }

    pub fn degraded(details: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            details: Some(details.into()),
        }
    }

    pub fn unhealthy(details: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            details: Some(details.into()),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Health check for one named service
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> Result<ProbeReport>;
}

/// Probe that always reports the same thing
#[derive(Debug, Clone)]
pub struct StaticProbe(pub ProbeReport);

impl StaticProbe {
    pub fn healthy() -> Self {
        Self(ProbeReport::healthy())
    }
}

#[async_trait]
impl HealthProbe for StaticProbe {
    async fn probe(&self) -> Result<ProbeReport> {
        Ok(self.0.clone())
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Aggregates for one operation name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationStats {
    pub operation: String,
    pub count: usize,
    pub failures: usize,
    pub avg_duration_ms: f64,
    pub max_duration_ms: u64,
}

/// Aggregates over the samples currently buffered
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub total: usize,
    pub failures: usize,
    pub operations: Vec<OperationStats>,
}

impl MetricsSummary {
    /// Format summary for display
    pub fn display(&self) -> String {
        let mut out = format!("Samples: {} ({} failed)", self.total, self.failures);
        for op in &self.operations {
            out.push_str(&format!(
                "\n  {}: {} calls, {} failed, avg {:.0}ms, max {}ms",
                op.operation, op.count, op.failures, op.avg_duration_ms, op.max_duration_ms
            ));
        }
        out
    }
}

// =============================================================================
// Monitor
// =============================================================================

/// Process-wide metrics buffer and health registry
pub struct Monitor {
    sink: SharedSink,
    capacity: usize,
    probe_timeout: Duration,
    samples: Mutex<VecDeque<PerformanceSample>>,
    probes: RwLock<HashMap<String, Arc<dyn HealthProbe>>>,
    health: DashMap<String, HealthRecord>,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("capacity", &self.capacity)
            .field("samples", &self.lock_samples().len())
            .field("services", &self.services())
            .finish()
    }
}

impl Monitor {
    pub fn new(sink: SharedSink) -> Self {
        Self::with_capacity(sink, monitor_constants::MAX_SAMPLES)
    }

    pub fn with_capacity(sink: SharedSink, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            sink,
            capacity,
            probe_timeout: Duration::from_secs(monitor_constants::PROBE_TIMEOUT_SECS),
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            probes: RwLock::new(HashMap::new()),
            health: DashMap::new(),
        }
    }

    /// Bound on a single probe run
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    // -------------------------------------------------------------------------
    // Performance
    // -------------------------------------------------------------------------

    /// Await `task`, record one sample, and return its outcome unchanged
    pub async fn track_performance<T, E, F>(
        &self,
        operation: &str,
        task: F,
    ) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
    {
        let start = Instant::now();
        let outcome = task.await;
        self.record_sample(PerformanceSample {
            operation: operation.to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            success: outcome.is_ok(),
            timestamp: Utc::now(),
        });
        outcome
    }

    pub fn record_sample(&self, sample: PerformanceSample) {
        self.sink.append_line(&format!(
            "[METRIC] {} {}ms success={}",
            sample.operation, sample.duration_ms, sample.success
        ));

        let mut samples = self.lock_samples();
        while samples.len() >= self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Buffered samples, oldest first
    pub fn samples(&self) -> Vec<PerformanceSample> {
        self.lock_samples().iter().cloned().collect()
    }

    pub fn summary(&self) -> MetricsSummary {
        let samples = self.lock_samples();
        let mut by_operation: BTreeMap<&str, (usize, usize, u64, u64)> = BTreeMap::new();

        for sample in samples.iter() {
            let entry = by_operation
                .entry(sample.operation.as_str())
                .or_insert((0, 0, 0, 0));
            entry.0 += 1;
            if !sample.success {
                entry.1 += 1;
            }
            entry.2 += sample.duration_ms;
            entry.3 = entry.3.max(sample.duration_ms);
        }

        let operations: Vec<OperationStats> = by_operation
            .into_iter()
            .map(|(name, (count, failures, total_ms, max_ms))| OperationStats {
                operation: name.to_string(),
                count,
                failures,
                avg_duration_ms: total_ms as f64 / count as f64,
                max_duration_ms: max_ms,
            })
            .collect();

        MetricsSummary {
            total: samples.len(),
            failures: operations.iter().map(|o| o.failures).sum(),
            operations,
        }
    }

    fn lock_samples(&self) -> std::sync::MutexGuard<'_, VecDeque<PerformanceSample>> {
        self.samples.lock().unwrap_or_else(|poisoned| {
            error!("Monitor samples mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    // -------------------------------------------------------------------------
    // Health
    // -------------------------------------------------------------------------

    /// Register (or replace) the probe for `service`
    pub fn register_probe(&self, service: impl Into<String>, probe: Arc<dyn HealthProbe>) {
        self.probes
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(service.into(), probe);
    }

    /// Fill the standard service names that have no probe yet
    pub fn register_default_probes(&self) {
        let mut probes = self.probes.write().unwrap_or_else(|p| p.into_inner());
        for service in monitor_constants::DEFAULT_SERVICES {
            probes
                .entry(service.to_string())
                .or_insert_with(|| Arc::new(StaticProbe::healthy()));
        }
    }

    /// Registered service names, sorted
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .probes
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Probe one service and store the result, replacing the previous record
    pub async fn check_health(&self, service: &str) -> HealthRecord {
        let probe = self
            .probes
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(service)
            .cloned();

        let report = match probe {
            Some(probe) => self.run_probe(service, probe).await,
            None => ProbeReport::healthy().with_details("No probe registered"),
        };

        let record = HealthRecord {
            service: service.to_string(),
            status: report.status,
            last_check: Utc::now(),
            details: report.details,
        };

        let line = match &record.details {
            Some(details) => format!("[HEALTH] {}: {} ({})", service, record.status, details),
            None => format!("[HEALTH] {}: {}", service, record.status),
        };
        self.sink.append_line(&line);

        self.health.insert(service.to_string(), record.clone());
        record
    }

    /// Probe every registered service concurrently
    pub async fn check_all(&self) -> Vec<HealthRecord> {
        let services = self.services();
        futures::future::join_all(services.iter().map(|s| self.check_health(s))).await
    }

    /// Latest record per service, sorted by name
    pub fn health_status(&self) -> Vec<HealthRecord> {
        let mut records: Vec<HealthRecord> =
            self.health.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| a.service.cmp(&b.service));
        records
    }

    pub fn health_of(&self, service: &str) -> Option<HealthRecord> {
        self.health.get(service).map(|e| e.value().clone())
    }

    async fn run_probe(&self, service: &str, probe: Arc<dyn HealthProbe>) -> ProbeReport {
        let mut handle = tokio::spawn(async move { probe.probe().await });

        match with_timeout_map(self.probe_timeout, &mut handle, "health probe").await {
            Ok(Ok(Ok(report))) => report,
            Ok(Ok(Err(e))) => {
                warn!(service, error = %e, "Health probe failed");
                ProbeReport::unhealthy(e.to_string())
            }
            Ok(Err(join_err)) => {
                warn!(service, error = %join_err, "Health probe aborted");
                ProbeReport::unhealthy(format!("probe panicked: {}", join_err))
            }
            Err(e) => {
                handle.abort();
                warn!(service, error = %e, "Health probe timed out");
                ProbeReport::unhealthy(e.to_string())
            }
        }
    }

    /// Run `check_all` every `interval` until the handle is dropped.
    /// The first check happens one interval after start.
    pub fn start(self: &Arc<Self>, interval: Duration) -> MonitorHandle {
        let monitor = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                let records = monitor.check_all().await;
                let unhealthy = records
                    .iter()
                    .filter(|r| r.status != HealthStatus::Healthy)
                    .count();
                debug!(services = records.len(), unhealthy, "Periodic health check");
            }
        });
        MonitorHandle { task }
    }
}

/// Stops the periodic health task when dropped
#[derive(Debug)]
pub struct MonitorHandle {
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Abort the periodic task; dropping the handle does the same
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
