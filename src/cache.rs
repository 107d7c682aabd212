//! Expiring Key/Value Cache
//!
//! Time-bounded cache for derived results (generated tests keyed by request hash).
//!
//! ## Expiry
//!
//! - **Lazy**: `get`/`has` drop an expired entry on access, even between sweeps
//! - **Sweep**: an optional background task removes every expired entry at a
//!   fixed interval, bounding memory between accesses
//!
//! There is no size-based eviction; capacity is bounded only by ttl.
//!
//! Backed by `DashMap`, so each per-key mutation is atomic with respect to
//! concurrent readers and the sweeper.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::constants::cache as cache_constants;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime applied by `set`
    pub default_ttl: Duration,
    /// Interval between background sweeps
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(cache_constants::DEFAULT_TTL_SECS),
            sweep_interval: Duration::from_secs(cache_constants::SWEEP_INTERVAL_SECS),
        }
    }
}

/// Stored value with its insertion time and lifetime
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Logically absent once age exceeds ttl
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) > self.ttl
    }
}

/// Expiring cache with optional background sweep
pub struct TtlCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
    sweeper: Option<JoinHandle<()>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Cache without a background sweeper (lazy expiry only)
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            default_ttl,
            sweeper: None,
        }
    }

    /// Cache with a background sweeper. Must be called within a tokio runtime.
    pub fn spawn(config: CacheConfig) -> Self {
        let entries = Arc::new(DashMap::new());
        let sweeper = tokio::spawn(sweep_loop(Arc::downgrade(&entries), config.sweep_interval));
        Self {
            entries,
            default_ttl: config.default_ttl,
            sweeper: Some(sweeper),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Insert with the default ttl
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert with a caller-supplied ttl; last writer wins
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
        }
        // Re-check under the write lock: a concurrent set may have refreshed it
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            None => return false,
            Some(entry) => entry.is_expired(now),
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
            return false;
        }
        true
    }

    /// Remove a key; returns whether it was present
    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Physically stored entries, expired-but-unswept included
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Remove every expired entry; returns how many were dropped
    pub fn sweep(&self) -> usize {
        sweep_entries(&self.entries)
    }

    /// Stop the background sweeper
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

impl<V> Drop for TtlCache<V> {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.entries.len())
            .field("default_ttl", &self.default_ttl)
            .field("sweeping", &self.sweeper.is_some())
            .finish()
    }
}

fn sweep_entries<V>(entries: &DashMap<String, CacheEntry<V>>) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    before.saturating_sub(entries.len())
}

async fn sweep_loop<V>(entries: Weak<DashMap<String, CacheEntry<V>>>, interval: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        // Cache dropped: nothing left to sweep
        let Some(entries) = entries.upgrade() else {
            break;
        };
        let removed = sweep_entries(&entries);
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "Cache sweep");
        }
    }
}
