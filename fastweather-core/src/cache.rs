//! Short-lived in-memory cache of normalized reports.
//!
//! Entries are keyed by [`WeatherQuery::cache_key`](crate::WeatherQuery::cache_key)
//! and expire after a fixed age measured against an injected [`Clock`]. The
//! cache is bounded: once `max_entries` keys are held, storing a new key
//! evicts the least recently used one.

use chrono::{DateTime, Duration, Utc};
use moka::{policy::EvictionPolicy, sync::Cache};
use std::fmt::Debug;

use crate::model::WeatherReport;

pub const DEFAULT_TTL_SECS: u64 = 10 * 60;
pub const DEFAULT_MAX_ENTRIES: usize = 256;

/// Source of "now" for staleness checks.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub report: WeatherReport,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.stored_at >= ttl
    }
}

/// Staleness is judged by the caller's clock rather than moka's own
/// time-to-live, so expiry stays deterministic under a fake clock. moka
/// handles the size bound.
pub struct ReportCache {
    entries: Cache<String, CacheEntry>,
    ttl: Duration,
}

impl ReportCache {
    pub fn new(ttl: std::time::Duration, max_entries: usize) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries.max(1) as u64)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            entries,
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(365 * 100)),
        }
    }

    /// Fresh report for `key`, if any. A hit counts as a use for eviction order.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<WeatherReport> {
        let entry = self.entries.get(key)?;
        if entry.is_stale(now, self.ttl) {
            return None;
        }
        Some(entry.report)
    }

    /// Store `report` under `key`, replacing any previous (possibly stale) entry.
    pub fn insert(&self, key: String, report: WeatherReport, now: DateTime<Utc>) {
        self.entries.insert(key, CacheEntry { report, stored_at: now });
    }

    /// Number of held entries, stale ones included. Exact only after
    /// [`ReportCache::sync`].
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Apply moka's pending bookkeeping, including size-based eviction.
    pub fn sync(&self) {
        self.entries.run_pending_tasks();
    }
}

impl Debug for ReportCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportCache")
            .field("entries", &self.entries.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(DEFAULT_TTL_SECS), DEFAULT_MAX_ENTRIES)
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ManualClock {
    now: parking_lot::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Self {
        let start = DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc);
        Self { now: parking_lot::Mutex::new(start) }
    }

    pub(crate) fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
