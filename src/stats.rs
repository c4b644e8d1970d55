//! Session statistics.
//!
//! Lock-free counters describing what the agent did during the current
//! session. Nothing is persisted; counters start at zero with each process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current session.
#[derive(Debug)]
pub struct SessionStats {
    session_id: String,
    sensor_updates: AtomicU64,
    dropped_payloads: AtomicU64,
    weather_fetches: AtomicU64,
    weather_cache_hits: AtomicU64,
    weather_failures: AtomicU64,
    pressure_analyses: AtomicU64,
    records_pruned: AtomicU64,
    session_start: DateTime<Utc>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            session_id: format!("SESS-{}", &uuid::Uuid::new_v4().to_string()[..8]),
            sensor_updates: AtomicU64::new(0),
            dropped_payloads: AtomicU64::new(0),
            weather_fetches: AtomicU64::new(0),
            weather_cache_hits: AtomicU64::new(0),
            weather_failures: AtomicU64::new(0),
            pressure_analyses: AtomicU64::new(0),
            records_pruned: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn record_sensor_update(&self) {
        self.sensor_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_payload(&self) {
        self.dropped_payloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_weather_fetch(&self) {
        self.weather_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_weather_cache_hit(&self) {
        self.weather_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_weather_failure(&self) {
        self.weather_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pressure_analysis(&self) {
        self.pressure_analyses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_records_pruned(&self, count: u64) {
        self.records_pruned.fetch_add(count, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            session_id: self.session_id.clone(),
            sensor_updates: self.sensor_updates.load(Ordering::Relaxed),
            dropped_payloads: self.dropped_payloads.load(Ordering::Relaxed),
            weather_fetches: self.weather_fetches.load(Ordering::Relaxed),
            weather_cache_hits: self.weather_cache_hits.load(Ordering::Relaxed),
            weather_failures: self.weather_failures.load(Ordering::Relaxed),
            pressure_analyses: self.pressure_analyses.load(Ordering::Relaxed),
            records_pruned: self.records_pruned.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Human-readable summary for the end of a session.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Session Statistics ({}):\n\
             - Sensor updates: {}\n\
             - Dropped payloads: {}\n\
             - Weather fetches: {} ({} cache hits, {} failures)\n\
             - Pressure analyses: {}\n\
             - History records pruned: {}\n\
             - Session duration: {} seconds",
            stats.session_id,
            stats.sensor_updates,
            stats.dropped_payloads,
            stats.weather_fetches,
            stats.weather_cache_hits,
            stats.weather_failures,
            stats.pressure_analyses,
            stats.records_pruned,
            stats.session_duration_secs
        )
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the session counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub session_id: String,
    pub sensor_updates: u64,
    pub dropped_payloads: u64,
    pub weather_fetches: u64,
    pub weather_cache_hits: u64,
    pub weather_failures: u64,
    pub pressure_analyses: u64,
    pub records_pruned: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared statistics.
pub type SharedSessionStats = Arc<SessionStats>;

/// Create a new shared statistics handle.
pub fn create_shared_stats() -> SharedSessionStats {
    Arc::new(SessionStats::new())
}
