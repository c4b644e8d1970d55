//! Time-boxed cache of the last weather refresh.
//!
//! The cache keeps the latest committed snapshot and the one before it, so
//! outdoor trends can be computed. A refresh issues the forecast,
//! air-quality and geocode calls concurrently and commits only if all three
//! succeed; any failure leaves the committed entry untouched.
//!
//! Readers get an `Arc` to a fully committed entry. The entry is replaced
//! as a whole, never mutated in place.

use crate::core::report::OutdoorTrends;
use crate::stats::SharedSessionStats;
use crate::weather::client::WeatherApi;
use crate::weather::types::WeatherSnapshot;
use crate::weather::WeatherError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;

/// Default time-to-live of a committed entry.
pub const DEFAULT_WEATHER_TTL: Duration = Duration::from_secs(15 * 60);

/// The latest committed snapshot and its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCacheEntry {
    pub current: WeatherSnapshot,
    /// Snapshot committed immediately before `current`
    pub previous: Option<WeatherSnapshot>,
}

impl WeatherCacheEntry {
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.current.fetched_at
    }

    /// Outdoor trends, when there is a previous snapshot to compare with.
    pub fn trends(&self) -> Option<OutdoorTrends> {
        self.previous
            .as_ref()
            .map(|previous| OutdoorTrends::between(&self.current.current, &previous.current))
    }
}

/// Session-scoped weather cache. Contents are lost when the process exits.
pub struct WeatherCache {
    api: Arc<dyn WeatherApi>,
    ttl: chrono::Duration,
    entry: RwLock<Option<Arc<WeatherCacheEntry>>>,
    refresh_gate: Mutex<()>,
    stats: Option<SharedSessionStats>,
}

impl WeatherCache {
    pub fn new(api: Arc<dyn WeatherApi>, ttl: Duration) -> Self {
        Self {
            api,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            entry: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            stats: None,
        }
    }

    pub fn with_stats(mut self, stats: SharedSessionStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// The committed entry, regardless of age.
    pub fn cached(&self) -> Option<Arc<WeatherCacheEntry>> {
        match self.entry.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The committed entry if `now` falls within `[fetched_at, fetched_at + ttl)`.
    /// An entry stamped after `now` (the caller's clock went back) is stale.
    fn fresh(&self, now: DateTime<Utc>) -> Option<Arc<WeatherCacheEntry>> {
        self.cached().filter(|entry| {
            let age = now.signed_duration_since(entry.fetched_at());
            age >= chrono::Duration::zero() && age < self.ttl
        })
    }

    /// Return the cached entry if it is younger than the TTL, otherwise run
    /// one refresh cycle.
    ///
    /// Only one refresh runs at a time; a caller arriving while a refresh is
    /// in flight waits for it and then reuses its result instead of starting
    /// a second one.
    pub async fn get_or_fetch(
        &self,
        lat: f64,
        lon: f64,
        now: DateTime<Utc>,
    ) -> Result<Arc<WeatherCacheEntry>, WeatherError> {
        if let Some(entry) = self.fresh(now) {
            tracing::debug!(fetched_at = %entry.fetched_at(), "Using cached weather data");
            if let Some(stats) = &self.stats {
                stats.record_weather_cache_hit();
            }
            return Ok(entry);
        }

        let _gate = self.refresh_gate.lock().await;

        // A refresh may have committed while we waited for the gate.
        if let Some(entry) = self.fresh(now) {
            if let Some(stats) = &self.stats {
                stats.record_weather_cache_hit();
            }
            return Ok(entry);
        }

        tracing::info!(lat, lon, "Fetching weather, air quality and location");
        match self.fetch_snapshot(lat, lon, now).await {
            Ok(snapshot) => {
                if let Some(stats) = &self.stats {
                    stats.record_weather_fetch();
                }
                Ok(self.commit(snapshot))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Weather refresh failed, keeping previous data");
                if let Some(stats) = &self.stats {
                    stats.record_weather_failure();
                }
                Err(e)
            }
        }
    }

    async fn fetch_snapshot(
        &self,
        lat: f64,
        lon: f64,
        now: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let (forecast, air, places) = tokio::try_join!(
            self.api.forecast(lat, lon),
            self.api.air_quality(lat, lon),
            self.api.reverse_geocode(lat, lon),
        )?;
        Ok(WeatherSnapshot::assemble(forecast, air, places, now))
    }

    /// Rotate the current snapshot into `previous` and install the new one.
    fn commit(&self, mut snapshot: WeatherSnapshot) -> Arc<WeatherCacheEntry> {
        let mut slot = match self.entry.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let previous = slot.as_ref().map(|entry| entry.current.clone());
        if let Some(prev) = &previous {
            // keep fetch times non-decreasing even if the caller's clock went back
            if snapshot.fetched_at < prev.fetched_at {
                snapshot.fetched_at = prev.fetched_at;
            }
        }

        let entry = Arc::new(WeatherCacheEntry {
            current: snapshot,
            previous,
        });
        *slot = Some(Arc::clone(&entry));
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::types::{AirPollutionResponse, ForecastResponse, GeoPlace};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockApi {
        calls: AtomicUsize,
        temperature: std::sync::Mutex<f64>,
        fail_air: AtomicBool,
        delay_ms: u64,
    }

    impl MockApi {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherApi for MockApi {
        async fn forecast(&self, _lat: f64, _lon: f64) -> Result<ForecastResponse, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            let temp = *self.temperature.lock().unwrap();
            Ok(serde_json::from_value(json!({
                "current": {"temp": temp, "humidity": 80, "pressure": 1020}
            }))
            .unwrap())
        }

        async fn air_quality(
            &self,
            _lat: f64,
            _lon: f64,
        ) -> Result<AirPollutionResponse, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_air.load(Ordering::SeqCst) {
                return Err(WeatherError::Status {
                    status: 500,
                    endpoint: "air_pollution".to_string(),
                });
            }
            Ok(AirPollutionResponse { list: vec![] })
        }

        async fn reverse_geocode(
            &self,
            _lat: f64,
            _lon: f64,
        ) -> Result<Vec<GeoPlace>, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![GeoPlace {
                name: "Testville".to_string(),
            }])
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-22T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn minutes(n: i64) -> chrono::Duration {
        chrono::Duration::minutes(n)
    }

    #[tokio::test]
    async fn test_within_ttl_issues_no_calls() {
        let api = Arc::new(MockApi::default());
        let cache = WeatherCache::new(api.clone(), DEFAULT_WEATHER_TTL);

        let first = cache.get_or_fetch(4.7, -74.0, t0()).await.unwrap();
        assert_eq!(api.calls(), 3);
        assert!(first.previous.is_none());

        let again = cache.get_or_fetch(4.7, -74.0, t0() + minutes(10)).await.unwrap();
        assert_eq!(api.calls(), 3);
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[tokio::test]
    async fn test_after_ttl_rotates_previous() {
        let api = Arc::new(MockApi::default());
        *api.temperature.lock().unwrap() = 15.0;
        let cache = WeatherCache::new(api.clone(), DEFAULT_WEATHER_TTL);

        cache.get_or_fetch(4.7, -74.0, t0()).await.unwrap();
        *api.temperature.lock().unwrap() = 17.0;
        let entry = cache.get_or_fetch(4.7, -74.0, t0() + minutes(16)).await.unwrap();

        assert_eq!(api.calls(), 6);
        assert_eq!(entry.current.current.temperature, Some(17.0));
        let previous = entry.previous.as_ref().unwrap();
        assert_eq!(previous.current.temperature, Some(15.0));
        assert!(previous.fetched_at < entry.current.fetched_at);

        let trends = entry.trends().unwrap();
        assert_eq!(trends.temperature.delta, Some(2.0));
    }

    #[tokio::test]
    async fn test_partial_failure_on_first_fetch_leaves_cache_empty() {
        let api = Arc::new(MockApi::default());
        api.fail_air.store(true, Ordering::SeqCst);
        let cache = WeatherCache::new(api.clone(), DEFAULT_WEATHER_TTL);

        let result = cache.get_or_fetch(4.7, -74.0, t0()).await;
        assert!(result.is_err());
        assert!(cache.cached().is_none());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_prior_entry() {
        let api = Arc::new(MockApi::default());
        *api.temperature.lock().unwrap() = 15.0;
        let cache = WeatherCache::new(api.clone(), DEFAULT_WEATHER_TTL);
        let before = cache.get_or_fetch(4.7, -74.0, t0()).await.unwrap();

        api.fail_air.store(true, Ordering::SeqCst);
        *api.temperature.lock().unwrap() = 30.0;
        let result = cache.get_or_fetch(4.7, -74.0, t0() + minutes(20)).await;
        assert!(result.is_err());

        let after = cache.cached().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(after.previous.is_none());
        assert_eq!(after.current.current.temperature, Some(15.0));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_refresh() {
        let api = Arc::new(MockApi {
            delay_ms: 20,
            ..MockApi::default()
        });
        let cache = WeatherCache::new(api.clone(), DEFAULT_WEATHER_TTL);

        let (a, b) = tokio::join!(
            cache.get_or_fetch(4.7, -74.0, t0()),
            cache.get_or_fetch(4.7, -74.0, t0()),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(api.calls(), 3);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_fetch_time_never_goes_backwards() {
        let api = Arc::new(MockApi::default());
        *api.temperature.lock().unwrap() = 15.0;
        let cache = WeatherCache::new(api.clone(), DEFAULT_WEATHER_TTL);

        let first = cache.get_or_fetch(4.7, -74.0, t0()).await.unwrap();

        // clock went back: the entry is stamped in the future, so refetch
        *api.temperature.lock().unwrap() = 16.0;
        let second = cache.get_or_fetch(4.7, -74.0, t0() - minutes(5)).await.unwrap();

        assert_eq!(api.calls(), 6);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.current.current.temperature, Some(16.0));
        assert_eq!(second.fetched_at(), t0());
        assert_eq!(second.previous.as_ref().unwrap().fetched_at, t0());
    }
}
