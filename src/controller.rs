//! Data controller: wires the live feed, the weather cache and the pressure
//! history together and publishes typed events.
//!
//! # Cycles
//!
//! - **Feed**: every push is parsed, turned into an indoor report and
//!   followed by fresh recommendation cards. Malformed pushes are dropped.
//! - **Weather**: starts on the first push that carries a location, then
//!   runs every `weather_refresh_interval`.
//! - **Pressure trend**: starts on the first push, runs immediately and then
//!   every `pressure_analysis_interval`.
//! - **Connectivity**: every `connectivity_interval` from start.
//! - **Prune**: once, `prune_delay` after start.
//!
//! Each cycle is one sequential task, so no cycle overlaps with itself.
//! Recommendation cards are computed from the sensor snapshot and weather
//! entry read together under one lock, so they always see a matching pair.
//!
//! Dropping the [`Subscription`] (or calling [`Subscription::dispose`])
//! stops everything; results that arrive after that are discarded.

use crate::config::{Config, ConfigError};
use crate::core::clock::{format_report_time, normalize_epoch_ms, SessionClock};
use crate::core::recommend::{RecommendationCard, RecommendationEngine};
use crate::core::report::{IndoorReport, OutdoorTrends};
use crate::core::trend::TrendResult;
use crate::feed::{FeedError, FeedSubscription, SensorFeed, SensorSnapshot};
use crate::history::{HistoryPruner, PressureHistoryStore, PressureTrendAnalyzer};
use crate::stats::{create_shared_stats, SharedSessionStats};
use crate::weather::{WeatherCache, WeatherCacheEntry};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Everything the controller tells its consumer.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// A new sensor snapshot was accepted.
    SensorUpdate {
        snapshot: SensorSnapshot,
        report: IndoorReport,
    },
    /// A weather refresh cycle produced data (fresh or cached).
    WeatherUpdate {
        entry: Arc<WeatherCacheEntry>,
        /// `None` until two snapshots have been fetched
        trends: Option<OutdoorTrends>,
    },
    Connectivity(ConnectivityStatus),
    Recommendations(Vec<RecommendationCard>),
    PressureTrend(TrendResult),
}

/// Whether the sensor is still pushing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityStatus {
    pub is_offline: bool,
    /// `None` when no push has been received this session
    pub ms_since_last_update: Option<i64>,
    pub last_update_ms: Option<i64>,
    /// Time of the last push in the configured timezone, `-` if none
    pub last_update: String,
}

impl ConnectivityStatus {
    /// Offline when no push was ever seen or the last one is more than
    /// `threshold` away from `now_ms`. A stamp that far in the future means
    /// the device clock cannot be trusted, so it counts as offline too.
    /// `last_update` may be in seconds or milliseconds.
    pub fn evaluate(
        last_update: Option<i64>,
        now_ms: i64,
        threshold: Duration,
        tz: Tz,
    ) -> Self {
        let threshold_ms = i64::try_from(threshold.as_millis()).unwrap_or(i64::MAX);
        let last_update_ms = last_update.map(normalize_epoch_ms);
        let elapsed = last_update_ms.map(|last| now_ms.saturating_sub(last));

        Self {
            is_offline: elapsed.map_or(true, |ms| ms.saturating_abs() > threshold_ms),
            ms_since_last_update: elapsed,
            last_update_ms,
            last_update: last_update_ms
                .map(|ms| format_report_time(ms, tz))
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Latest accepted inputs.
#[derive(Default)]
struct LiveState {
    sensor: Option<SensorSnapshot>,
    weather: Option<Arc<WeatherCacheEntry>>,
    pressure: Option<TrendResult>,
    last_update_ms: Option<i64>,
}

#[derive(Default)]
struct Tasks {
    closed: bool,
    weather_started: bool,
    pressure_started: bool,
    handles: Vec<JoinHandle<()>>,
}

/// State shared by every cycle of one running controller.
struct Shared {
    config: Config,
    tz: Tz,
    clock: SessionClock,
    weather: Option<Arc<WeatherCache>>,
    analyzer: PressureTrendAnalyzer,
    pruner: HistoryPruner,
    engine: RecommendationEngine,
    stats: SharedSessionStats,
    state: Mutex<LiveState>,
    tasks: Mutex<Tasks>,
    events: mpsc::UnboundedSender<ControllerEvent>,
    closed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send an event unless the controller has been torn down.
    fn emit(&self, event: ControllerEvent) {
        if self.is_closed() {
            tracing::debug!("Controller disposed, discarding event");
            return;
        }
        if self.events.send(event).is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }

    /// Spawn a task owned by the subscription. Does nothing after dispose.
    fn spawn<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut tasks = lock(&self.tasks);
        if tasks.closed {
            return;
        }
        tasks.handles.push(tokio::spawn(future));
    }

    fn recompute_recommendations(&self) {
        let cards = {
            let state = lock(&self.state);
            let Some(sensor) = &state.sensor else {
                return;
            };
            let weather = state.weather.as_ref().map(|entry| &entry.current.current);
            self.engine
                .evaluate(&sensor.current, weather, state.pressure.as_ref())
        };
        self.emit(ControllerEvent::Recommendations(cards));
    }

    fn connectivity(&self) -> ConnectivityStatus {
        let last = lock(&self.state).last_update_ms;
        ConnectivityStatus::evaluate(
            last,
            self.clock.now_ms(),
            self.config.disconnect_threshold,
            self.tz,
        )
    }
}

/// Orchestrates one sensor's data flow.
pub struct DataController {
    config: Config,
    tz: Tz,
    feed: Arc<dyn SensorFeed>,
    history: Arc<dyn PressureHistoryStore>,
    weather: Option<Arc<WeatherCache>>,
    stats: SharedSessionStats,
}

impl DataController {
    pub fn new(
        config: Config,
        feed: Arc<dyn SensorFeed>,
        history: Arc<dyn PressureHistoryStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let tz = config.timezone()?;
        Ok(Self {
            config,
            tz,
            feed,
            history,
            weather: None,
            stats: create_shared_stats(),
        })
    }

    /// Enable the weather cycle. Without a cache, mold and thermal-shock
    /// cards keep waiting for outdoor data.
    pub fn with_weather(mut self, cache: Arc<WeatherCache>) -> Self {
        self.weather = Some(cache);
        self
    }

    pub fn with_stats(mut self, stats: SharedSessionStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> SharedSessionStats {
        Arc::clone(&self.stats)
    }

    /// Subscribe to the feed and start the timers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        &self,
    ) -> Result<(Subscription, mpsc::UnboundedReceiver<ControllerEvent>), FeedError> {
        let path = self.config.sensor_path();
        let feed_subscription = self.feed.subscribe(&path)?;
        let (events, receiver) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            config: self.config.clone(),
            tz: self.tz,
            clock: SessionClock::start(),
            weather: self.weather.clone(),
            analyzer: PressureTrendAnalyzer::new(Arc::clone(&self.history))
                .with_stats(Arc::clone(&self.stats)),
            pruner: HistoryPruner::new(Arc::clone(&self.history))
                .with_stats(Arc::clone(&self.stats)),
            engine: RecommendationEngine::new(),
            stats: Arc::clone(&self.stats),
            state: Mutex::new(LiveState::default()),
            tasks: Mutex::new(Tasks::default()),
            events,
            closed: AtomicBool::new(false),
        });

        tracing::info!(
            path,
            session = self.stats.session_id(),
            weather = self.weather.is_some(),
            "Starting data controller"
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let feed_task = tokio::spawn(feed_loop(
            Arc::clone(&shared),
            feed_subscription,
            shutdown_rx,
        ));

        shared.spawn(connectivity_loop(Arc::clone(&shared)));
        shared.spawn(prune_once(Arc::clone(&shared)));

        Ok((
            Subscription {
                shared,
                feed_shutdown: Some(shutdown_tx),
                feed_task: Some(feed_task),
            },
            receiver,
        ))
    }
}

/// Handle owning every task of a running controller.
pub struct Subscription {
    shared: Arc<Shared>,
    feed_shutdown: Option<oneshot::Sender<()>>,
    feed_task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop the feed listener and every timer. Idempotent.
    pub fn dispose(&mut self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(shutdown) = self.feed_shutdown.take() {
            let _ = shutdown.send(());
        }
        // the feed task unsubscribes on shutdown; dropping the handle detaches it
        self.feed_task.take();

        let handles = {
            let mut tasks = lock(&self.shared.tasks);
            tasks.closed = true;
            std::mem::take(&mut tasks.handles)
        };
        for handle in &handles {
            handle.abort();
        }

        tracing::info!(tasks = handles.len(), "Data controller stopped");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Current connectivity, computed on demand.
    pub fn connectivity(&self) -> ConnectivityStatus {
        self.shared.connectivity()
    }

    pub fn stats(&self) -> SharedSessionStats {
        Arc::clone(&self.shared.stats)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn feed_loop(
    shared: Arc<Shared>,
    mut subscription: FeedSubscription,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            payload = subscription.next() => match payload {
                Some(payload) => handle_push(&shared, payload),
                None => {
                    tracing::info!(path = subscription.path(), "Sensor feed closed");
                    break;
                }
            },
        }
    }
    subscription.unsubscribe();
}

fn handle_push(shared: &Arc<Shared>, payload: serde_json::Value) {
    if shared.is_closed() {
        return;
    }

    let snapshot = match SensorSnapshot::from_payload(payload) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping sensor payload");
            shared.stats.record_dropped_payload();
            return;
        }
    };
    shared.stats.record_sensor_update();

    let report = IndoorReport::from_snapshot(&snapshot, shared.config.default_altitude_m);
    tracing::debug!(
        temperature = snapshot.current.temperature,
        humidity = snapshot.current.humidity,
        pressure = snapshot.current.pressure,
        "Sensor data received"
    );

    let location = snapshot.location;
    {
        let mut state = lock(&shared.state);
        state.last_update_ms = Some(snapshot.current.timestamp_millis());
        state.sensor = Some(snapshot.clone());
    }

    shared.emit(ControllerEvent::SensorUpdate { snapshot, report });
    shared.recompute_recommendations();

    let (start_weather, start_pressure) = {
        let mut tasks = lock(&shared.tasks);
        let start_weather =
            location.is_some() && shared.weather.is_some() && !tasks.weather_started;
        let start_pressure = !tasks.pressure_started;
        tasks.weather_started |= start_weather;
        tasks.pressure_started = true;
        (start_weather, start_pressure)
    };

    if start_weather {
        tracing::info!("Location known, starting weather refresh cycle");
        shared.spawn(weather_loop(Arc::clone(shared)));
    }
    if start_pressure {
        shared.spawn(pressure_loop(Arc::clone(shared)));
    }
}

async fn weather_loop(shared: Arc<Shared>) {
    let Some(cache) = shared.weather.clone() else {
        return;
    };
    let mut ticker = tokio::time::interval(shared.config.weather_refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let location = lock(&shared.state)
            .sensor
            .as_ref()
            .and_then(|s| s.location);
        let Some(location) = location else {
            continue;
        };

        let entry = match cache
            .get_or_fetch(location.lat, location.lon, shared.clock.now())
            .await
        {
            Ok(entry) => entry,
            // already logged by the cache; the next tick tries again
            Err(_) => continue,
        };
        if shared.is_closed() {
            return;
        }

        lock(&shared.state).weather = Some(Arc::clone(&entry));
        let trends = entry.trends();
        shared.emit(ControllerEvent::WeatherUpdate { entry, trends });
        shared.recompute_recommendations();
    }
}

async fn pressure_loop(shared: Arc<Shared>) {
    let mut ticker = tokio::time::interval(shared.config.pressure_analysis_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let result = shared
            .analyzer
            .analyze(shared.config.pressure_window_hours)
            .await;
        if shared.is_closed() {
            return;
        }
        tracing::info!(level = %result.level, message = %result.message, "Pressure trend");

        lock(&shared.state).pressure = Some(result.clone());
        shared.emit(ControllerEvent::PressureTrend(result));
        shared.recompute_recommendations();
    }
}

async fn connectivity_loop(shared: Arc<Shared>) {
    let period = shared.config.connectivity_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let status = shared.connectivity();
        if status.is_offline {
            tracing::debug!(since_ms = ?status.ms_since_last_update, "Sensor offline");
        }
        shared.emit(ControllerEvent::Connectivity(status));
    }
}

async fn prune_once(shared: Arc<Shared>) {
    tokio::time::sleep(shared.config.prune_delay).await;
    match shared
        .pruner
        .prune(shared.config.pressure_retention_limit)
        .await
    {
        Ok(0) => {}
        Ok(deleted) => tracing::info!(deleted, "Old pressure history removed"),
        Err(e) => tracing::error!(error = %e, "Pressure history prune failed"),
    }
}
