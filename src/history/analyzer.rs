//! Pressure trend over the most recent history window.

use super::PressureHistoryStore;
use crate::core::trend::{direction_of, round2, AlertLevel, TrendResult};
use crate::stats::SharedSessionStats;
use std::sync::Arc;

/// Message of the warm-up result (fewer than two records).
pub const CALCULATING_MESSAGE: &str = "Calculating...";
/// Message of the result returned when the store cannot be read.
pub const FETCH_ERROR_MESSAGE: &str = "Error fetching data.";

/// Classify a pressure change (hPa over the analysis window).
pub fn classify_pressure_change(delta: f64) -> TrendResult {
    let rounded = round2(delta);
    let (level, icon, message) = if delta < -1.5 {
        (
            AlertLevel::Danger,
            "🌧️",
            "Pressure is dropping fast. Rain or bad weather is very likely. Close the windows!",
        )
    } else if delta < -0.5 {
        (
            AlertLevel::Caution,
            "🌦️",
            "Pressure is trending down. The weather may get worse.",
        )
    } else if delta > 1.5 {
        (
            AlertLevel::Good,
            "☀️",
            "Pressure is rising. The weather should improve and settle.",
        )
    } else {
        (
            AlertLevel::Good,
            "🌤️",
            "Atmospheric pressure is stable. No sudden weather changes expected.",
        )
    };

    TrendResult {
        delta: Some(rounded),
        direction: Some(direction_of(rounded)),
        level,
        icon: icon.to_string(),
        message: message.to_string(),
    }
}

/// Warm-up result: not an error, just not enough history yet.
pub fn pending_result() -> TrendResult {
    TrendResult {
        delta: None,
        direction: None,
        level: AlertLevel::Caution,
        icon: String::new(),
        message: CALCULATING_MESSAGE.to_string(),
    }
}

/// Result reported when the history cannot be read.
pub fn error_result() -> TrendResult {
    TrendResult {
        delta: None,
        direction: None,
        level: AlertLevel::Danger,
        icon: String::new(),
        message: FETCH_ERROR_MESSAGE.to_string(),
    }
}

/// Reads the newest records and grades the change across them.
pub struct PressureTrendAnalyzer {
    store: Arc<dyn PressureHistoryStore>,
    stats: Option<SharedSessionStats>,
}

impl PressureTrendAnalyzer {
    pub fn new(store: Arc<dyn PressureHistoryStore>) -> Self {
        Self { store, stats: None }
    }

    pub fn with_stats(mut self, stats: SharedSessionStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Compare the newest record with the oldest of the last `window`
    /// records. Never fails: store errors become a danger-level result.
    pub async fn analyze(&self, window: usize) -> TrendResult {
        if let Some(stats) = &self.stats {
            stats.record_pressure_analysis();
        }

        let records = match self.store.last(window).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read pressure history");
                return error_result();
            }
        };

        let (oldest, newest) = match records.as_slice() {
            [oldest, .., newest] => (oldest, newest),
            _ => {
                tracing::debug!(records = records.len(), "Not enough pressure history yet");
                return pending_result();
            }
        };

        let delta = newest.pressure - oldest.pressure;
        tracing::debug!(
            window,
            from = oldest.pressure,
            to = newest.pressure,
            delta,
            "Pressure trend analyzed"
        );
        classify_pressure_change(delta)
    }
}
