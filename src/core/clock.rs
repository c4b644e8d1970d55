//! Report-time helpers.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Wall clock anchored at session start and advanced by the runtime's
/// monotonic clock.
///
/// Readings never go backwards even if the system clock is adjusted, and
/// they follow tokio's paused clock in tests.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    wall_start: DateTime<Utc>,
    start: tokio::time::Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            wall_start: Utc::now(),
            start: tokio::time::Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.start.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall_start + elapsed
    }

    pub fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Epoch values below this are taken to be seconds rather than milliseconds.
const SECONDS_CUTOFF: i64 = 1_000_000_000_000;

/// Normalize an epoch timestamp that may be in seconds or milliseconds.
pub fn normalize_epoch_ms(epoch: i64) -> i64 {
    if epoch < SECONDS_CUTOFF {
        epoch.saturating_mul(1000)
    } else {
        epoch
    }
}

/// Convert an epoch timestamp (seconds or milliseconds) to a UTC instant.
pub fn epoch_to_utc(epoch: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(normalize_epoch_ms(epoch)).single()
}

/// Render an epoch timestamp as `YYYY-MM-DD HH:MM:SS` in the given zone.
pub fn format_report_time(epoch: i64, tz: Tz) -> String {
    match epoch_to_utc(epoch) {
        Some(instant) => instant
            .with_timezone(&tz)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "-".to_string(),
    }
}
