//! Trend classification for reading deltas.
//!
//! A delta between two readings is turned into a direction (with an arrow
//! icon), a qualitative alert level and a short message. Deltas are rounded
//! to two decimals first so epsilon-level noise does not flip the direction.

use serde::{Deserialize, Serialize};

/// Direction of change between two readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

impl TrendDirection {
    /// Arrow shown next to a trend.
    pub fn icon(&self) -> &'static str {
        match self {
            TrendDirection::Rising => "↗",
            TrendDirection::Falling => "↘",
            TrendDirection::Stable => "➡",
        }
    }
}

/// Qualitative level shared by trends and recommendation cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Good,
    Caution,
    Danger,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Good => write!(f, "good"),
            AlertLevel::Caution => write!(f, "caution"),
            AlertLevel::Danger => write!(f, "danger"),
        }
    }
}

/// Magnitude thresholds used to grade a delta.
///
/// A rounded delta whose absolute value reaches `danger` is graded danger,
/// one reaching `caution` is graded caution, anything smaller is good.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendThresholds {
    pub caution: f64,
    pub danger: f64,
    /// Unit appended to the message (e.g. "°C").
    pub unit: &'static str,
}

impl TrendThresholds {
    pub const TEMPERATURE: Self = Self {
        caution: 1.0,
        danger: 3.0,
        unit: "°C",
    };

    pub const HUMIDITY: Self = Self {
        caution: 5.0,
        danger: 10.0,
        unit: "%",
    };

    pub const PRESSURE: Self = Self {
        caution: 0.5,
        danger: 1.5,
        unit: "hPa",
    };

    fn grade(&self, magnitude: f64) -> AlertLevel {
        if magnitude >= self.danger {
            AlertLevel::Danger
        } else if magnitude >= self.caution {
            AlertLevel::Caution
        } else {
            AlertLevel::Good
        }
    }
}

/// Result of classifying a delta.
///
/// A neutral result (no delta, no direction, empty icon and message) means
/// there was not enough data to compute a trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub delta: Option<f64>,
    pub direction: Option<TrendDirection>,
    pub level: AlertLevel,
    pub icon: String,
    pub message: String,
}

impl TrendResult {
    /// The "insufficient data" result.
    pub fn neutral() -> Self {
        Self {
            delta: None,
            direction: None,
            level: AlertLevel::Good,
            icon: String::new(),
            message: String::new(),
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.delta.is_none()
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Direction of an already-rounded delta.
pub fn direction_of(rounded: f64) -> TrendDirection {
    if rounded > 0.0 {
        TrendDirection::Rising
    } else if rounded < 0.0 {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    }
}

/// Classify a delta. `None` and non-finite deltas yield a neutral result.
pub fn classify(delta: Option<f64>, thresholds: &TrendThresholds) -> TrendResult {
    let Some(raw) = delta.filter(|d| d.is_finite()) else {
        return TrendResult::neutral();
    };

    let rounded = round2(raw);
    // -0.0 after rounding a tiny negative delta
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    let direction = direction_of(rounded);

    let signed = if rounded > 0.0 {
        format!("+{rounded:.2}")
    } else {
        format!("{rounded:.2}")
    };

    TrendResult {
        delta: Some(rounded),
        direction: Some(direction),
        level: thresholds.grade(rounded.abs()),
        icon: direction.icon().to_string(),
        message: format!("{} {} {}", direction.icon(), signed, thresholds.unit),
    }
}
