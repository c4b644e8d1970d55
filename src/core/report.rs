//! Indoor and outdoor trend reports.
//!
//! An [`IndoorReport`] is derived from every sensor push (current vs the
//! device's own previous reading). [`OutdoorTrends`] compares two committed
//! weather snapshots.

use crate::core::metrics::{dew_point, heat_index, sea_level_pressure};
use crate::core::trend::{classify, TrendResult, TrendThresholds};
use crate::feed::{SensorReading, SensorSnapshot};
use crate::weather::WeatherConditions;
use serde::{Deserialize, Serialize};

/// Trends between the current and previous indoor readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndoorTrends {
    pub temperature: TrendResult,
    pub humidity: TrendResult,
    pub heat_index: TrendResult,
    pub sea_level_pressure: TrendResult,
}

/// Derived values for one sensor push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndoorReport {
    pub heat_index: f64,
    pub sea_level_pressure: f64,
    /// `None` when humidity is zero
    pub dew_point: Option<f64>,
    pub trends: IndoorTrends,
}

impl IndoorReport {
    pub fn from_snapshot(snapshot: &SensorSnapshot, default_altitude_m: f64) -> Self {
        let altitude = snapshot.altitude_or(default_altitude_m);
        let current = &snapshot.current;
        let previous = &snapshot.previous;

        let hi = |r: &SensorReading| heat_index(r.temperature, r.humidity);
        let slp = |r: &SensorReading| sea_level_pressure(r.pressure, altitude);

        let trends = IndoorTrends {
            temperature: classify(
                Some(current.temperature - previous.temperature),
                &TrendThresholds::TEMPERATURE,
            ),
            humidity: classify(
                Some(current.humidity - previous.humidity),
                &TrendThresholds::HUMIDITY,
            ),
            heat_index: classify(
                Some(hi(current) - hi(previous)),
                &TrendThresholds::TEMPERATURE,
            ),
            sea_level_pressure: classify(
                Some(slp(current) - slp(previous)),
                &TrendThresholds::PRESSURE,
            ),
        };

        Self {
            heat_index: hi(current),
            sea_level_pressure: slp(current),
            dew_point: dew_point(current.temperature, current.humidity),
            trends,
        }
    }
}

/// Trends between two consecutive weather snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutdoorTrends {
    pub temperature: TrendResult,
    pub dew_point: TrendResult,
    pub pressure: TrendResult,
}

impl OutdoorTrends {
    /// Compare `current` against `previous`. A value missing on either side
    /// gives a neutral trend for that quantity.
    pub fn between(current: &WeatherConditions, previous: &WeatherConditions) -> Self {
        let delta = |now: Option<f64>, before: Option<f64>| now.zip(before).map(|(a, b)| a - b);

        Self {
            temperature: classify(
                delta(current.temperature, previous.temperature),
                &TrendThresholds::TEMPERATURE,
            ),
            dew_point: classify(
                delta(current.dew_point, previous.dew_point),
                &TrendThresholds::TEMPERATURE,
            ),
            pressure: classify(
                delta(current.pressure, previous.pressure),
                &TrendThresholds::PRESSURE,
            ),
        }
    }
}
