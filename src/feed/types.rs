//! Snapshot types pushed by the live sensor feed.
//!
//! Every push is a complete replacement of the previous one; nothing is
//! merged field by field.

use crate::core::clock::{epoch_to_utc, normalize_epoch_ms};
use crate::feed::FeedError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One indoor reading from the sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Temperature in °C
    pub temperature: f64,
    /// Relative humidity in %
    pub humidity: f64,
    /// Station (absolute) pressure in hPa
    pub pressure: f64,
    /// Epoch timestamp; seconds are accepted and normalized to milliseconds
    pub timestamp_ms: i64,
}

impl SensorReading {
    /// Timestamp in milliseconds regardless of how the device reported it.
    pub fn timestamp_millis(&self) -> i64 {
        normalize_epoch_ms(self.timestamp_ms)
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        epoch_to_utc(self.timestamp_ms)
    }

    fn is_finite(&self) -> bool {
        self.temperature.is_finite() && self.humidity.is_finite() && self.pressure.is_finite()
    }

    /// Positive and representable as a UTC instant.
    fn has_valid_timestamp(&self) -> bool {
        self.timestamp_millis() > 0 && self.observed_at().is_some()
    }
}

/// Network status reported by the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub ip: String,
    /// Wi-Fi RSSI in dBm
    pub signal_strength: i32,
    pub firmware_version: String,
}

/// Geographic position of the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// A full push from the sensor feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub current: SensorReading,
    pub previous: SensorReading,
    pub device_status: DeviceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Altitude in metres, when the device knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_m: Option<f64>,
    /// Friendly device name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SensorSnapshot {
    /// Parse a raw feed payload.
    ///
    /// Payloads missing required fields, carrying non-finite readings or
    /// carrying timestamps outside the representable range are rejected so
    /// the caller can keep serving the last good snapshot.
    pub fn from_payload(payload: serde_json::Value) -> Result<Self, FeedError> {
        let snapshot: SensorSnapshot =
            serde_json::from_value(payload).map_err(|e| FeedError::Malformed(e.to_string()))?;

        if !snapshot.current.is_finite() || !snapshot.previous.is_finite() {
            return Err(FeedError::Malformed(
                "reading contains a non-finite value".to_string(),
            ));
        }
        for reading in [&snapshot.current, &snapshot.previous] {
            if !reading.has_valid_timestamp() {
                return Err(FeedError::Malformed(format!(
                    "timestamp {} is out of range",
                    reading.timestamp_ms
                )));
            }
        }

        Ok(snapshot)
    }

    /// Altitude to use for sea-level normalization.
    pub fn altitude_or(&self, default_altitude_m: f64) -> f64 {
        self.altitude_m
            .filter(|a| a.is_finite())
            .unwrap_or(default_altitude_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> serde_json::Value {
        json!({
            "current": {"temperature": 22.5, "humidity": 65.0, "pressure": 850.2, "timestamp_ms": 1_705_935_600_000i64},
            "previous": {"temperature": 22.1, "humidity": 64.0, "pressure": 850.6, "timestamp_ms": 1_705_934_700_000i64},
            "device_status": {"ip": "192.168.1.20", "signal_strength": -61, "firmware_version": "1.4.2"},
            "location": {"lat": 4.71, "lon": -74.07}
        })
    }

    #[test]
    fn test_parse_full_payload() {
        let snapshot = SensorSnapshot::from_payload(payload()).unwrap();
        assert_eq!(snapshot.current.temperature, 22.5);
        assert_eq!(snapshot.device_status.signal_strength, -61);
        assert_eq!(snapshot.location, Some(Location { lat: 4.71, lon: -74.07 }));
        assert_eq!(snapshot.altitude_or(1490.0), 1490.0);
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        let mut value = payload();
        value.as_object_mut().unwrap().remove("previous");
        let err = SensorSnapshot::from_payload(value).unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    #[test]
    fn test_timestamp_in_seconds() {
        let mut value = payload();
        value["current"]["timestamp_ms"] = json!(1_705_935_600i64);
        let snapshot = SensorSnapshot::from_payload(value).unwrap();
        assert_eq!(snapshot.current.timestamp_millis(), 1_705_935_600_000);
    }

    #[test]
    fn test_out_of_range_timestamps_are_malformed() {
        for bad in [i64::MIN, -1, 0, i64::MAX] {
            let mut value = payload();
            value["current"]["timestamp_ms"] = json!(bad);
            let err = SensorSnapshot::from_payload(value).unwrap_err();
            assert!(matches!(err, FeedError::Malformed(_)), "accepted {bad}");
        }

        let mut value = payload();
        value["previous"]["timestamp_ms"] = json!(i64::MIN);
        assert!(SensorSnapshot::from_payload(value).is_err());
    }
}
