//! Weather, air-quality and geocode payloads, and the snapshot assembled
//! from them.

use crate::core::metrics::{aqi_label, dew_point};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Raw API responses ───────────────────────────────────────────────

/// One Call forecast response (only the fields we read).
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub timezone: Option<String>,
    pub current: ForecastCurrent,
    #[serde(default)]
    pub hourly: Vec<PopEntry>,
    #[serde(default)]
    pub daily: Vec<PopEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastCurrent {
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub weather: Vec<ConditionDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionDescription {
    #[serde(default)]
    pub description: String,
}

/// Hourly or daily entry carrying a probability of precipitation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PopEntry {
    #[serde(default)]
    pub pop: Option<f64>,
}

/// Air pollution response.
#[derive(Debug, Clone, Deserialize)]
pub struct AirPollutionResponse {
    #[serde(default)]
    pub list: Vec<AirPollutionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirPollutionItem {
    pub main: AirPollutionMain,
    #[serde(default)]
    pub components: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirPollutionMain {
    pub aqi: i64,
}

/// Reverse geocode match.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoPlace {
    pub name: String,
}

// ── Assembled snapshot ──────────────────────────────────────────────

/// Maximum rain probabilities over the next hours and tomorrow (0.0-1.0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RainOutlook {
    pub next_3h: f64,
    pub next_6h: f64,
    pub tomorrow: f64,
}

impl RainOutlook {
    /// Build the outlook from hourly and daily forecast entries.
    ///
    /// Needs at least one hourly entry and two daily entries (today and
    /// tomorrow); otherwise every probability is zero.
    pub fn from_forecast(hourly: &[PopEntry], daily: &[PopEntry]) -> Self {
        if hourly.is_empty() || daily.len() < 2 {
            return Self::default();
        }

        let pops: Vec<f64> = hourly
            .iter()
            .take(6)
            .map(|h| h.pop.unwrap_or(0.0))
            .collect();
        let max_of = |values: &[f64]| values.iter().copied().fold(0.0_f64, f64::max);

        Self {
            next_3h: max_of(&pops[..pops.len().min(3)]),
            next_6h: max_of(&pops),
            tomorrow: daily[1].pop.unwrap_or(0.0),
        }
    }
}

/// Outdoor conditions at fetch time.
///
/// Values the API did not report stay `None`; they are never replaced by
/// zero, since 0 °C is a legitimate outdoor temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConditions {
    pub city: String,
    pub condition: String,
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub dew_point: Option<f64>,
    /// Probability of precipitation for the current hour
    pub rain_probability: f64,
    pub forecast: RainOutlook,
}

/// Air quality at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    pub index: Option<i64>,
    pub label: String,
    pub components: BTreeMap<String, f64>,
}

/// Everything fetched in one weather refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub current: WeatherConditions,
    pub air_quality: AirQuality,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Combine the three API responses into one snapshot.
    pub fn assemble(
        forecast: ForecastResponse,
        air: AirPollutionResponse,
        places: Vec<GeoPlace>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let city = places
            .into_iter()
            .next()
            .map(|p| p.name)
            .or(forecast.timezone)
            .unwrap_or_else(|| "-".to_string());

        let condition = forecast
            .current
            .weather
            .first()
            .map(|w| capitalize(&w.description))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "-".to_string());

        let temperature = forecast.current.temp;
        let humidity = forecast.current.humidity;
        let dew = match (temperature, humidity) {
            (Some(t), Some(h)) => dew_point(t, h),
            _ => None,
        };

        let current = WeatherConditions {
            city,
            condition,
            temperature,
            feels_like: forecast.current.feels_like,
            humidity,
            pressure: forecast.current.pressure,
            dew_point: dew,
            rain_probability: forecast
                .hourly
                .first()
                .and_then(|h| h.pop)
                .unwrap_or(0.0),
            forecast: RainOutlook::from_forecast(&forecast.hourly, &forecast.daily),
        };

        let air_quality = match air.list.into_iter().next() {
            Some(item) => AirQuality {
                index: Some(item.main.aqi),
                label: aqi_label(item.main.aqi).to_string(),
                components: item.components,
            },
            None => AirQuality {
                index: None,
                label: "Not available".to_string(),
                components: BTreeMap::new(),
            },
        };

        Self {
            current,
            air_quality,
            fetched_at,
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn forecast_json() -> serde_json::Value {
        json!({
            "timezone": "America/Bogota",
            "current": {
                "temp": 15.0, "feels_like": 14.2, "humidity": 85, "pressure": 1024,
                "weather": [{"description": "light rain"}]
            },
            "hourly": [{"pop": 0.2}, {"pop": 0.5}, {"pop": 0.1}, {"pop": 0.9}, {}, {"pop": 0.3}, {"pop": 1.0}],
            "daily": [{"pop": 0.4}, {"pop": 0.7}]
        })
    }

    #[test]
    fn test_assemble_snapshot() {
        let forecast: ForecastResponse = serde_json::from_value(forecast_json()).unwrap();
        let air: AirPollutionResponse = serde_json::from_value(json!({
            "list": [{"main": {"aqi": 2}, "components": {"pm2_5": 8.1}}]
        }))
        .unwrap();
        let places = vec![GeoPlace {
            name: "Bogotá".to_string(),
        }];

        let snapshot = WeatherSnapshot::assemble(forecast, air, places, Utc::now());
        assert_eq!(snapshot.current.city, "Bogotá");
        assert_eq!(snapshot.current.condition, "Light rain");
        assert_eq!(snapshot.current.temperature, Some(15.0));
        assert_eq!(snapshot.current.rain_probability, 0.2);
        assert!(snapshot.current.dew_point.is_some());
        assert_eq!(snapshot.air_quality.index, Some(2));
        assert_eq!(snapshot.air_quality.label, "Fair");
        assert_eq!(snapshot.air_quality.components.get("pm2_5"), Some(&8.1));

        let outlook = snapshot.current.forecast;
        assert_eq!(outlook.next_3h, 0.5);
        assert_eq!(outlook.next_6h, 0.9);
        assert_eq!(outlook.tomorrow, 0.7);
    }

    #[test]
    fn test_city_falls_back_to_timezone() {
        let forecast: ForecastResponse = serde_json::from_value(forecast_json()).unwrap();
        let air = AirPollutionResponse { list: vec![] };
        let snapshot = WeatherSnapshot::assemble(forecast, air, vec![], Utc::now());
        assert_eq!(snapshot.current.city, "America/Bogota");
        assert_eq!(snapshot.air_quality.label, "Not available");
        assert_eq!(snapshot.air_quality.index, None);
    }

    #[test]
    fn test_missing_temperature_stays_none() {
        let forecast: ForecastResponse =
            serde_json::from_value(json!({"current": {"humidity": 40}})).unwrap();
        let snapshot = WeatherSnapshot::assemble(
            forecast,
            AirPollutionResponse { list: vec![] },
            vec![],
            Utc::now(),
        );
        assert_eq!(snapshot.current.temperature, None);
        assert_eq!(snapshot.current.dew_point, None);
        assert_eq!(snapshot.current.city, "-");
        assert_eq!(snapshot.current.condition, "-");
    }

    #[test]
    fn test_outlook_needs_tomorrow() {
        let hourly = vec![PopEntry { pop: Some(0.8) }];
        let outlook = RainOutlook::from_forecast(&hourly, &[PopEntry::default()]);
        assert_eq!(outlook, RainOutlook::default());
    }

    #[test]
    fn test_forecast_without_current_is_rejected() {
        let result = serde_json::from_value::<ForecastResponse>(json!({"hourly": []}));
        assert!(result.is_err());
    }
}
