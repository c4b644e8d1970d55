//! OpenWeatherMap client.

use crate::weather::types::{AirPollutionResponse, ForecastResponse, GeoPlace};
use crate::weather::WeatherError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The three remote calls a weather refresh needs.
#[async_trait]
pub trait WeatherApi: Send + Sync {
    /// Current conditions plus hourly/daily forecast.
    async fn forecast(&self, lat: f64, lon: f64) -> Result<ForecastResponse, WeatherError>;

    /// Air quality index and pollutant components.
    async fn air_quality(&self, lat: f64, lon: f64) -> Result<AirPollutionResponse, WeatherError>;

    /// Place names near the coordinates, best match first.
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Vec<GeoPlace>, WeatherError>;
}

/// OpenWeatherMap settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OwmConfig {
    /// API key; the `OWM_API_KEY` environment variable takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Language for condition descriptions
    pub language: String,
    /// "metric" gives °C
    pub units: String,
}

impl Default for OwmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openweathermap.org".to_string(),
            language: "en".to_string(),
            units: "metric".to_string(),
        }
    }
}

impl OwmConfig {
    pub fn forecast_url(&self) -> String {
        format!("{}/data/3.0/onecall", self.base_url.trim_end_matches('/'))
    }

    pub fn air_quality_url(&self) -> String {
        format!("{}/data/2.5/air_pollution", self.base_url.trim_end_matches('/'))
    }

    pub fn geocode_url(&self) -> String {
        format!("{}/geo/1.0/reverse", self.base_url.trim_end_matches('/'))
    }
}

/// HTTP client for OpenWeatherMap.
pub struct OwmClient {
    config: OwmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OwmClient {
    /// Create a client. Fails when no API key is configured.
    pub fn new(config: OwmConfig) -> Result<Self, WeatherError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(WeatherError::MissingApiKey)?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WeatherError::Network(e.to_string()))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status {
                status: status.as_u16(),
                endpoint: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::Network(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| WeatherError::Parse {
            endpoint: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl WeatherApi for OwmClient {
    async fn forecast(&self, lat: f64, lon: f64) -> Result<ForecastResponse, WeatherError> {
        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("exclude", "minutely,alerts".to_string()),
            ("units", self.config.units.clone()),
            ("lang", self.config.language.clone()),
        ];
        self.get_json(&self.config.forecast_url(), &query).await
    }

    async fn air_quality(&self, lat: f64, lon: f64) -> Result<AirPollutionResponse, WeatherError> {
        let query = [("lat", lat.to_string()), ("lon", lon.to_string())];
        self.get_json(&self.config.air_quality_url(), &query).await
    }

    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Vec<GeoPlace>, WeatherError> {
        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("limit", "1".to_string()),
        ];
        self.get_json(&self.config.geocode_url(), &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let config = OwmConfig {
            base_url: "http://127.0.0.1:9000/".to_string(),
            ..OwmConfig::default()
        };
        assert_eq!(config.forecast_url(), "http://127.0.0.1:9000/data/3.0/onecall");
        assert_eq!(
            config.air_quality_url(),
            "http://127.0.0.1:9000/data/2.5/air_pollution"
        );
        assert_eq!(config.geocode_url(), "http://127.0.0.1:9000/geo/1.0/reverse");
    }

    #[test]
    fn test_client_requires_api_key() {
        assert!(matches!(
            OwmClient::new(OwmConfig::default()),
            Err(WeatherError::MissingApiKey)
        ));

        let config = OwmConfig {
            api_key: Some("  ".to_string()),
            ..OwmConfig::default()
        };
        assert!(matches!(
            OwmClient::new(config),
            Err(WeatherError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let config = OwmConfig {
            api_key: Some("key".to_string()),
            // nothing listens on the discard port
            base_url: "http://127.0.0.1:9".to_string(),
            ..OwmConfig::default()
        };
        let client = OwmClient::new(config).unwrap();
        let err = client.air_quality(4.7, -74.0).await.unwrap_err();
        assert!(matches!(err, WeatherError::Network(_)));
    }
}
