//! Outdoor weather: API seam, OpenWeatherMap client, snapshot types and
//! the time-boxed cache.

pub mod cache;
pub mod client;
pub mod types;

pub use cache::{WeatherCache, WeatherCacheEntry};
pub use client::{OwmClient, OwmConfig, WeatherApi};
pub use types::{AirQuality, RainOutlook, WeatherConditions, WeatherSnapshot};

/// Any failure while fetching outdoor data.
///
/// Callers treat every variant the same way: no weather data right now.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WeatherError {
    #[error("weather network error: {0}")]
    Network(String),
    #[error("weather endpoint {endpoint} returned HTTP {status}")]
    Status { status: u16, endpoint: String },
    #[error("weather endpoint {endpoint} returned malformed JSON: {message}")]
    Parse { endpoint: String, message: String },
    #[error("no OpenWeatherMap API key configured")]
    MissingApiKey,
}
