//! Configuration for the ambient sensor agent.

use crate::weather::OwmConfig;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `owm.api_key`.
pub const OWM_API_KEY_ENV: &str = "OWM_API_KEY";

const APP_DIR: &str = "ambient-sensor-agent";

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sensor identifier (device MAC without separators)
    pub sensor_id: String,

    /// Time without a push after which the sensor counts as offline
    #[serde(with = "duration_ms")]
    pub disconnect_threshold: Duration,

    /// Maximum age of cached weather data
    #[serde(with = "duration_ms")]
    pub weather_ttl: Duration,

    /// How often the weather refresh cycle runs
    #[serde(with = "duration_ms")]
    pub weather_refresh_interval: Duration,

    /// Maximum number of pressure history records kept after pruning
    pub pressure_retention_limit: usize,

    /// Number of most recent records (one per hour) in the trend window
    pub pressure_window_hours: usize,

    #[serde(with = "duration_ms")]
    pub pressure_analysis_interval: Duration,

    /// Delay after startup before the one-shot history prune
    #[serde(with = "duration_ms")]
    pub prune_delay: Duration,

    /// How often connectivity status is recomputed
    #[serde(with = "duration_ms")]
    pub connectivity_interval: Duration,

    /// Altitude used for sea-level pressure when the device reports none
    pub default_altitude_m: f64,

    /// IANA timezone for report times
    pub timezone: String,

    /// OpenWeatherMap settings
    pub owm: OwmConfig,

    /// Directory for the pressure history file
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            sensor_id: "68C63A87F36C".to_string(),
            disconnect_threshold: Duration::from_secs(16 * 60),
            weather_ttl: Duration::from_secs(15 * 60),
            weather_refresh_interval: Duration::from_secs(15 * 60),
            pressure_retention_limit: 20,
            pressure_window_hours: 4,
            pressure_analysis_interval: Duration::from_secs(60 * 60),
            prune_delay: Duration::from_secs(5),
            connectivity_interval: Duration::from_secs(5),
            default_altitude_m: crate::core::metrics::DEFAULT_ALTITUDE_M,
            timezone: "America/Bogota".to_string(),
            owm: OwmConfig::default(),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location, then apply
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a file, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Take the API key from `OWM_API_KEY` when it is set and not blank.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(OWM_API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.owm.api_key = Some(key);
            }
        }
    }

    /// The configured timezone.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }

    /// Check the values the controller cannot run with: the timezone and
    /// the timer periods, which must be non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;
        let periods = [
            ("weather_refresh_interval", self.weather_refresh_interval),
            ("pressure_analysis_interval", self.pressure_analysis_interval),
            ("connectivity_interval", self.connectivity_interval),
        ];
        match periods.into_iter().find(|(_, period)| period.is_zero()) {
            Some((name, _)) => Err(ConfigError::InvalidInterval(name)),
            None => Ok(()),
        }
    }

    /// Feed path of the configured sensor.
    pub fn sensor_path(&self) -> String {
        crate::feed::sensor_path(&self.sensor_id)
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),
    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),
    #[error("{0} must be greater than zero")]
    InvalidInterval(&'static str),
}

/// Serde support for Duration as whole milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
