//! Ambient Sensor Agent - indoor sensor and outdoor weather aggregation.
//!
//! This library merges pushes from a remote environmental sensor with
//! periodically refreshed outdoor weather, derives physical quantities
//! (heat index, dew point, sea-level pressure), classifies their trends and
//! turns the combination into comfort, mold, thermal-shock and pressure
//! advice.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       Ambient Sensor Agent                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌──────────────────┐   ┌──────────────────┐   │
//! │  │ Sensor feed │──▶│  DataController  │──▶│ ControllerEvent  │   │
//! │  │ (push/sub)  │   │ (cycles, timers) │   │    (channel)     │   │
//! │  └─────────────┘   └──────────────────┘   └──────────────────┘   │
//! │                       │      │       │                           │
//! │                       ▼      ▼       ▼                           │
//! │  ┌──────────────┐ ┌───────────┐ ┌────────────────────────────┐   │
//! │  │ WeatherCache │ │  Pressure │ │ Trends / Metrics /         │   │
//! │  │ (OWM, 15min) │ │  history  │ │ Recommendations            │   │
//! │  └──────────────┘ └───────────┘ └────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ambient_sensor_agent::{Config, ControllerEvent, DataController, MemoryFeed, MemoryHistoryStore};
//! use std::sync::Arc;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let feed = Arc::new(MemoryFeed::new());
//! let history = Arc::new(MemoryHistoryStore::new());
//! let controller = DataController::new(Config::default(), feed, history)?;
//!
//! let (_subscription, mut events) = controller.start()?;
//! while let Some(event) = events.recv().await {
//!     if let ControllerEvent::Recommendations(cards) = event {
//!         println!("{} cards", cards.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod core;
pub mod feed;
pub mod history;
pub mod stats;
pub mod weather;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use controller::{ConnectivityStatus, ControllerEvent, DataController, Subscription};
pub use core::{
    AlertLevel, IndoorReport, OutdoorTrends, RecommendationCard, RecommendationEngine, Topic,
    TrendDirection, TrendResult,
};
pub use feed::{FeedError, MemoryFeed, ReplayFeed, SensorFeed, SensorSnapshot};
pub use history::{
    FileHistoryStore, HistoryError, HistoryPruner, MemoryHistoryStore, PressureHistoryStore,
    PressureTrendAnalyzer,
};
pub use stats::{SessionStats, SharedSessionStats};
pub use weather::{OwmClient, WeatherCache, WeatherCacheEntry, WeatherError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
