//! Pure computations of the agent.
//!
//! This module contains:
//! - Trend classification of reading deltas
//! - Derived physical quantities (heat index, dew point, sea-level pressure)
//! - Indoor and outdoor trend reports
//! - Recommendation cards
//! - Report time formatting

pub mod clock;
pub mod metrics;
pub mod recommend;
pub mod report;
pub mod trend;

// Re-export commonly used types
pub use recommend::{RecommendationCard, RecommendationEngine, Topic};
pub use report::{IndoorReport, IndoorTrends, OutdoorTrends};
pub use trend::{classify, AlertLevel, TrendDirection, TrendResult, TrendThresholds};
