//! Per-topic advice cards.
//!
//! Cards are recomputed from scratch for every combination of indoor and
//! outdoor data. Each topic degrades on its own: a missing weather snapshot
//! turns the mold and thermal-shock cards into "waiting" cards, while the
//! comfort card only needs the indoor reading.

use crate::core::metrics::heat_index;
use crate::core::trend::{AlertLevel, TrendResult};
use crate::feed::SensorReading;
use crate::weather::WeatherConditions;
use serde::{Deserialize, Serialize};

/// Heat index above which the comfort card is danger.
pub const HOT_DANGER_C: f64 = 32.0;
/// Heat index above which the comfort card is caution.
pub const HOT_CAUTION_C: f64 = 27.0;
/// Indoor temperature below which the comfort card reports cold.
pub const COLD_C: f64 = 18.0;

pub const MOLD_DANGER_HUMIDITY: f64 = 70.0;
pub const MOLD_CAUTION_HUMIDITY: f64 = 60.0;
/// Humidity difference needed before advising to open or close windows.
pub const VENTILATION_BAND: f64 = 5.0;

pub const SHOCK_DANGER_C: f64 = 10.0;
pub const SHOCK_CAUTION_C: f64 = 5.0;

const WAITING_FOR_OUTDOOR: &str = "Waiting for outdoor data.";

/// What a card is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Comfort,
    Mold,
    ThermalShock,
    Pressure,
}

/// One piece of advice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationCard {
    pub topic: Topic,
    pub icon: String,
    pub message: String,
    pub level: AlertLevel,
}

impl RecommendationCard {
    fn new(topic: Topic, icon: &str, message: impl Into<String>, level: AlertLevel) -> Self {
        Self {
            topic,
            icon: icon.to_string(),
            message: message.into(),
            level,
        }
    }

    fn waiting(topic: Topic) -> Self {
        Self::new(topic, "⏳", WAITING_FOR_OUTDOOR, AlertLevel::Caution)
    }
}

/// Stateless card builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Build every card that can be built from the given inputs, in topic
    /// order.
    ///
    /// The thermal-shock card is left out when a weather snapshot exists but
    /// carries no outdoor temperature.
    pub fn evaluate(
        &self,
        sensor: &SensorReading,
        weather: Option<&WeatherConditions>,
        pressure: Option<&TrendResult>,
    ) -> Vec<RecommendationCard> {
        let mut cards = Vec::with_capacity(4);

        cards.push(self.comfort(sensor.temperature, sensor.humidity));

        match weather {
            Some(outdoor) => {
                cards.push(self.mold(sensor.humidity, outdoor.humidity));
                if let Some(card) = self.thermal_shock(sensor.temperature, outdoor.temperature) {
                    cards.push(card);
                }
            }
            None => {
                cards.push(RecommendationCard::waiting(Topic::Mold));
                cards.push(RecommendationCard::waiting(Topic::ThermalShock));
            }
        }

        cards.push(self.pressure(pressure));
        cards
    }

    pub fn comfort(&self, temperature: f64, humidity: f64) -> RecommendationCard {
        let feels_like = heat_index(temperature, humidity);

        if feels_like > HOT_DANGER_C {
            RecommendationCard::new(
                Topic::Comfort,
                "🥵",
                format!(
                    "Very hot! Feels like {feels_like:.1}°C. Consider using air conditioning."
                ),
                AlertLevel::Danger,
            )
        } else if feels_like > HOT_CAUTION_C {
            RecommendationCard::new(
                Topic::Comfort,
                "😅",
                format!("Warm indoors. Feels like {feels_like:.1}°C. Stay hydrated."),
                AlertLevel::Caution,
            )
        } else if temperature < COLD_C {
            RecommendationCard::new(
                Topic::Comfort,
                "🥶",
                "It is cold indoors. Consider turning on the heating.",
                AlertLevel::Caution,
            )
        } else {
            RecommendationCard::new(
                Topic::Comfort,
                "😊",
                "Thermal comfort is ideal. Enjoy!",
                AlertLevel::Good,
            )
        }
    }

    pub fn mold(&self, indoor: f64, outdoor: Option<f64>) -> RecommendationCard {
        let indoor_pct = indoor.round();
        let outdoor_drier = outdoor.filter(|o| *o < indoor);
        let outdoor_text = match outdoor {
            Some(o) => format!("{}%", o.round()),
            None => "unknown".to_string(),
        };

        if indoor > MOLD_DANGER_HUMIDITY {
            let advice = match outdoor_drier {
                Some(o) => format!(
                    "Outdoor air is drier ({}%), ventilate now to lower the humidity.",
                    o.round()
                ),
                None => format!(
                    "Consider a dehumidifier, outdoor humidity is {outdoor_text}."
                ),
            };
            RecommendationCard::new(
                Topic::Mold,
                "⚠️",
                format!("Indoor humidity is very high ({indoor_pct}%)! High mold risk. {advice}"),
                AlertLevel::Danger,
            )
        } else if indoor > MOLD_CAUTION_HUMIDITY {
            match outdoor_drier {
                Some(_) => RecommendationCard::new(
                    Topic::Mold,
                    "💨",
                    format!(
                        "Indoor humidity is elevated ({indoor_pct}%). Good time to ventilate and lower it."
                    ),
                    AlertLevel::Caution,
                ),
                None => RecommendationCard::new(
                    Topic::Mold,
                    "💧",
                    format!(
                        "Indoor humidity is elevated ({indoor_pct}%). Keep windows closed, outdoor humidity is {outdoor_text}."
                    ),
                    AlertLevel::Caution,
                ),
            }
        } else {
            match outdoor {
                Some(o) if o < indoor - VENTILATION_BAND => RecommendationCard::new(
                    Topic::Mold,
                    "👍",
                    format!(
                        "Outdoor air is drier ({}%). A good chance to ventilate without adding humidity.",
                        o.round()
                    ),
                    AlertLevel::Good,
                ),
                Some(o) if o > indoor + VENTILATION_BAND => RecommendationCard::new(
                    Topic::Mold,
                    "🚫",
                    format!(
                        "Outdoor air is very humid ({}%). Keep windows closed to preserve indoor comfort.",
                        o.round()
                    ),
                    AlertLevel::Caution,
                ),
                _ => RecommendationCard::new(
                    Topic::Mold,
                    "✅",
                    "Humidity is under control and balanced with outdoors. No action needed.",
                    AlertLevel::Good,
                ),
            }
        }
    }

    /// `None` when the outdoor temperature is unknown. 0 °C is a valid
    /// outdoor temperature.
    pub fn thermal_shock(&self, indoor: f64, outdoor: Option<f64>) -> Option<RecommendationCard> {
        let Some(outdoor) = outdoor else {
            tracing::debug!("No outdoor temperature, skipping thermal shock card");
            return None;
        };
        let difference = (indoor - outdoor).abs();

        let card = if difference > SHOCK_DANGER_C {
            RecommendationCard::new(
                Topic::ThermalShock,
                "🧥",
                format!(
                    "Careful! There is a {difference:.1}°C difference with outdoors. Dress warmly when going out."
                ),
                AlertLevel::Danger,
            )
        } else if difference > SHOCK_CAUTION_C {
            RecommendationCard::new(
                Topic::ThermalShock,
                "🧣",
                format!("Noticeable {difference:.1}°C difference with outdoors. Keep it in mind."),
                AlertLevel::Caution,
            )
        } else {
            RecommendationCard::new(
                Topic::ThermalShock,
                "✅",
                "Indoor temperature is similar to outdoors.",
                AlertLevel::Good,
            )
        };
        Some(card)
    }

    pub fn pressure(&self, trend: Option<&TrendResult>) -> RecommendationCard {
        match trend {
            Some(result) => {
                let icon = if result.icon.is_empty() {
                    "📊"
                } else {
                    result.icon.as_str()
                };
                RecommendationCard::new(Topic::Pressure, icon, result.message.clone(), result.level)
            }
            None => RecommendationCard::new(
                Topic::Pressure,
                "📊",
                "Calculating...",
                AlertLevel::Caution,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::RainOutlook;

    fn sensor(temperature: f64, humidity: f64) -> SensorReading {
        SensorReading {
            temperature,
            humidity,
            pressure: 850.0,
            timestamp_ms: 1_705_917_600_000,
        }
    }

    fn outdoor(temperature: Option<f64>, humidity: Option<f64>) -> WeatherConditions {
        WeatherConditions {
            city: "Bogotá".to_string(),
            condition: "Light rain".to_string(),
            temperature,
            feels_like: None,
            humidity,
            pressure: Some(1024.0),
            dew_point: None,
            rain_probability: 0.2,
            forecast: RainOutlook::default(),
        }
    }

    fn card(cards: &[RecommendationCard], topic: Topic) -> Option<&RecommendationCard> {
        cards.iter().find(|c| c.topic == topic)
    }

    #[test]
    fn test_mild_indoor_cool_outdoor() {
        let engine = RecommendationEngine::new();
        let weather = outdoor(Some(15.0), Some(85.0));
        let cards = engine.evaluate(&sensor(22.5, 65.0), Some(&weather), None);

        assert_eq!(card(&cards, Topic::Comfort).unwrap().level, AlertLevel::Good);
        assert_ne!(card(&cards, Topic::Mold).unwrap().level, AlertLevel::Danger);

        let shock = card(&cards, Topic::ThermalShock).unwrap();
        assert_eq!(shock.level, AlertLevel::Caution);
        assert!(shock.message.contains("7.5°C"));
    }

    #[test]
    fn test_humid_indoor_dry_outdoor_says_ventilate() {
        let engine = RecommendationEngine::new();
        let weather = outdoor(Some(15.0), Some(50.0));
        let cards = engine.evaluate(&sensor(22.0, 75.0), Some(&weather), None);

        let mold = card(&cards, Topic::Mold).unwrap();
        assert_eq!(mold.level, AlertLevel::Danger);
        assert!(mold.message.contains("ventilate"));
    }

    #[test]
    fn test_humid_indoor_humid_outdoor_suggests_dehumidifier() {
        let mold = RecommendationEngine::new().mold(75.0, Some(90.0));
        assert_eq!(mold.level, AlertLevel::Danger);
        assert!(mold.message.contains("dehumidifier"));
    }

    #[test]
    fn test_mold_caution_branches() {
        let engine = RecommendationEngine::new();
        assert_eq!(engine.mold(65.0, Some(40.0)).icon, "💨");
        assert_eq!(engine.mold(65.0, Some(80.0)).icon, "💧");
        assert_eq!(engine.mold(65.0, None).icon, "💧");
        assert_eq!(engine.mold(70.0, Some(40.0)).level, AlertLevel::Caution);
    }

    #[test]
    fn test_mold_hysteresis_band() {
        let engine = RecommendationEngine::new();

        let open = engine.mold(55.0, Some(45.0));
        assert_eq!((open.icon.as_str(), open.level), ("👍", AlertLevel::Good));

        let close = engine.mold(50.0, Some(60.0));
        assert_eq!((close.icon.as_str(), close.level), ("🚫", AlertLevel::Caution));

        // inside the band: no advice either way
        assert_eq!(engine.mold(50.0, Some(54.0)).icon, "✅");
        assert_eq!(engine.mold(50.0, Some(45.0)).icon, "✅");
        assert_eq!(engine.mold(50.0, None).icon, "✅");
    }

    #[test]
    fn test_comfort_levels() {
        let engine = RecommendationEngine::new();
        assert_eq!(engine.comfort(35.0, 60.0).level, AlertLevel::Danger);
        assert_eq!(engine.comfort(28.0, 40.0).level, AlertLevel::Caution);
        let cold = engine.comfort(16.0, 50.0);
        assert_eq!((cold.icon.as_str(), cold.level), ("🥶", AlertLevel::Caution));
        assert_eq!(engine.comfort(21.0, 50.0).level, AlertLevel::Good);
    }

    #[test]
    fn test_zero_degrees_outdoor_is_valid() {
        let engine = RecommendationEngine::new();
        let shock = engine.thermal_shock(21.0, Some(0.0)).unwrap();
        assert_eq!(shock.level, AlertLevel::Danger);
        assert!(shock.message.contains("21.0°C"));

        assert_eq!(
            engine.thermal_shock(21.0, Some(18.0)).unwrap().level,
            AlertLevel::Good
        );
    }

    #[test]
    fn test_unknown_outdoor_temperature_skips_card() {
        let engine = RecommendationEngine::new();
        let weather = outdoor(None, Some(60.0));
        let cards = engine.evaluate(&sensor(22.0, 50.0), Some(&weather), None);

        assert!(card(&cards, Topic::ThermalShock).is_none());
        assert!(card(&cards, Topic::Mold).is_some());
        assert_eq!(cards.len(), 3);
    }

    #[test]
    fn test_without_weather_cards_wait() {
        let engine = RecommendationEngine::new();
        let cards = engine.evaluate(&sensor(22.0, 50.0), None, None);

        assert_eq!(cards.len(), 4);
        assert_eq!(card(&cards, Topic::Comfort).unwrap().level, AlertLevel::Good);
        for topic in [Topic::Mold, Topic::ThermalShock] {
            let waiting = card(&cards, topic).unwrap();
            assert_eq!(waiting.level, AlertLevel::Caution);
            assert_eq!(waiting.message, WAITING_FOR_OUTDOOR);
        }
        let pressure = card(&cards, Topic::Pressure).unwrap();
        assert_eq!(pressure.message, "Calculating...");
        assert_eq!(pressure.level, AlertLevel::Caution);
    }

    #[test]
    fn test_pressure_card_uses_trend() {
        let engine = RecommendationEngine::new();
        let trend = TrendResult {
            delta: Some(-2.0),
            direction: None,
            level: AlertLevel::Danger,
            icon: "🌧️".to_string(),
            message: "Falling fast".to_string(),
        };
        let card = engine.pressure(Some(&trend));
        assert_eq!(card.icon, "🌧️");
        assert_eq!(card.level, AlertLevel::Danger);

        let bare = TrendResult {
            icon: String::new(),
            ..trend
        };
        assert_eq!(engine.pressure(Some(&bare)).icon, "📊");
    }
}
