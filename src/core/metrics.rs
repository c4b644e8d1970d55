//! Derived physical quantities and qualitative descriptors.
//!
//! All functions here are pure. Inputs are in °C, % relative humidity,
//! hPa and metres.

/// Reference altitude used when the device does not report its own.
pub const DEFAULT_ALTITUDE_M: f64 = 1490.0;

/// Heat index is the raw temperature below this value.
pub const HEAT_INDEX_THRESHOLD_C: f64 = 27.0;

// Magnus coefficients
const MAGNUS_A: f64 = 17.27;
const MAGNUS_B: f64 = 237.7;

/// Dew point via the Magnus approximation.
///
/// Returns `None` when humidity is not strictly positive (the formula takes
/// the log of the humidity ratio) or when an input is not finite.
pub fn dew_point(temp_c: f64, humidity: f64) -> Option<f64> {
    if !temp_c.is_finite() || !humidity.is_finite() || humidity <= 0.0 {
        return None;
    }
    let alpha = (MAGNUS_A * temp_c) / (MAGNUS_B + temp_c) + (humidity / 100.0).ln();
    Some((MAGNUS_B * alpha) / (MAGNUS_A - alpha))
}

/// Heat index ("feels like") in °C.
///
/// Uses the Rothfusz regression with Celsius coefficients. At temperatures
/// below [`HEAT_INDEX_THRESHOLD_C`] the temperature is returned unchanged.
pub fn heat_index(temp_c: f64, humidity: f64) -> f64 {
    if temp_c < HEAT_INDEX_THRESHOLD_C {
        return temp_c;
    }
    let t = temp_c;
    let h = humidity;
    -8.784_694_755_56 + 1.611_394_11 * t + 2.338_548_838_89 * h
        - 0.146_116_05 * t * h
        - 0.012_308_094 * t * t
        - 0.016_424_827_777_8 * h * h
        + 0.002_211_732 * t * t * h
        + 0.000_725_46 * t * h * h
        - 0.000_003_582 * t * t * h * h
}

/// Station pressure normalized to sea level with the barometric formula.
pub fn sea_level_pressure(pressure_hpa: f64, altitude_m: f64) -> f64 {
    pressure_hpa / (1.0 - altitude_m / 44_330.0).powf(5.255)
}

/// Label for the 1-5 air quality index.
pub fn aqi_label(index: i64) -> &'static str {
    match index {
        1 => "Good",
        2 => "Fair",
        3 => "Moderate",
        4 => "Poor",
        5 => "Very Poor",
        _ => "Unknown",
    }
}

/// Phrase for a 0.0-1.0 probability of precipitation.
pub fn describe_rain_probability(pop: f64) -> &'static str {
    let percent = pop * 100.0;
    if percent <= 10.0 {
        "🌞 Very unlikely"
    } else if percent <= 30.0 {
        "🌤️ Unlikely"
    } else if percent <= 60.0 {
        "🌦️ Likely"
    } else if percent <= 80.0 {
        "🌧️ Very likely"
    } else {
        "⛈️ Almost certain"
    }
}

/// How air at a given dew point feels.
pub fn describe_dew_point(dew_point_c: f64) -> &'static str {
    if dew_point_c < 10.0 {
        "Dry and comfortable air."
    } else if dew_point_c < 15.0 {
        "Comfortable air for most people."
    } else if dew_point_c < 18.0 {
        "Humidity becomes noticeable. A little sticky."
    } else if dew_point_c < 21.0 {
        "Humid and uncomfortable. Sweat does not evaporate easily."
    } else if dew_point_c < 24.0 {
        "Very humid and oppressive."
    } else {
        "Extremely humid, like a sauna."
    }
}
