//! Severity flag and 0–100 risk score for a single reading.

use crate::reading::{Condition, NormalizedReading};

/// Visibility assumed when a reading has none. Missing visibility is scored
/// as clear; this is a scoring policy, not something derived from the data.
pub const DEFAULT_VISIBILITY_KM: f64 = 10.0;

/// Returns `true` when the reading crosses an operationally dangerous
/// threshold. Missing numeric fields count as `0`.
///
/// | Field         | Severe when  |
/// |---------------|--------------|
/// | wind          | >= 20 m/s    |
/// | precipitation | >= 15 mm     |
/// | temperature   | <= -10 °C    |
/// | temperature   | >= 42 °C     |
/// | condition     | `Storm`      |
pub fn is_severe(reading: &NormalizedReading) -> bool {
    let wind = reading.wind_speed_ms.unwrap_or(0.0);
    let precip = reading.precip_mm.unwrap_or(0.0);
    let temp = reading.temp_c.unwrap_or(0.0);

    wind >= 20.0
        || precip >= 15.0
        || temp <= -10.0
        || temp >= 42.0
        || reading.condition == Condition::Storm
}

/// Additive risk score, rounded and clamped to `0..=100`.
///
/// Each term is capped on its own: wind up to 40 (at 30 m/s), precipitation
/// up to 30 (at 20 mm), temperature extremity 10 or 20, poor visibility 10 or
/// 20.
pub fn risk_score(reading: &NormalizedReading) -> u8 {
    let wind = wind_term(reading.wind_speed_ms.unwrap_or(0.0));
    let precip = precip_term(reading.precip_mm.unwrap_or(0.0));
    let temp = temp_term(reading.temp_c.unwrap_or(0.0));
    let visibility = visibility_term(reading.visibility_km.unwrap_or(DEFAULT_VISIBILITY_KM));

    let total = wind + precip + temp + visibility;
    total.round().clamp(0.0, 100.0) as u8
}

fn wind_term(wind_ms: f64) -> f64 {
    (wind_ms / 30.0 * 40.0).min(40.0)
}

fn precip_term(precip_mm: f64) -> f64 {
    (precip_mm / 20.0 * 30.0).min(30.0)
}

fn temp_term(temp_c: f64) -> f64 {
    match temp_c {
        t if t < -5.0 || t > 35.0 => 20.0,
        t if t < 0.0 || t > 30.0 => 10.0,
        _ => 0.0,
    }
}

fn visibility_term(visibility_km: f64) -> f64 {
    match visibility_km {
        v if v < 1.0 => 20.0,
        v if v < 3.0 => 10.0,
        _ => 0.0,
    }
}
