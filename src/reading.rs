//! Reading and location types shared by the providers, the store and the
//! analyzers.
//!
//! Provider payloads are decoded into one typed struct per response shape and
//! wrapped in [`RawReading`]; everything downstream of the normalizer only sees
//! [`NormalizedReading`] or the flat [`StoredSample`] persisted by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Kind of monitored location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LocationType {
    Port,
    Route,
}

/// A monitored location. Reference data, created by the seed command only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_type: LocationType,
    pub timezone: String,
}

impl Location {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Canonical weather condition label.
///
/// Anything the labelling rules do not recognise is kept verbatim in
/// [`Condition::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Condition {
    Storm,
    Rain,
    Snow,
    Fog,
    Cloudy,
    Clear,
    Other(String),
}

impl Condition {
    pub fn as_str(&self) -> &str {
        match self {
            Condition::Storm => "Storm",
            Condition::Rain => "Rain",
            Condition::Snow => "Snow",
            Condition::Fog => "Fog",
            Condition::Cloudy => "Cloudy",
            Condition::Clear => "Clear",
            Condition::Other(code) => code,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Condition {
    fn from(code: &str) -> Self {
        crate::normalize::condition_label(code)
    }
}

impl From<String> for Condition {
    fn from(code: String) -> Self {
        Condition::from(code.as_str())
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        match condition {
            Condition::Other(code) => code,
            other => other.as_str().to_string(),
        }
    }
}

/// A reading in canonical units with a resolved condition label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedReading {
    pub observed_at: DateTime<Utc>,
    pub temp_c: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub precip_mm: Option<f64>,
    pub visibility_km: Option<f64>,
    pub condition: Condition,
    pub source: String,
}

/// A persisted observation. Flat so it maps one-to-one onto a CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSample {
    pub id: String,
    pub location_id: String,
    pub observed_at: DateTime<Utc>,
    pub temp_c: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub precip_mm: Option<f64>,
    pub visibility_km: Option<f64>,
    pub condition_code: String,
    pub source: Option<String>,
}

impl StoredSample {
    pub fn from_reading(id: String, location_id: &str, reading: &NormalizedReading) -> Self {
        Self {
            id,
            location_id: location_id.to_string(),
            observed_at: reading.observed_at,
            temp_c: reading.temp_c,
            wind_speed_ms: reading.wind_speed_ms,
            precip_mm: reading.precip_mm,
            visibility_km: reading.visibility_km,
            condition_code: reading.condition.to_string(),
            source: Some(reading.source.clone()),
        }
    }
}

/// One provider reading, tagged by the response shape it was decoded from.
#[derive(Debug, Clone)]
pub enum RawReading {
    OpenMeteo {
        observation: OpenMeteoObservation,
        fetched_at: DateTime<Utc>,
    },
    OpenWeatherMap {
        observation: OwmObservation,
        fetched_at: DateTime<Utc>,
    },
}

/// The `current` block of an Open-Meteo forecast response, or one row of its
/// `daily` block. Visibility is in metres, the weather code is WMO.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenMeteoObservation {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature_2m: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub wind_speed_10m: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub precipitation: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub visibility: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub weather_code: Option<f64>,
}

/// OpenWeatherMap `/data/2.5/weather` response (metric units).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwmObservation {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub dt: Option<f64>,
    #[serde(default)]
    pub main: Option<OwmMain>,
    #[serde(default)]
    pub wind: Option<OwmWind>,
    #[serde(default)]
    pub rain: Option<OwmPrecip>,
    #[serde(default)]
    pub snow: Option<OwmPrecip>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub visibility: Option<f64>,
    #[serde(default)]
    pub weather: Vec<OwmCondition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwmMain {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temp: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwmWind {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwmPrecip {
    #[serde(rename = "1h", default, deserialize_with = "lenient_f64")]
    pub one_hour: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwmCondition {
    #[serde(default)]
    pub main: Option<String>,
}

/// Accepts JSON numbers and numeric strings; anything else decodes as `None`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }))
}
