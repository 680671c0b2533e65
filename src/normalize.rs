//! Conversion of provider payloads and stored samples into
//! [`NormalizedReading`]s.
//!
//! Every numeric field goes through [`to_finite_or_null`], so no NaN or
//! infinity ever reaches the scorer or the aggregators.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::reading::{Condition, NormalizedReading, RawReading, StoredSample};

pub const UNKNOWN_SOURCE: &str = "unknown";
pub const OPEN_METEO_SOURCE: &str = "open-meteo";
pub const OPENWEATHERMAP_SOURCE: &str = "openweathermap";

/// Condition code used when a provider reports none.
pub const UNKNOWN_CONDITION: &str = "unknown";

/// Substring rules in priority order. The first match wins.
static CONDITION_RULES: &[(&[&str], Condition)] = &[
    (&["storm", "thunder"], Condition::Storm),
    (&["rain"], Condition::Rain),
    (&["snow"], Condition::Snow),
    (&["fog", "mist"], Condition::Fog),
    (&["cloud"], Condition::Cloudy),
    (&["clear"], Condition::Clear),
];

/// Drops missing, NaN and infinite values.
pub fn to_finite_or_null(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Maps a provider condition code to a [`Condition`].
///
/// Matching is case-insensitive on substrings, in the order storm/thunder,
/// rain, snow, fog/mist, cloud, clear. Codes matching none of them are kept
/// verbatim.
pub fn condition_label(code: &str) -> Condition {
    let lowered = code.to_lowercase();

    CONDITION_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(_, condition)| condition.clone())
        .unwrap_or_else(|| Condition::Other(code.to_string()))
}

/// Describes a WMO weather interpretation code as used by Open-Meteo.
pub fn wmo_description(code: i64) -> Option<&'static str> {
    let text = match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast clouds",
        45 | 48 => "fog",
        51 | 53 | 55 => "drizzle (light rain)",
        56 | 57 => "freezing drizzle (light rain)",
        61 | 63 | 65 => "rain",
        66 | 67 => "freezing rain",
        71 | 73 | 75 => "snow fall",
        77 => "snow grains",
        80..=82 => "rain showers",
        85 | 86 => "snow showers",
        95 => "thunderstorm",
        96 | 99 => "thunderstorm with hail",
        _ => return None,
    };
    Some(text)
}

/// Normalizes one provider reading.
///
/// The provider's observation time is used when present and parseable,
/// otherwise the instant the reading was fetched.
pub fn normalize(raw: &RawReading) -> NormalizedReading {
    match raw {
        RawReading::OpenMeteo {
            observation,
            fetched_at,
        } => {
            let code = match to_finite_or_null(observation.weather_code) {
                Some(code) => {
                    let code = code as i64;
                    wmo_description(code)
                        .map(str::to_string)
                        .unwrap_or_else(|| code.to_string())
                }
                None => UNKNOWN_CONDITION.to_string(),
            };

            NormalizedReading {
                observed_at: observation
                    .time
                    .as_deref()
                    .and_then(parse_observed_at)
                    .unwrap_or(*fetched_at),
                temp_c: to_finite_or_null(observation.temperature_2m),
                wind_speed_ms: to_finite_or_null(observation.wind_speed_10m),
                precip_mm: to_finite_or_null(observation.precipitation),
                visibility_km: metres_to_km(observation.visibility),
                condition: condition_label(&code),
                source: OPEN_METEO_SOURCE.to_string(),
            }
        }
        RawReading::OpenWeatherMap {
            observation,
            fetched_at,
        } => {
            let rain = observation.rain.as_ref().and_then(|r| r.one_hour);
            let snow = observation.snow.as_ref().and_then(|s| s.one_hour);
            let code = observation
                .weather
                .first()
                .and_then(|w| w.main.as_deref())
                .unwrap_or(UNKNOWN_CONDITION);

            NormalizedReading {
                observed_at: to_finite_or_null(observation.dt)
                    .and_then(|dt| DateTime::from_timestamp(dt as i64, 0))
                    .unwrap_or(*fetched_at),
                temp_c: to_finite_or_null(observation.main.as_ref().and_then(|m| m.temp)),
                wind_speed_ms: to_finite_or_null(observation.wind.as_ref().and_then(|w| w.speed)),
                precip_mm: to_finite_or_null(Some(rain.or(snow).unwrap_or(0.0))),
                visibility_km: metres_to_km(observation.visibility),
                condition: condition_label(code),
                source: OPENWEATHERMAP_SOURCE.to_string(),
            }
        }
    }
}

/// Re-normalizes a stored sample read back from the store.
pub fn normalize_sample(sample: &StoredSample) -> NormalizedReading {
    NormalizedReading {
        observed_at: sample.observed_at,
        temp_c: to_finite_or_null(sample.temp_c),
        wind_speed_ms: to_finite_or_null(sample.wind_speed_ms),
        precip_mm: to_finite_or_null(sample.precip_mm),
        visibility_km: to_finite_or_null(sample.visibility_km),
        condition: condition_label(&sample.condition_code),
        source: sample
            .source
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_SOURCE)
            .to_string(),
    }
}

fn metres_to_km(value: Option<f64>) -> Option<f64> {
    to_finite_or_null(value).map(|m| m / 1000.0)
}

/// Parses RFC 3339, Open-Meteo's zone-less `YYYY-MM-DDTHH:MM` (UTC), or a bare
/// date (midnight UTC).
fn parse_observed_at(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{
        OpenMeteoObservation, OwmCondition, OwmMain, OwmObservation, OwmPrecip, OwmWind,
    };
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_finite_filter() {
        assert_eq!(to_finite_or_null(Some(1.5)), Some(1.5));
        assert_eq!(to_finite_or_null(Some(f64::NAN)), None);
        assert_eq!(to_finite_or_null(Some(f64::INFINITY)), None);
        assert_eq!(to_finite_or_null(Some(f64::NEG_INFINITY)), None);
        assert_eq!(to_finite_or_null(None), None);
    }

    #[test]
    fn test_condition_label_rules() {
        assert_eq!(condition_label("Thunderstorm"), Condition::Storm);
        assert_eq!(condition_label("light RAIN"), Condition::Rain);
        assert_eq!(condition_label("Snow"), Condition::Snow);
        assert_eq!(condition_label("Mist"), Condition::Fog);
        assert_eq!(condition_label("Clouds"), Condition::Cloudy);
        assert_eq!(condition_label("Clear"), Condition::Clear);
        assert_eq!(condition_label("Haze"), Condition::Other("Haze".to_string()));
    }

    #[test]
    fn test_condition_label_priority() {
        assert_eq!(condition_label("rain storm"), Condition::Storm);
        assert_eq!(condition_label("rain clouds"), Condition::Rain);
        assert_eq!(condition_label("snow fog"), Condition::Snow);
        assert_eq!(condition_label("misty clear"), Condition::Fog);
    }

    #[test]
    fn test_condition_label_is_idempotent() {
        for label in ["Storm", "Rain", "Snow", "Fog", "Cloudy", "Clear", "61"] {
            assert_eq!(condition_label(label).as_str(), label);
        }
    }

    #[test]
    fn test_normalize_open_meteo_current() {
        let raw = RawReading::OpenMeteo {
            observation: OpenMeteoObservation {
                time: Some("2024-05-01T12:00".to_string()),
                temperature_2m: Some(18.0),
                wind_speed_10m: Some(f64::NAN),
                precipitation: None,
                visibility: Some(2500.0),
                weather_code: Some(63.0),
            },
            fetched_at: fetched_at(),
        };

        let reading = normalize(&raw);

        assert_eq!(
            reading.observed_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(reading.temp_c, Some(18.0));
        assert_eq!(reading.wind_speed_ms, None);
        assert_eq!(reading.precip_mm, None);
        assert_eq!(reading.visibility_km, Some(2.5));
        assert_eq!(reading.condition, Condition::Rain);
        assert_eq!(reading.source, OPEN_METEO_SOURCE);
    }

    #[test]
    fn test_normalize_open_meteo_unknown_code_and_time() {
        let raw = RawReading::OpenMeteo {
            observation: OpenMeteoObservation {
                time: Some("not a time".to_string()),
                weather_code: Some(42.0),
                ..Default::default()
            },
            fetched_at: fetched_at(),
        };

        let reading = normalize(&raw);

        assert_eq!(reading.observed_at, fetched_at());
        assert_eq!(reading.condition, Condition::Other("42".to_string()));
        assert_eq!(reading.visibility_km, None);
    }

    #[test]
    fn test_normalize_open_meteo_daily_row() {
        let raw = RawReading::OpenMeteo {
            observation: OpenMeteoObservation {
                time: Some("2024-04-28".to_string()),
                weather_code: Some(95.0),
                ..Default::default()
            },
            fetched_at: fetched_at(),
        };

        let reading = normalize(&raw);

        assert_eq!(
            reading.observed_at,
            Utc.with_ymd_and_hms(2024, 4, 28, 0, 0, 0).unwrap()
        );
        assert_eq!(reading.condition, Condition::Storm);
    }

    #[test]
    fn test_normalize_owm_precip_fallbacks() {
        let base = OwmObservation {
            dt: Some(1714564800.0),
            main: Some(OwmMain { temp: Some(-3.0) }),
            weather: vec![OwmCondition {
                main: Some("Snow".to_string()),
            }],
            ..Default::default()
        };

        let no_precip = normalize(&RawReading::OpenWeatherMap {
            observation: base.clone(),
            fetched_at: fetched_at(),
        });
        assert_eq!(no_precip.precip_mm, Some(0.0));
        assert_eq!(no_precip.condition, Condition::Snow);
        assert_eq!(no_precip.observed_at.timestamp(), 1714564800);

        let snow_only = normalize(&RawReading::OpenWeatherMap {
            observation: OwmObservation {
                snow: Some(OwmPrecip {
                    one_hour: Some(1.2),
                }),
                ..base.clone()
            },
            fetched_at: fetched_at(),
        });
        assert_eq!(snow_only.precip_mm, Some(1.2));

        let both = normalize(&RawReading::OpenWeatherMap {
            observation: OwmObservation {
                rain: Some(OwmPrecip {
                    one_hour: Some(4.0),
                }),
                snow: Some(OwmPrecip {
                    one_hour: Some(1.2),
                }),
                ..base
            },
            fetched_at: fetched_at(),
        });
        assert_eq!(both.precip_mm, Some(4.0));
    }

    #[test]
    fn test_normalize_owm_empty_payload() {
        let reading = normalize(&RawReading::OpenWeatherMap {
            observation: OwmObservation::default(),
            fetched_at: fetched_at(),
        });

        assert_eq!(reading.observed_at, fetched_at());
        assert_eq!(reading.temp_c, None);
        assert_eq!(reading.wind_speed_ms, None);
        assert_eq!(reading.condition, Condition::Other(UNKNOWN_CONDITION.to_string()));
        assert_eq!(reading.source, OPENWEATHERMAP_SOURCE);
    }

    #[test]
    fn test_normalize_sample_defaults_source_and_drops_nan() {
        let sample = StoredSample {
            id: "s1".to_string(),
            location_id: "rotterdam-port".to_string(),
            observed_at: fetched_at(),
            temp_c: Some(f64::NAN),
            wind_speed_ms: None,
            precip_mm: Some(0.4),
            visibility_km: Some(f64::INFINITY),
            condition_code: "overcast clouds".to_string(),
            source: None,
        };

        let reading = normalize_sample(&sample);

        assert_eq!(reading.temp_c, None);
        assert_eq!(reading.wind_speed_ms, None);
        assert_eq!(reading.precip_mm, Some(0.4));
        assert_eq!(reading.visibility_km, None);
        assert_eq!(reading.condition, Condition::Cloudy);
        assert_eq!(reading.source, UNKNOWN_SOURCE);
    }

    fn any_field() -> impl Strategy<Value = Option<f64>> {
        prop_oneof![
            Just(None),
            Just(Some(f64::NAN)),
            Just(Some(f64::INFINITY)),
            Just(Some(f64::NEG_INFINITY)),
            any::<f64>().prop_map(Some),
        ]
    }

    fn assert_all_finite(reading: &NormalizedReading) -> Result<(), TestCaseError> {
        for value in [
            reading.temp_c,
            reading.wind_speed_ms,
            reading.precip_mm,
            reading.visibility_km,
        ]
        .into_iter()
        .flatten()
        {
            prop_assert!(value.is_finite(), "non-finite value {value}");
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_open_meteo_never_yields_non_finite(
            temp in any_field(),
            wind in any_field(),
            precip in any_field(),
            visibility in any_field(),
            code in any_field(),
        ) {
            let reading = normalize(&RawReading::OpenMeteo {
                observation: OpenMeteoObservation {
                    time: None,
                    temperature_2m: temp,
                    wind_speed_10m: wind,
                    precipitation: precip,
                    visibility,
                    weather_code: code,
                },
                fetched_at: fetched_at(),
            });

            assert_all_finite(&reading)?;
            prop_assert_eq!(reading.observed_at, fetched_at());
        }

        #[test]
        fn prop_openweathermap_never_yields_non_finite(
            dt in any_field(),
            temp in any_field(),
            wind in any_field(),
            rain in any_field(),
            snow in any_field(),
            visibility in any_field(),
        ) {
            let reading = normalize(&RawReading::OpenWeatherMap {
                observation: OwmObservation {
                    dt,
                    main: Some(OwmMain { temp }),
                    wind: Some(OwmWind { speed: wind }),
                    rain: Some(OwmPrecip { one_hour: rain }),
                    snow: Some(OwmPrecip { one_hour: snow }),
                    visibility,
                    weather: Vec::new(),
                },
                fetched_at: fetched_at(),
            });

            assert_all_finite(&reading)?;
            prop_assert_eq!(
                reading.condition,
                Condition::Other(UNKNOWN_CONDITION.to_string())
            );
        }

        #[test]
        fn prop_stored_samples_never_yield_non_finite(
            temp in any_field(),
            wind in any_field(),
            precip in any_field(),
            visibility in any_field(),
        ) {
            let reading = normalize_sample(&StoredSample {
                id: "s".to_string(),
                location_id: "x".to_string(),
                observed_at: fetched_at(),
                temp_c: temp,
                wind_speed_ms: wind,
                precip_mm: precip,
                visibility_km: visibility,
                condition_code: "Clear".to_string(),
                source: None,
            });

            assert_all_finite(&reading)?;
        }

        #[test]
        fn prop_relabelling_is_idempotent(code in "[a-zA-Z0-9 ]{0,24}") {
            let once = condition_label(&code);
            prop_assert_eq!(condition_label(once.as_str()), once);
        }
    }
}
