use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::normalize::OPEN_METEO_SOURCE;
use crate::reading::{Coordinates, OpenMeteoObservation, RawReading};
use crate::services::weather_api::{ProviderError, WeatherProvider};

const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";
const CURRENT_FIELDS: &str = "temperature_2m,wind_speed_10m,precipitation,visibility,weather_code";
const DAILY_FIELDS: &str = "temperature_2m_mean,wind_speed_10m_max,precipitation_sum,weather_code";

#[derive(Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    current: Option<OpenMeteoObservation>,
}

#[derive(Deserialize)]
struct DailyResponse {
    #[serde(default)]
    daily: Option<DailySeries>,
}

/// Column-oriented `daily` block: one entry per day in every array.
#[derive(Deserialize, Default)]
struct DailySeries {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_mean: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m_max: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<f64>>,
}

impl DailySeries {
    fn into_observations(self) -> Vec<OpenMeteoObservation> {
        let at = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten();

        self.time
            .iter()
            .enumerate()
            .map(|(i, day)| OpenMeteoObservation {
                time: Some(day.clone()),
                temperature_2m: at(&self.temperature_2m_mean, i),
                wind_speed_10m: at(&self.wind_speed_10m_max, i),
                precipitation: at(&self.precipitation_sum, i),
                visibility: None,
                weather_code: at(&self.weather_code, i),
            })
            .collect()
    }
}

/// Open-Meteo forecast API. No key required. Wind is requested in m/s and
/// times in UTC.
pub struct OpenMeteoClient<C = BasicClient> {
    http: C,
    base_url: String,
}

impl<C: HttpClient> OpenMeteoClient<C> {
    pub fn new(http: C) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(http: C, base_url: String) -> Self {
        Self { http, base_url }
    }

    fn forecast_url(&self, at: Coordinates, params: &[(&str, String)]) -> Result<reqwest::Url, ProviderError> {
        let mut query = vec![
            ("latitude", at.latitude.to_string()),
            ("longitude", at.longitude.to_string()),
            ("wind_speed_unit", "ms".to_string()),
            ("timezone", "UTC".to_string()),
        ];
        query.extend(params.iter().map(|(k, v)| (*k, v.clone())));

        reqwest::Url::parse_with_params(&format!("{}/v1/forecast", self.base_url), &query).map_err(
            |e| ProviderError::InvalidRequest {
                provider: OPEN_METEO_SOURCE,
                message: e.to_string(),
            },
        )
    }
}

#[async_trait]
impl<C: HttpClient> WeatherProvider for OpenMeteoClient<C> {
    fn name(&self) -> &'static str {
        OPEN_METEO_SOURCE
    }

    #[tracing::instrument(skip(self), fields(provider = OPEN_METEO_SOURCE))]
    async fn fetch_current(&self, at: Coordinates) -> Result<RawReading, ProviderError> {
        let url = self.forecast_url(at, &[("current", CURRENT_FIELDS.to_string())])?;
        let body = fetch_bytes(&self.http, OPEN_METEO_SOURCE, url).await?;
        debug!(bytes = body.len(), "Current conditions received");

        decode_current(&body, Utc::now())
    }

    #[tracing::instrument(skip(self), fields(provider = OPEN_METEO_SOURCE))]
    async fn fetch_historical(
        &self,
        at: Coordinates,
        days: u32,
    ) -> Result<Vec<RawReading>, ProviderError> {
        if days == 0 {
            return Ok(Vec::new());
        }

        let url = self.forecast_url(
            at,
            &[
                ("daily", DAILY_FIELDS.to_string()),
                ("past_days", days.to_string()),
                ("forecast_days", "1".to_string()),
            ],
        )?;
        let body = fetch_bytes(&self.http, OPEN_METEO_SOURCE, url).await?;
        debug!(bytes = body.len(), "Daily series received");

        decode_daily(&body, Utc::now())
    }
}

fn decode_error(e: serde_json::Error) -> ProviderError {
    ProviderError::Decode {
        provider: OPEN_METEO_SOURCE,
        message: e.to_string(),
    }
}

/// Decodes a `current=` response. A missing `current` block decodes as an
/// observation with every field absent.
pub fn decode_current(body: &[u8], fetched_at: DateTime<Utc>) -> Result<RawReading, ProviderError> {
    let response: CurrentResponse = serde_json::from_slice(body).map_err(decode_error)?;

    Ok(RawReading::OpenMeteo {
        observation: response.current.unwrap_or_default(),
        fetched_at,
    })
}

/// Decodes a `daily=` response into one reading per day. A missing `daily`
/// block is an empty window, not an error.
pub fn decode_daily(body: &[u8], fetched_at: DateTime<Utc>) -> Result<Vec<RawReading>, ProviderError> {
    let response: DailyResponse = serde_json::from_slice(body).map_err(decode_error)?;

    Ok(response
        .daily
        .unwrap_or_default()
        .into_observations()
        .into_iter()
        .map(|observation| RawReading::OpenMeteo {
            observation,
            fetched_at,
        })
        .collect())
}
