use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::normalize::OPENWEATHERMAP_SOURCE;
use crate::reading::{Coordinates, OwmObservation, RawReading};
use crate::services::weather_api::{ProviderError, WeatherProvider};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
pub const API_KEY_VARIABLE: &str = "WEATHER_API_KEY";

/// OpenWeatherMap current-weather API (metric units).
///
/// The key is sent as the `appid` query parameter. Without a key the client
/// still builds, but every fetch fails with
/// [`ProviderError::MissingCredential`] so the failure is reported per
/// location rather than at startup.
pub struct OpenWeatherMapClient<C = BasicClient> {
    http: Option<UrlParam<C>>,
    base_url: String,
}

impl<C: HttpClient> OpenWeatherMapClient<C> {
    pub fn new(http: C, api_key: Option<String>) -> Self {
        Self::with_base_url(http, api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(http: C, api_key: Option<String>, base_url: String) -> Self {
        let http = api_key
            .filter(|key| !key.trim().is_empty())
            .map(|key| UrlParam::new(http, "appid", key));

        Self { http, base_url }
    }

    fn weather_url(&self, at: Coordinates) -> Result<reqwest::Url, ProviderError> {
        reqwest::Url::parse_with_params(
            &format!("{}/data/2.5/weather", self.base_url),
            &[
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
                ("units", "metric".to_string()),
            ],
        )
        .map_err(|e| ProviderError::InvalidRequest {
            provider: OPENWEATHERMAP_SOURCE,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl<C: HttpClient> WeatherProvider for OpenWeatherMapClient<C> {
    fn name(&self) -> &'static str {
        OPENWEATHERMAP_SOURCE
    }

    #[tracing::instrument(skip(self), fields(provider = OPENWEATHERMAP_SOURCE))]
    async fn fetch_current(&self, at: Coordinates) -> Result<RawReading, ProviderError> {
        let http = self
            .http
            .as_ref()
            .ok_or(ProviderError::MissingCredential {
                provider: OPENWEATHERMAP_SOURCE,
                variable: API_KEY_VARIABLE,
            })?;

        let url = self.weather_url(at)?;
        let body = fetch_bytes(http, OPENWEATHERMAP_SOURCE, url).await?;
        debug!(bytes = body.len(), "Current conditions received");

        decode_current(&body, Utc::now())
    }

    async fn fetch_historical(
        &self,
        _at: Coordinates,
        days: u32,
    ) -> Result<Vec<RawReading>, ProviderError> {
        if days == 0 {
            return Ok(Vec::new());
        }
        // The free tier has no historical endpoint.
        Err(ProviderError::Unsupported {
            provider: OPENWEATHERMAP_SOURCE,
            operation: "historical ranges",
        })
    }
}

pub fn decode_current(body: &[u8], fetched_at: DateTime<Utc>) -> Result<RawReading, ProviderError> {
    let observation: OwmObservation =
        serde_json::from_slice(body).map_err(|e| ProviderError::Decode {
            provider: OPENWEATHERMAP_SOURCE,
            message: e.to_string(),
        })?;

    Ok(RawReading::OpenWeatherMap {
        observation,
        fetched_at,
    })
}
