//! Concrete weather provider clients.
//!
//! [`build_provider`] turns an explicit [`ProviderKind`] into a ready client;
//! the choice is made by the caller, never read from ambient state here.

pub mod open_meteo;
pub mod openweathermap;

use std::sync::Arc;
use std::time::Duration;

use crate::fetch::BasicClient;
use crate::services::weather_api::{ProviderKind, WeatherProvider};
use open_meteo::OpenMeteoClient;
use openweathermap::OpenWeatherMapClient;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn build_provider(
    kind: ProviderKind,
    api_key: Option<String>,
) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let http = BasicClient::with_timeouts(REQUEST_TIMEOUT, CONNECT_TIMEOUT)?;

    let provider: Arc<dyn WeatherProvider> = match kind {
        ProviderKind::OpenMeteo => Arc::new(OpenMeteoClient::new(http)),
        ProviderKind::OpenWeatherMap => Arc::new(OpenWeatherMapClient::new(http, api_key)),
    };
    Ok(provider)
}
