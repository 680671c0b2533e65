//! Trait and types for talking to an upstream weather provider.

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

use crate::reading::{Coordinates, RawReading};

/// Which upstream provider the ingestor talks to.
///
/// Chosen once from configuration and passed to
/// [`build_provider`](crate::infra::build_provider); never read from the
/// environment at fetch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ProviderKind {
    #[default]
    #[value(name = "open-meteo")]
    OpenMeteo,
    #[value(name = "openweathermap")]
    OpenWeatherMap,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenMeteo => "open-meteo",
            ProviderKind::OpenWeatherMap => "openweathermap",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open-meteo" | "openmeteo" => Ok(ProviderKind::OpenMeteo),
            "openweathermap" | "owm" => Ok(ProviderKind::OpenWeatherMap),
            other => Err(anyhow::anyhow!("unknown weather provider '{other}'")),
        }
    }
}

/// A failed provider call. Reported per location by the ingestor.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {status}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{variable} missing for {provider} provider")]
    MissingCredential {
        provider: &'static str,
        variable: &'static str,
    },
    #[error("{provider} returned an unreadable payload: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} request could not be built: {message}")]
    InvalidRequest {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
    },
}

impl ProviderError {
    /// HTTP status of the failed call, when the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            ProviderError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Abstraction over an upstream weather provider (e.g., Open-Meteo).
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Provider name used in logs and fetch log entries.
    fn name(&self) -> &'static str;

    /// Returns the current observation at `at`.
    async fn fetch_current(&self, at: Coordinates) -> Result<RawReading, ProviderError>;

    /// Returns one observation per day from `days` days ago up to today.
    /// `days == 0` yields an empty list.
    async fn fetch_historical(
        &self,
        at: Coordinates,
        days: u32,
    ) -> Result<Vec<RawReading>, ProviderError>;
}
