//! Runtime settings read from the environment (after `.env` is loaded).
//!
//! | Variable              | Default                  |
//! |-----------------------|--------------------------|
//! | `WEATHER_PROVIDER`    | `open-meteo`             |
//! | `WEATHER_API_KEY`     | unset                    |
//! | `DATA_DIR`            | `data`                   |
//! | `LOG_FILE_PATH`       | `logs/port_weather.log`  |
//! | `INGEST_CONCURRENCY`  | `5`                      |

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::ingest::DEFAULT_CONCURRENCY;
use crate::services::weather_api::ProviderKind;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub data_dir: PathBuf,
    pub log_file_path: PathBuf,
    pub concurrency: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let provider = match var("WEATHER_PROVIDER") {
            Some(value) => value.parse().context("Invalid WEATHER_PROVIDER")?,
            None => ProviderKind::default(),
        };

        let concurrency = match var("INGEST_CONCURRENCY") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid INGEST_CONCURRENCY '{value}'"))?,
            None => DEFAULT_CONCURRENCY,
        };

        Ok(Self {
            provider,
            api_key: var("WEATHER_API_KEY"),
            data_dir: var("DATA_DIR").unwrap_or_else(|| "data".to_string()).into(),
            log_file_path: var("LOG_FILE_PATH")
                .unwrap_or_else(|| "logs/port_weather.log".to_string())
                .into(),
            concurrency,
        })
    }
}
