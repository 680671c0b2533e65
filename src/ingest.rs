//! Per-location ingestion: fetch from the provider, normalize, append to the
//! store, and record a fetch log entry.
//!
//! Locations are fetched concurrently. A failure (or even a panic) while
//! ingesting one location is turned into an error record for that location
//! and never affects the others.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, error, info, warn};

use crate::normalize::normalize;
use crate::reading::{Location, NormalizedReading};
use crate::services::weather_api::{ProviderError, WeatherProvider};
use crate::store::{FetchLogEntry, LocationFilter, SampleStore};

pub const DEFAULT_CONCURRENCY: usize = 5;
const FAILURE_SOURCE: &str = "ingest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestResult {
    pub location_id: String,
    pub status: IngestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub samples: usize,
}

impl IngestResult {
    fn ok(location_id: &str, samples: usize) -> Self {
        Self {
            location_id: location_id.to_string(),
            status: IngestStatus::Ok,
            message: None,
            samples,
        }
    }

    /// `samples` counts rows written before the failure.
    fn error(location_id: &str, message: String, samples: usize) -> Self {
        Self {
            location_id: location_id.to_string(),
            status: IngestStatus::Error,
            message: Some(message),
            samples,
        }
    }
}

/// Outcome of one ingestion run. `results` has exactly one entry per entry of
/// `locations`, in the same order.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    #[serde(skip)]
    pub locations: Vec<Location>,
    pub ingested: usize,
    pub results: Vec<IngestResult>,
}

pub struct Ingestor {
    provider: Arc<dyn WeatherProvider>,
    store: Arc<dyn SampleStore>,
    concurrency: usize,
}

impl Ingestor {
    pub fn new(provider: Arc<dyn WeatherProvider>, store: Arc<dyn SampleStore>) -> Self {
        Self {
            provider,
            store,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Caps the number of provider calls in flight. Values below 1 become 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Current conditions for one location, normalized.
    pub async fn fetch_current(&self, location: &Location) -> Result<NormalizedReading, ProviderError> {
        let raw = self.provider.fetch_current(location.coordinates()).await?;
        Ok(normalize(&raw))
    }

    /// One normalized reading per day over the last `days` days.
    pub async fn fetch_historical(
        &self,
        location: &Location,
        days: u32,
    ) -> Result<Vec<NormalizedReading>, ProviderError> {
        let raw = self
            .provider
            .fetch_historical(location.coordinates(), days)
            .await?;
        Ok(raw.iter().map(normalize).collect())
    }

    /// Ingests a single location. Never fails; errors become the result.
    pub async fn ingest_location(&self, location: &Location, days: Option<u32>) -> IngestResult {
        ingest_one(
            self.provider.clone(),
            self.store.clone(),
            location.clone(),
            days,
        )
        .await
    }

    /// Ingests every location matching `location_id` (all when `None`).
    ///
    /// With `days` set, a historical range is fetched instead of current
    /// conditions. No matching location gives an empty report; whether that
    /// is an error is up to the caller.
    #[tracing::instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn ingest_many(
        &self,
        location_id: Option<&str>,
        days: Option<u32>,
    ) -> Result<IngestReport> {
        let mut locations = self
            .store
            .find_locations(&LocationFilter::by_id(location_id))
            .context("Failed to load locations")?;
        locations.sort_by(|a, b| a.name.cmp(&b.name));

        if locations.is_empty() {
            warn!("No matching locations");
            return Ok(IngestReport {
                locations,
                ingested: 0,
                results: Vec::new(),
            });
        }

        info!(locations = locations.len(), concurrency = self.concurrency, "Starting ingestion");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::with_capacity(locations.len());

        for location in &locations {
            let sem = semaphore.clone();
            let provider = self.provider.clone();
            let store = self.store.clone();
            let location = location.clone();

            let location_span = tracing::info_span!(
                "ingest_location",
                location_id = %location.id,
                location_name = %location.name,
            );

            let task = tokio::spawn(
                async move {
                    let _permit = match sem.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return IngestResult::error(
                                &location.id,
                                "ingestion cancelled".to_string(),
                                0,
                            );
                        }
                    };
                    ingest_one(provider, store, location, days).await
                }
                .instrument(location_span),
            );

            tasks.push(task);
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (location, task) in locations.iter().zip(tasks) {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!(location_id = %location.id, error = %e, "Ingestion task aborted");
                    IngestResult::error(&location.id, format!("ingestion task failed: {e}"), 0)
                }
            };
            results.push(result);
        }

        let ingested = results
            .iter()
            .filter(|r| r.status == IngestStatus::Ok)
            .count();
        info!(ingested, failed = results.len() - ingested, "Ingestion finished");

        Ok(IngestReport {
            locations,
            ingested,
            results,
        })
    }
}

async fn ingest_one(
    provider: Arc<dyn WeatherProvider>,
    store: Arc<dyn SampleStore>,
    location: Location,
    days: Option<u32>,
) -> IngestResult {
    let outcome = match fetch_readings(provider.as_ref(), &location, days).await {
        Ok(readings) => store_readings(store.as_ref(), &location.id, &readings),
        Err(e) => Err((e.to_string(), 0)),
    };

    match outcome {
        Ok(samples) => {
            info!(samples, "Location ingested");
            record_attempt(
                store.as_ref(),
                &location.id,
                true,
                format!("Ingested from {}", provider.name()),
                provider.name(),
            );
            IngestResult::ok(&location.id, samples)
        }
        Err((message, stored)) => {
            error!(error = %message, stored, "Location ingestion failed");
            record_attempt(store.as_ref(), &location.id, false, message.clone(), FAILURE_SOURCE);
            IngestResult::error(&location.id, message, stored)
        }
    }
}

async fn fetch_readings(
    provider: &dyn WeatherProvider,
    location: &Location,
    days: Option<u32>,
) -> Result<Vec<NormalizedReading>, ProviderError> {
    Ok(match days {
        Some(days) => provider
            .fetch_historical(location.coordinates(), days)
            .await?
            .iter()
            .map(normalize)
            .collect(),
        None => vec![normalize(&provider.fetch_current(location.coordinates()).await?)],
    })
}

/// Appends readings in order. Appends are not atomic: on failure the rows
/// already written stay, and their count is returned with the error.
fn store_readings(
    store: &dyn SampleStore,
    location_id: &str,
    readings: &[NormalizedReading],
) -> std::result::Result<usize, (String, usize)> {
    for (stored, reading) in readings.iter().enumerate() {
        if let Err(e) = store.append_sample(location_id, reading) {
            return Err((
                format!(
                    "Failed to store sample ({stored} of {} stored): {e:#}",
                    readings.len()
                ),
                stored,
            ));
        }
    }
    Ok(readings.len())
}

/// Writes a fetch log entry. A log write failure is only warned about so it
/// cannot change the ingestion result.
fn record_attempt(store: &dyn SampleStore, location_id: &str, success: bool, message: String, source: &str) {
    let entry = FetchLogEntry {
        location_id: location_id.to_string(),
        fetched_at: Utc::now(),
        success,
        message,
        source: source.to_string(),
    };
    if let Err(e) = store.append_fetch_log(&entry) {
        warn!(error = %e, "Failed to write fetch log entry");
    }
}
