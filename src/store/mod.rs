//! Sample and location storage.
//!
//! [`SampleStore`] is the interface the analyzers and the ingestor query.
//! [`CsvStore`] keeps append-only CSV files plus a JSON location file on disk;
//! [`MemoryStore`] keeps everything in process and backs the tests.

mod csv_store;
mod memory;
mod seed;

pub use csv_store::CsvStore;
pub use memory::MemoryStore;
pub use seed::{default_locations, slugify};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reading::{Location, NormalizedReading, StoredSample};

#[derive(Debug, Clone, Default)]
pub struct LocationFilter {
    pub id: Option<String>,
}

impl LocationFilter {
    pub fn by_id(id: Option<&str>) -> Self {
        Self {
            id: id.map(str::to_string),
        }
    }

    fn matches(&self, location: &Location) -> bool {
        self.id.as_deref().is_none_or(|id| location.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOrder {
    Ascending,
    Descending,
}

/// Sample query. `observed_after` is inclusive. Results are unordered unless
/// `order` is set.
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    pub location_id: Option<String>,
    pub observed_after: Option<DateTime<Utc>>,
    pub order: Option<SampleOrder>,
}

impl SampleFilter {
    pub fn since(observed_after: DateTime<Utc>) -> Self {
        Self {
            observed_after: Some(observed_after),
            ..Default::default()
        }
    }

    pub fn ordered(mut self, order: SampleOrder) -> Self {
        self.order = Some(order);
        self
    }

    fn matches(&self, sample: &StoredSample) -> bool {
        self.location_id
            .as_deref()
            .is_none_or(|id| sample.location_id == id)
            && self.observed_after.is_none_or(|t| sample.observed_at >= t)
    }

    fn apply(&self, mut samples: Vec<StoredSample>) -> Vec<StoredSample> {
        samples.retain(|s| self.matches(s));
        match self.order {
            Some(SampleOrder::Ascending) => samples.sort_by_key(|s| s.observed_at),
            Some(SampleOrder::Descending) => {
                samples.sort_by(|a, b| b.observed_at.cmp(&a.observed_at))
            }
            None => {}
        }
        samples
    }
}

/// One ingestion attempt for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchLogEntry {
    pub location_id: String,
    pub fetched_at: DateTime<Utc>,
    pub success: bool,
    pub message: String,
    pub source: String,
}

pub trait SampleStore: Send + Sync {
    fn find_locations(&self, filter: &LocationFilter) -> Result<Vec<Location>>;

    fn find_samples(&self, filter: &SampleFilter) -> Result<Vec<StoredSample>>;

    /// Persists a reading under a fresh id and returns the stored sample.
    fn append_sample(&self, location_id: &str, reading: &NormalizedReading) -> Result<StoredSample>;

    fn append_fetch_log(&self, entry: &FetchLogEntry) -> Result<()>;

    /// Returns up to `limit` fetch log entries, newest first.
    fn recent_fetch_log(&self, limit: usize) -> Result<Vec<FetchLogEntry>>;

    /// Inserts locations, or updates the one with the same name keeping its id.
    /// Returns the number of locations written.
    fn upsert_locations(&self, locations: &[Location]) -> Result<usize>;
}

/// Merges `incoming` into `existing` by name, keeping existing ids.
pub(crate) fn merge_locations(existing: &mut Vec<Location>, incoming: &[Location]) -> usize {
    for loc in incoming {
        match existing.iter_mut().find(|e| e.name == loc.name) {
            Some(current) => {
                *current = Location {
                    id: current.id.clone(),
                    ..loc.clone()
                };
            }
            None => existing.push(loc.clone()),
        }
    }
    incoming.len()
}

pub(crate) fn newest_first(mut entries: Vec<FetchLogEntry>, limit: usize) -> Vec<FetchLogEntry> {
    entries.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
    entries.truncate(limit);
    entries
}
