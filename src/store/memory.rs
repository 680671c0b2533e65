use anyhow::{Result, anyhow};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{
    FetchLogEntry, LocationFilter, SampleFilter, SampleStore, merge_locations, newest_first,
};
use crate::reading::{Location, NormalizedReading, StoredSample};

#[derive(Default)]
struct Tables {
    locations: Vec<Location>,
    samples: Vec<StoredSample>,
    fetch_log: Vec<FetchLogEntry>,
}

/// In-process store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locations(locations: Vec<Location>) -> Self {
        Self {
            tables: Mutex::new(Tables {
                locations,
                ..Default::default()
            }),
        }
    }

    /// Inserts an already-built sample, keeping its id.
    pub fn insert_sample(&self, sample: StoredSample) -> Result<()> {
        self.lock()?.samples.push(sample);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

impl SampleStore for MemoryStore {
    fn find_locations(&self, filter: &LocationFilter) -> Result<Vec<Location>> {
        Ok(self
            .lock()?
            .locations
            .iter()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect())
    }

    fn find_samples(&self, filter: &SampleFilter) -> Result<Vec<StoredSample>> {
        let samples = self.lock()?.samples.clone();
        Ok(filter.apply(samples))
    }

    fn append_sample(&self, location_id: &str, reading: &NormalizedReading) -> Result<StoredSample> {
        let sample = StoredSample::from_reading(Uuid::new_v4().to_string(), location_id, reading);
        self.lock()?.samples.push(sample.clone());
        Ok(sample)
    }

    fn append_fetch_log(&self, entry: &FetchLogEntry) -> Result<()> {
        self.lock()?.fetch_log.push(entry.clone());
        Ok(())
    }

    fn recent_fetch_log(&self, limit: usize) -> Result<Vec<FetchLogEntry>> {
        let entries = self.lock()?.fetch_log.clone();
        Ok(newest_first(entries, limit))
    }

    fn upsert_locations(&self, locations: &[Location]) -> Result<usize> {
        let mut tables = self.lock()?;
        Ok(merge_locations(&mut tables.locations, locations))
    }
}
