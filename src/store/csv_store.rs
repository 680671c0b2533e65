//! File-backed store.
//!
//! Layout under the data directory:
//! - `locations.json`: array of [`Location`]s, rewritten by the seed command
//! - `samples.csv`: append-only [`StoredSample`] rows
//! - `fetch_log.csv`: append-only [`FetchLogEntry`] rows

use anyhow::{Context, Result, anyhow};
use csv::WriterBuilder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use super::{
    FetchLogEntry, LocationFilter, SampleFilter, SampleStore, merge_locations, newest_first,
};
use crate::reading::{Location, NormalizedReading, StoredSample};

const LOCATIONS_FILE: &str = "locations.json";
const SAMPLES_FILE: &str = "samples.csv";
const FETCH_LOG_FILE: &str = "fetch_log.csv";

pub struct CsvStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvStore {
    /// Opens the store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| anyhow!("CSV store write lock poisoned"))
    }

    fn load_locations(&self) -> Result<Vec<Location>> {
        let path = self.dir.join(LOCATIONS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)?;
        let locations = serde_json::from_str(&content)
            .with_context(|| format!("Invalid location file {}", path.display()))?;
        Ok(locations)
    }
}

impl SampleStore for CsvStore {
    fn find_locations(&self, filter: &LocationFilter) -> Result<Vec<Location>> {
        let mut locations = self.load_locations()?;
        locations.retain(|l| filter.matches(l));
        Ok(locations)
    }

    fn find_samples(&self, filter: &SampleFilter) -> Result<Vec<StoredSample>> {
        let samples: Vec<StoredSample> = load_records(&self.dir.join(SAMPLES_FILE))?;
        Ok(filter.apply(samples))
    }

    fn append_sample(&self, location_id: &str, reading: &NormalizedReading) -> Result<StoredSample> {
        let sample = StoredSample::from_reading(Uuid::new_v4().to_string(), location_id, reading);

        let _guard = self.lock()?;
        append_record(&self.dir.join(SAMPLES_FILE), &sample)?;
        Ok(sample)
    }

    fn append_fetch_log(&self, entry: &FetchLogEntry) -> Result<()> {
        let _guard = self.lock()?;
        append_record(&self.dir.join(FETCH_LOG_FILE), entry)
    }

    fn recent_fetch_log(&self, limit: usize) -> Result<Vec<FetchLogEntry>> {
        let entries = load_records(&self.dir.join(FETCH_LOG_FILE))?;
        Ok(newest_first(entries, limit))
    }

    fn upsert_locations(&self, locations: &[Location]) -> Result<usize> {
        let _guard = self.lock()?;
        let mut existing = self.load_locations()?;
        let written = merge_locations(&mut existing, locations);

        let path = self.dir.join(LOCATIONS_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(&existing)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(written)
    }
}

/// Appends a record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
fn append_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// Reads every row of a CSV file. A missing file reads as empty.
fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut rows = Vec::new();

    for result in rdr.deserialize() {
        let record: T = result.with_context(|| format!("Malformed row in {}", path.display()))?;
        rows.push(record);
    }

    Ok(rows)
}
