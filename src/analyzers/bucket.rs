use chrono::NaiveDate;
use std::collections::HashMap;

use crate::analyzers::aggregate::aggregate;
use crate::analyzers::types::DailyAggregate;
use crate::normalize::normalize_sample;
use crate::reading::{NormalizedReading, StoredSample};

/// Groups samples by (location, UTC calendar day of `observed_at`) and builds
/// one [`DailyAggregate`] per group.
///
/// Output is sorted by date. The sort is stable, so aggregates of the same day
/// keep the order in which their location first appeared in `samples`. Days
/// without samples produce nothing.
pub fn bucket_by_location_and_day(samples: &[StoredSample]) -> Vec<DailyAggregate> {
    let mut index: HashMap<(String, NaiveDate), usize> = HashMap::new();
    let mut buckets: Vec<(String, NaiveDate, Vec<NormalizedReading>)> = Vec::new();

    for sample in samples {
        let day = sample.observed_at.date_naive();
        let slot = *index
            .entry((sample.location_id.clone(), day))
            .or_insert_with(|| {
                buckets.push((sample.location_id.clone(), day, Vec::new()));
                buckets.len() - 1
            });
        buckets[slot].2.push(normalize_sample(sample));
    }

    let mut aggregates: Vec<DailyAggregate> = buckets
        .iter()
        .filter_map(|(location_id, day, readings)| daily_aggregate(location_id, *day, readings))
        .collect();

    aggregates.sort_by_key(|a| a.date);
    aggregates
}

/// Builds the aggregate of one bucket, or `None` if the bucket is empty.
pub fn daily_aggregate(
    location_id: &str,
    date: NaiveDate,
    readings: &[NormalizedReading],
) -> Option<DailyAggregate> {
    let summary = aggregate(readings)?;

    Some(DailyAggregate {
        location_id: location_id.to_string(),
        date,
        temp_min_c: summary.temp_min_c,
        temp_max_c: summary.temp_max_c,
        temp_avg_c: summary.temp_avg_c,
        wind_avg_ms: summary.wind_avg_ms,
        precip_total_mm: summary.precip_total_mm,
        visibility_avg_km: summary.visibility_avg_km,
        condition_counts: summary.condition_counts.to_json(),
        risk_score: summary.risk_avg.round().clamp(0.0, 100.0) as u8,
        severe_flag: summary.severe_count > 0,
    })
}
