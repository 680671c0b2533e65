use std::collections::HashMap;

use crate::analyzers::types::LiveSample;
use crate::normalize::normalize_sample;
use crate::reading::StoredSample;
use crate::risk::{is_severe, risk_score};

/// Keeps the first sample seen for each location.
///
/// `samples` must already be ordered newest first; no sorting happens here, so
/// the first sample per location is its most recent one. `names` maps location
/// ids to display names; unknown ids fall back to the id itself.
pub fn latest_per_location(
    samples: &[StoredSample],
    names: &HashMap<String, String>,
) -> HashMap<String, LiveSample> {
    let mut latest: HashMap<String, LiveSample> = HashMap::new();

    for sample in samples {
        if latest.contains_key(&sample.location_id) {
            continue;
        }

        let reading = normalize_sample(sample);
        let location_name = names
            .get(&sample.location_id)
            .cloned()
            .unwrap_or_else(|| sample.location_id.clone());

        latest.insert(
            sample.location_id.clone(),
            LiveSample {
                location_id: sample.location_id.clone(),
                location_name,
                observed_at: reading.observed_at,
                temp_c: reading.temp_c,
                wind_speed_ms: reading.wind_speed_ms,
                precip_mm: reading.precip_mm,
                visibility_km: reading.visibility_km,
                condition_code: reading.condition.to_string(),
                severe: is_severe(&reading),
                risk: risk_score(&reading),
            },
        );
    }

    latest
}
