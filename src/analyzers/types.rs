//! Data types produced by the aggregation pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::stats::ConditionCounts;

/// Summary statistics over one group of readings.
///
/// Averages, extremes and the precipitation total only consider non-null
/// values and are `None` when a field had none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub temp_avg_c: Option<f64>,
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub wind_avg_ms: Option<f64>,
    pub precip_total_mm: Option<f64>,
    pub visibility_avg_km: Option<f64>,
    pub condition_counts: ConditionCounts,
    pub severe_count: usize,
    pub risk_avg: f64,
}

/// Time predicate for windowed aggregation. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn since(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && self.end.is_none_or(|end| at <= end)
    }
}

/// One (location, UTC day) bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub location_id: String,
    pub date: NaiveDate,
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub temp_avg_c: Option<f64>,
    pub wind_avg_ms: Option<f64>,
    pub precip_total_mm: Option<f64>,
    pub visibility_avg_km: Option<f64>,
    pub condition_counts: String,
    pub risk_score: u8,
    pub severe_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    #[serde(flatten)]
    pub aggregate: DailyAggregate,
    pub location_name: Option<String>,
}

/// Rolling window over all locations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewMetrics {
    pub window_hours: u32,
    pub sample_count: usize,
    pub temp_avg_c: Option<f64>,
    pub wind_avg_ms: Option<f64>,
    pub precip_total_mm: Option<f64>,
    pub visibility_avg_km: Option<f64>,
    pub risk_avg: Option<f64>,
    pub severe_count: usize,
    pub condition_counts: ConditionCounts,
    pub condition_percentages: BTreeMap<String, f64>,
}

/// Per-location summary over a multi-day window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub location_id: String,
    pub location_name: String,
    pub sample_count: usize,
    pub temp_avg_c: Option<f64>,
    pub wind_avg_ms: Option<f64>,
    pub precip_total_mm: Option<f64>,
    pub visibility_avg_km: Option<f64>,
    pub risk_avg: f64,
    pub severe_count: usize,
}

/// Most recent reading of one location, with its scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveSample {
    pub location_id: String,
    pub location_name: String,
    pub observed_at: DateTime<Utc>,
    pub temp_c: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub precip_mm: Option<f64>,
    pub visibility_km: Option<f64>,
    pub condition_code: String,
    pub severe: bool,
    pub risk: u8,
}
