//! Dashboard queries over a [`SampleStore`].
//!
//! Every query takes the reference instant `now` explicitly; nothing here
//! reads the clock. Calendar days are UTC days.

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveTime, TimeDelta, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::analyzers::aggregate::aggregate;
use crate::analyzers::bucket::bucket_by_location_and_day;
use crate::analyzers::latest::latest_per_location;
use crate::analyzers::types::{ComparisonRow, LiveSample, OverviewMetrics, TrendPoint};
use crate::normalize::normalize_sample;
use crate::reading::NormalizedReading;
use crate::store::{LocationFilter, SampleFilter, SampleOrder, SampleStore};

pub const DEFAULT_OVERVIEW_HOURS: u32 = 24;
pub const DEFAULT_TREND_DAYS: u32 = 7;
pub const DEFAULT_COMPARISON_DAYS: u32 = 3;
pub const DEFAULT_LIVE_HOURS: u32 = 6;

fn or_default(value: u32, default: u32) -> u32 {
    if value == 0 { default } else { value }
}

/// `now` minus `delta`, or the earliest representable instant when that
/// would leave chrono's range.
fn window_start(now: DateTime<Utc>, delta: Option<TimeDelta>) -> DateTime<Utc> {
    delta
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn hours_before(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    window_start(now, TimeDelta::try_hours(hours as i64))
}

fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    window_start(now, TimeDelta::try_days(days as i64))
}

/// UTC midnight opening a window of `days` calendar days that ends today.
fn start_of_day_window(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.date_naive()
        .checked_sub_days(Days::new(days.saturating_sub(1) as u64))
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn location_names(store: &dyn SampleStore) -> Result<HashMap<String, String>> {
    let locations = store
        .find_locations(&LocationFilter::default())
        .context("Failed to load locations")?;
    Ok(locations.into_iter().map(|l| (l.id, l.name)).collect())
}

/// Statistics over every sample of the last `hours` hours, all locations
/// together. An empty window yields zero counts and `None` averages.
pub fn overview(store: &dyn SampleStore, hours: u32, now: DateTime<Utc>) -> Result<OverviewMetrics> {
    let hours = or_default(hours, DEFAULT_OVERVIEW_HOURS);
    let since = hours_before(now, hours);

    let samples = store.find_samples(&SampleFilter::since(since))?;
    let readings: Vec<NormalizedReading> = samples.iter().map(normalize_sample).collect();
    debug!(hours, samples = readings.len(), "Overview window loaded");

    let metrics = match aggregate(&readings) {
        Some(summary) => OverviewMetrics {
            window_hours: hours,
            sample_count: summary.count,
            temp_avg_c: summary.temp_avg_c,
            wind_avg_ms: summary.wind_avg_ms,
            precip_total_mm: summary.precip_total_mm,
            visibility_avg_km: summary.visibility_avg_km,
            risk_avg: Some(summary.risk_avg),
            severe_count: summary.severe_count,
            condition_percentages: summary.condition_counts.percentages(),
            condition_counts: summary.condition_counts,
        },
        None => OverviewMetrics {
            window_hours: hours,
            sample_count: 0,
            temp_avg_c: None,
            wind_avg_ms: None,
            precip_total_mm: None,
            visibility_avg_km: None,
            risk_avg: None,
            severe_count: 0,
            condition_counts: Default::default(),
            condition_percentages: Default::default(),
        },
    };

    Ok(metrics)
}

/// Daily aggregates per location for today and the `days - 1` days before it.
pub fn trends(store: &dyn SampleStore, days: u32, now: DateTime<Utc>) -> Result<Vec<TrendPoint>> {
    let days = or_default(days, DEFAULT_TREND_DAYS);
    let start = start_of_day_window(now, days);

    let samples =
        store.find_samples(&SampleFilter::since(start).ordered(SampleOrder::Ascending))?;
    let names = location_names(store)?;
    debug!(days, samples = samples.len(), "Trend window loaded");

    Ok(bucket_by_location_and_day(&samples)
        .into_iter()
        .map(|aggregate| TrendPoint {
            location_name: names.get(&aggregate.location_id).cloned(),
            aggregate,
        })
        .collect())
}

/// One row per location with samples in the last `days` days, sorted by
/// location name.
pub fn comparison(
    store: &dyn SampleStore,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<ComparisonRow>> {
    let days = or_default(days, DEFAULT_COMPARISON_DAYS);
    let since = days_before(now, days);

    let samples = store.find_samples(&SampleFilter::since(since))?;
    let names = location_names(store)?;

    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<NormalizedReading>> = HashMap::new();
    for sample in &samples {
        grouped
            .entry(sample.location_id.clone())
            .or_insert_with(|| {
                order.push(sample.location_id.clone());
                Vec::new()
            })
            .push(normalize_sample(sample));
    }

    let mut rows: Vec<ComparisonRow> = order
        .into_iter()
        .filter_map(|location_id| {
            let summary = aggregate(grouped.get(&location_id)?)?;
            Some(ComparisonRow {
                location_name: names
                    .get(&location_id)
                    .cloned()
                    .unwrap_or_else(|| location_id.clone()),
                location_id,
                sample_count: summary.count,
                temp_avg_c: summary.temp_avg_c,
                wind_avg_ms: summary.wind_avg_ms,
                precip_total_mm: summary.precip_total_mm,
                visibility_avg_km: summary.visibility_avg_km,
                risk_avg: summary.risk_avg,
                severe_count: summary.severe_count,
            })
        })
        .collect();

    rows.sort_by(|a, b| a.location_name.cmp(&b.location_name));
    Ok(rows)
}

/// The most recent sample of each location within the last `hours` hours,
/// sorted by location name.
pub fn live(store: &dyn SampleStore, hours: u32, now: DateTime<Utc>) -> Result<Vec<LiveSample>> {
    let hours = or_default(hours, DEFAULT_LIVE_HOURS);
    let since = hours_before(now, hours);

    let samples =
        store.find_samples(&SampleFilter::since(since).ordered(SampleOrder::Descending))?;
    let names = location_names(store)?;

    let mut latest: Vec<LiveSample> = latest_per_location(&samples, &names)
        .into_values()
        .collect();
    latest.sort_by(|a, b| {
        a.location_name
            .cmp(&b.location_name)
            .then_with(|| a.location_id.cmp(&b.location_id))
    });
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{Location, LocationType, StoredSample};
    use crate::store::MemoryStore;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 10, 15, 0, 0).unwrap()
    }

    fn location(id: &str, name: &str) -> Location {
        Location {
            id: id.to_string(),
            name: name.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            location_type: LocationType::Route,
            timezone: "Etc/UTC".to_string(),
        }
    }

    fn sample(location_id: &str, hours_ago: i64, temp: f64, condition: &str) -> StoredSample {
        StoredSample {
            id: format!("{location_id}-{hours_ago}"),
            location_id: location_id.to_string(),
            observed_at: now() - Duration::hours(hours_ago),
            temp_c: Some(temp),
            wind_speed_ms: None,
            precip_mm: Some(1.0),
            visibility_km: None,
            condition_code: condition.to_string(),
            source: Some("open-meteo".to_string()),
        }
    }

    fn store(samples: Vec<StoredSample>) -> MemoryStore {
        let store = MemoryStore::with_locations(vec![
            location("rtm", "Rotterdam Port"),
            location("sin", "Singapore Hub"),
        ]);
        for s in samples {
            store.insert_sample(s).unwrap();
        }
        store
    }

    #[test]
    fn test_overview_window() {
        let store = store(vec![
            sample("rtm", 1, 10.0, "Clear"),
            sample("sin", 2, 30.0, "light rain"),
            sample("sin", 30, 99.0, "Clear"),
        ]);

        let metrics = overview(&store, 24, now()).unwrap();

        assert_eq!(metrics.window_hours, 24);
        assert_eq!(metrics.sample_count, 2);
        assert_eq!(metrics.temp_avg_c, Some(20.0));
        assert_eq!(metrics.precip_total_mm, Some(2.0));
        assert_eq!(metrics.visibility_avg_km, None);
        assert_eq!(metrics.condition_counts.get("Rain"), 1);
        assert_eq!(metrics.condition_percentages["Clear"], 50.0);
        // 1 mm of precipitation scores 1.5, rounded to 2 per sample.
        assert_eq!(metrics.risk_avg, Some(2.0));
    }

    #[test]
    fn test_overview_empty_window() {
        let metrics = overview(&store(vec![]), 0, now()).unwrap();

        assert_eq!(metrics.window_hours, DEFAULT_OVERVIEW_HOURS);
        assert_eq!(metrics.sample_count, 0);
        assert_eq!(metrics.temp_avg_c, None);
        assert_eq!(metrics.risk_avg, None);
        assert!(metrics.condition_counts.is_empty());
    }

    #[test]
    fn test_trends_start_at_utc_midnight() {
        // now is 15:00; with 2 days the window opens yesterday at 00:00.
        let store = store(vec![
            sample("rtm", 1, 10.0, "Clear"),
            sample("rtm", 3, 20.0, "Clear"),
            sample("rtm", 15 + 23, 5.0, "Clear"),
            sample("rtm", 15 + 25, 50.0, "Clear"),
        ]);

        let points = trends(&store, 2, now()).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].aggregate.date, NaiveDate::from_ymd_opt(2024, 8, 9).unwrap());
        assert_eq!(points[0].aggregate.temp_avg_c, Some(5.0));
        assert_eq!(points[1].aggregate.date, NaiveDate::from_ymd_opt(2024, 8, 10).unwrap());
        assert_eq!(points[1].aggregate.temp_avg_c, Some(15.0));
        assert_eq!(points[1].location_name.as_deref(), Some("Rotterdam Port"));
    }

    #[test]
    fn test_comparison_sorted_by_name() {
        let store = store(vec![
            sample("sin", 5, 31.0, "Clear"),
            sample("rtm", 6, 12.0, "Fog"),
            sample("rtm", 7, 14.0, "Fog"),
            sample("ghost", 8, 1.0, "Clear"),
            sample("rtm", 24 * 4, 0.0, "Clear"),
        ]);

        let rows = comparison(&store, 3, now()).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.location_name.as_str()).collect();

        assert_eq!(names, vec!["Rotterdam Port", "Singapore Hub", "ghost"]);
        assert_eq!(rows[0].sample_count, 2);
        assert_eq!(rows[0].temp_avg_c, Some(13.0));
        // 31 °C adds 10, 1 mm adds 1.5: 11.5 rounds to 12.
        assert_eq!(rows[1].risk_avg, 12.0);
    }

    #[test]
    fn test_live_picks_newest_in_window() {
        let store = store(vec![
            sample("rtm", 4, 11.0, "Clear"),
            sample("rtm", 1, 13.0, "Clear"),
            sample("sin", 2, 30.0, "Thunderstorm"),
            sample("sin", 9, 25.0, "Clear"),
        ]);

        let live = live(&store, 6, now()).unwrap();

        assert_eq!(live.len(), 2);
        assert_eq!(live[0].location_id, "rtm");
        assert_eq!(live[0].temp_c, Some(13.0));
        assert!(!live[0].severe);
        assert_eq!(live[1].location_id, "sin");
        assert_eq!(live[1].condition_code, "Storm");
        assert!(live[1].severe);
    }

    #[test]
    fn test_huge_windows_cover_all_history() {
        let store = store(vec![
            sample("rtm", 1, 10.0, "Clear"),
            sample("sin", 24 * 365 * 30, 20.0, "Clear"),
        ]);

        let metrics = overview(&store, u32::MAX, now()).unwrap();
        assert_eq!(metrics.window_hours, u32::MAX);
        assert_eq!(metrics.sample_count, 2);

        assert_eq!(trends(&store, u32::MAX, now()).unwrap().len(), 2);
        assert_eq!(trends(&store, 200_000_000, now()).unwrap().len(), 2);
        assert_eq!(comparison(&store, u32::MAX, now()).unwrap().len(), 2);
        assert_eq!(comparison(&store, 200_000_000, now()).unwrap().len(), 2);
        assert_eq!(live(&store, u32::MAX, now()).unwrap().len(), 2);
    }

    #[test]
    fn test_window_start_clamps_instead_of_overflowing() {
        assert_eq!(hours_before(now(), u32::MAX), DateTime::<Utc>::MIN_UTC);
        assert_eq!(days_before(now(), u32::MAX), DateTime::<Utc>::MIN_UTC);
        assert_eq!(start_of_day_window(now(), u32::MAX), DateTime::<Utc>::MIN_UTC);
        assert_eq!(hours_before(now(), 2), now() - Duration::hours(2));
        assert_eq!(
            start_of_day_window(now(), 1),
            Utc.with_ymd_and_hms(2024, 8, 10, 0, 0, 0).unwrap()
        );
    }
}
