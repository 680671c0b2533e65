use crate::analyzers::types::{Summary, TimeWindow};
use crate::analyzers::utility::{max, mean, min, numeric_values, sum};
use crate::reading::NormalizedReading;
use crate::risk::{is_severe, risk_score};
use crate::stats::ConditionCounts;

/// Aggregates a group of readings into a [`Summary`].
///
/// Returns `None` for an empty group: a grouping key with no readings has no
/// aggregate at all rather than a zero-filled one.
pub fn aggregate(readings: &[NormalizedReading]) -> Option<Summary> {
    if readings.is_empty() {
        return None;
    }

    let temps = numeric_values(readings.iter().map(|r| r.temp_c));
    let winds = numeric_values(readings.iter().map(|r| r.wind_speed_ms));
    let precip = numeric_values(readings.iter().map(|r| r.precip_mm));
    let visibility = numeric_values(readings.iter().map(|r| r.visibility_km));
    let risks: Vec<f64> = readings.iter().map(|r| risk_score(r) as f64).collect();

    Some(Summary {
        count: readings.len(),
        temp_avg_c: mean(&temps),
        temp_min_c: min(&temps),
        temp_max_c: max(&temps),
        wind_avg_ms: mean(&winds),
        precip_total_mm: sum(&precip),
        visibility_avg_km: mean(&visibility),
        condition_counts: ConditionCounts::from_readings(readings),
        severe_count: readings.iter().filter(|r| is_severe(r)).count(),
        risk_avg: mean(&risks).unwrap_or(0.0),
    })
}

/// Aggregates only the readings observed inside `window`.
pub fn aggregate_window(readings: &[NormalizedReading], window: &TimeWindow) -> Option<Summary> {
    let in_window: Vec<NormalizedReading> = readings
        .iter()
        .filter(|r| window.contains(r.observed_at))
        .cloned()
        .collect();

    aggregate(&in_window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::Condition;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, hour, 0, 0).unwrap()
    }

    fn reading(hour: u32, temp: Option<f64>, condition: Condition) -> NormalizedReading {
        NormalizedReading {
            observed_at: at(hour),
            temp_c: temp,
            wind_speed_ms: None,
            precip_mm: None,
            visibility_km: None,
            condition,
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_empty_group_has_no_aggregate() {
        assert!(aggregate(&[]).is_none());
    }

    #[test]
    fn test_temperature_statistics() {
        let readings = vec![
            reading(1, Some(10.0), Condition::Clear),
            reading(2, Some(20.0), Condition::Clear),
            reading(3, Some(30.0), Condition::Clear),
        ];

        let summary = aggregate(&readings).unwrap();

        assert_eq!(summary.count, 3);
        assert_eq!(summary.temp_avg_c, Some(20.0));
        assert_eq!(summary.temp_min_c, Some(10.0));
        assert_eq!(summary.temp_max_c, Some(30.0));
    }

    #[test]
    fn test_nulls_are_skipped_not_zeroed() {
        let mut readings = vec![
            reading(1, Some(10.0), Condition::Clear),
            reading(2, None, Condition::Clear),
        ];
        readings[0].precip_mm = Some(2.0);
        readings[1].precip_mm = Some(3.5);

        let summary = aggregate(&readings).unwrap();

        assert_eq!(summary.temp_avg_c, Some(10.0));
        assert_eq!(summary.precip_total_mm, Some(5.5));
        assert_eq!(summary.wind_avg_ms, None);
        assert_eq!(summary.visibility_avg_km, None);
    }

    #[test]
    fn test_histogram_counts_every_reading() {
        let mut readings = Vec::new();
        for h in 0..6 {
            readings.push(reading(h, None, Condition::Clear));
        }
        for h in 6..10 {
            readings.push(reading(h, Some(f64::NAN), Condition::Rain));
        }

        let summary = aggregate(&readings).unwrap();

        assert_eq!(summary.count, 10);
        assert_eq!(summary.condition_counts.get("Clear"), 6);
        assert_eq!(summary.condition_counts.get("Rain"), 4);
        assert_eq!(summary.condition_counts.percentages()["Clear"], 60.0);
        assert_eq!(summary.temp_avg_c, None);
    }

    #[test]
    fn test_severe_count_and_risk_average() {
        let mut calm = reading(1, Some(15.0), Condition::Clear);
        calm.wind_speed_ms = Some(0.0);
        let mut windy = reading(2, Some(15.0), Condition::Clear);
        windy.wind_speed_ms = Some(25.0);
        let storm = reading(3, Some(15.0), Condition::Storm);

        let summary = aggregate(&[calm, windy, storm]).unwrap();

        assert_eq!(summary.severe_count, 2);
        assert_eq!(summary.risk_avg, 11.0);
    }

    #[test]
    fn test_window_filters_before_aggregating() {
        let readings = vec![
            reading(1, Some(5.0), Condition::Clear),
            reading(5, Some(15.0), Condition::Clear),
            reading(9, Some(25.0), Condition::Clear),
        ];

        let since = aggregate_window(&readings, &TimeWindow::since(at(5))).unwrap();
        assert_eq!(since.count, 2);
        assert_eq!(since.temp_avg_c, Some(20.0));

        let between = aggregate_window(&readings, &TimeWindow::between(at(1), at(5))).unwrap();
        assert_eq!(between.count, 2);
        assert_eq!(between.temp_avg_c, Some(10.0));

        let later = TimeWindow::since(at(9) + Duration::hours(1));
        assert!(aggregate_window(&readings, &later).is_none());
    }
}
