use serde::Serialize;
use std::collections::BTreeMap;

use crate::reading::NormalizedReading;

/// Histogram of condition labels, keyed by label text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConditionCounts(BTreeMap<String, usize>);

impl ConditionCounts {
    pub fn from_readings<'a>(readings: impl IntoIterator<Item = &'a NormalizedReading>) -> Self {
        let mut counts = ConditionCounts::default();
        for r in readings {
            counts.record(r.condition.as_str());
        }
        counts
    }

    pub fn record(&mut self, label: &str) {
        *self.0.entry(label.to_string()).or_default() += 1;
    }

    pub fn get(&self, label: &str) -> usize {
        self.0.get(label).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of each label in percent of all counted readings.
    pub fn percentages(&self) -> BTreeMap<String, f64> {
        let total = self.total();
        self.0
            .iter()
            .map(|(label, count)| (label.clone(), Self::pct(*count, total)))
            .collect()
    }

    /// Serialized JSON object, as stored on daily aggregates.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(ConditionCounts::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(ConditionCounts::pct(50, 100), 50.0);
        assert_eq!(ConditionCounts::pct(1, 4), 25.0);
    }

    #[test]
    fn test_clear_and_rain_breakdown() {
        let mut counts = ConditionCounts::default();
        for _ in 0..6 {
            counts.record("Clear");
        }
        for _ in 0..4 {
            counts.record("Rain");
        }

        assert_eq!(counts.get("Clear"), 6);
        assert_eq!(counts.get("Rain"), 4);
        assert_eq!(counts.get("Snow"), 0);
        assert_eq!(counts.total(), 10);

        let pct = counts.percentages();
        assert_eq!(pct["Clear"], 60.0);
        assert_eq!(pct["Rain"], 40.0);
    }

    #[test]
    fn test_to_json_is_sorted_object() {
        let mut counts = ConditionCounts::default();
        counts.record("Rain");
        counts.record("Clear");
        counts.record("Rain");

        assert_eq!(counts.to_json(), r#"{"Clear":1,"Rain":2}"#);
    }

    #[test]
    fn test_empty_counts() {
        let counts = ConditionCounts::default();
        assert!(counts.is_empty());
        assert!(counts.percentages().is_empty());
        assert_eq!(counts.to_json(), "{}");
    }
}
