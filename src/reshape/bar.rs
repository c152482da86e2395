//! Bar and breakdown visualizations

use std::collections::BTreeSet;

use serde::Serialize;

use crate::query::BREAKDOWN_AGG;
use crate::reshape::buckets::Bucket;
use crate::reshape::series::{ChartSeries, Dataset};

/// Axis label used when the request names none
pub const DEFAULT_AXIS_LABEL: &str = "Count";

/// Single-series bar chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarChart {
    pub labels: Vec<String>,
    pub data: Vec<u64>,
    pub x_axis_label: String,
    pub y_axis_label: String,
}

/// One bar per bucket
pub fn reshape_simple_bar(buckets: &[Bucket], x_axis_label: &str, y_axis_label: &str) -> BarChart {
    BarChart {
        labels: buckets.iter().map(Bucket::label).collect(),
        data: buckets.iter().map(|b| b.doc_count).collect(),
        x_axis_label: x_axis_label.to_string(),
        y_axis_label: y_axis_label.to_string(),
    }
}

/// Outer buckets become labels, each distinct breakdown key becomes a dataset
pub fn reshape_breakdown(buckets: &[Bucket]) -> ChartSeries {
    let labels = buckets.iter().map(Bucket::label).collect();

    let keys: BTreeSet<String> = buckets
        .iter()
        .flat_map(|outer| outer.child(BREAKDOWN_AGG).unwrap_or_default())
        .map(Bucket::label)
        .collect();

    let datasets = keys
        .into_iter()
        .map(|key| {
            let data = buckets
                .iter()
                .map(|outer| {
                    outer
                        .child(BREAKDOWN_AGG)
                        .unwrap_or_default()
                        .iter()
                        .find(|inner| inner.label() == key)
                        .map(|inner| inner.doc_count)
                        .unwrap_or(0)
                })
                .collect();
            Dataset { label: key, data }
        })
        .collect();

    ChartSeries { labels, datasets }
}

/// A single bar carrying the total hit count
pub fn reshape_count_only(total: u64, y_axis_label: &str) -> BarChart {
    BarChart {
        labels: vec![y_axis_label.to_string()],
        data: vec![total],
        x_axis_label: DEFAULT_AXIS_LABEL.to_string(),
        y_axis_label: y_axis_label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reshape::buckets::BucketKey;

    fn text(key: &str, count: u64) -> Bucket {
        Bucket::new(BucketKey::Text(key.into()), count)
    }

    #[test]
    fn test_simple_bar() {
        let chart = reshape_simple_bar(&[text("web-1", 5), text("web-2", 3)], "Host", "Events");
        assert_eq!(chart.labels, vec!["web-1", "web-2"]);
        assert_eq!(chart.data, vec![5, 3]);
        assert_eq!(chart.x_axis_label, "Host");
        assert_eq!(chart.y_axis_label, "Events");
    }

    #[test]
    fn test_breakdown_fills_missing_with_zero() {
        let buckets = vec![
            text("web-1", 8).with_child(BREAKDOWN_AGG, vec![text("high", 5), text("low", 3)]),
            text("web-2", 2).with_child(BREAKDOWN_AGG, vec![text("medium", 2)]),
        ];

        let series = reshape_breakdown(&buckets);
        assert_eq!(series.labels, vec!["web-1", "web-2"]);

        let labels: Vec<_> = series.datasets.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["high", "low", "medium"]);
        assert_eq!(series.datasets[0].data, vec![5, 0]);
        assert_eq!(series.datasets[1].data, vec![3, 0]);
        assert_eq!(series.datasets[2].data, vec![0, 2]);
        assert!(series.datasets.iter().all(|d| d.data.len() == buckets.len()));
    }

    #[test]
    fn test_breakdown_numeric_keys() {
        let buckets = vec![text("a", 1).with_child(
            BREAKDOWN_AGG,
            vec![Bucket::new(BucketKey::Integer(404), 1)],
        )];
        let series = reshape_breakdown(&buckets);
        assert_eq!(series.datasets[0].label, "404");
    }

    #[test]
    fn test_count_only() {
        let chart = reshape_count_only(42, "Alerts");
        assert_eq!(chart.labels, vec!["Alerts"]);
        assert_eq!(chart.data, vec![42]);
    }
}
