//! Gap-filled time series

use std::collections::HashMap;

use serde::Serialize;

use crate::reshape::buckets::Bucket;
use crate::time::IntervalPlan;

/// Label of the single dataset in a time-series chart
pub const TIMESTAMP_DATASET: &str = "timestamp";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<u64>,
}

/// Labels plus one or more equally long datasets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// Align histogram buckets onto the plan's dense timeline.
///
/// Every timeline label gets a value; buckets whose label falls outside the
/// timeline are dropped.
pub fn reshape_time_series(buckets: &[Bucket], plan: &IntervalPlan) -> ChartSeries {
    let labels = plan.labels();

    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(labels.len());
    for (idx, label) in labels.iter().enumerate() {
        positions.entry(label.as_str()).or_insert(idx);
    }

    let mut data = vec![0; labels.len()];
    for bucket in buckets {
        let Some(label) = bucket.key.as_millis().and_then(|ms| plan.bucket_label(ms)) else {
            continue;
        };
        if let Some(&idx) = positions.get(label.as_str()) {
            data[idx] = bucket.doc_count;
        }
    }

    ChartSeries {
        datasets: vec![Dataset {
            label: TIMESTAMP_DATASET.to_string(),
            data,
        }],
        labels,
    }
}
