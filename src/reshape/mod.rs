//! Response reshaping
//!
//! Turns engine responses into chart payloads:
//!
//! - categorical charts → recursive `{key, count, children?}` trees
//! - time-series charts → one zero-filled dataset aligned on the dense timeline
//! - breakdown visualizations → one dataset per breakdown key
//! - simple bar visualizations → labels and counts
//!
//! A response without `aggregations` yields [`ChartPayload::NoContent`].

mod bar;
mod buckets;
mod document;
mod series;

pub use bar::{
    reshape_breakdown, reshape_count_only, reshape_simple_bar, BarChart, DEFAULT_AXIS_LABEL,
};
pub use buckets::{bucket_list, Bucket, BucketKey, Hit, SearchResponse};
pub use document::{flatten_document, TablePage};
pub use series::{reshape_time_series, ChartSeries, Dataset, TIMESTAMP_DATASET};

use serde::Serialize;

use crate::query::{ChartKind, VisualizationRequest, VisualizationShape, AXIS_AGG, CHART_AGG};
use crate::time::IntervalPlan;

/// One node of a categorical bucket tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedBucket {
    pub key: BucketKey,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ParsedBucket>>,
}

/// Recursively convert buckets into `{key, count, children?}` nodes.
///
/// The first nested aggregation by name becomes `children`.
pub fn parse_buckets(buckets: &[Bucket]) -> Vec<ParsedBucket> {
    buckets
        .iter()
        .map(|bucket| ParsedBucket {
            key: bucket.key.clone(),
            count: bucket.doc_count,
            children: bucket.first_child().map(parse_buckets),
        })
        .collect()
}

/// Chart-ready output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ChartPayload {
    Buckets(Vec<ParsedBucket>),
    Series(ChartSeries),
    Bar(BarChart),
    /// Nothing to draw
    NoContent,
}

/// Reshape a chart-data response.
///
/// Time-series charts need the plan their request was built from.
pub fn reshape_chart(
    kind: ChartKind,
    response: &SearchResponse,
    plan: Option<&IntervalPlan>,
) -> ChartPayload {
    let Some(buckets) = response.aggregation(CHART_AGG) else {
        return ChartPayload::NoContent;
    };

    match (kind, plan) {
        (kind, _) if kind.is_categorical() => ChartPayload::Buckets(parse_buckets(buckets)),
        (kind, Some(plan)) if kind.is_time_series() => {
            ChartPayload::Series(reshape_time_series(buckets, plan))
        }
        _ => ChartPayload::NoContent,
    }
}

/// Reshape a bar/breakdown visualization response
pub fn reshape_visualization(
    viz: &VisualizationRequest,
    shape: VisualizationShape,
    response: &SearchResponse,
) -> ChartPayload {
    let x_label = axis_label(viz.x_axis.as_ref().and_then(|a| a.label.as_deref()));
    let y_label = axis_label(viz.y_axis.as_ref().and_then(|a| a.label.as_deref()));

    if shape == VisualizationShape::CountOnly {
        return ChartPayload::Bar(reshape_count_only(response.total, y_label));
    }

    let Some(buckets) = response.aggregation(AXIS_AGG) else {
        return ChartPayload::NoContent;
    };

    match shape {
        VisualizationShape::Breakdown => ChartPayload::Series(reshape_breakdown(buckets)),
        _ => ChartPayload::Bar(reshape_simple_bar(buckets, x_label, y_label)),
    }
}

fn axis_label(label: Option<&str>) -> &str {
    label.filter(|l| !l.is_empty()).unwrap_or(DEFAULT_AXIS_LABEL)
}
