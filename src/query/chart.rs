//! Bar and breakdown visualizations
//!
//! Compiles an axis and an optional breakdown, each bucketed by fields or by
//! filter groups, into a two-level aggregation named `x` / `breakdown`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::query::error::{QueryError, QueryResult};
use crate::query::group::{build_filter_groups, FilterGroup};
use crate::query::request::{timestamp_range, Aggregation, AggregationKind, NamedFilters, SearchRequest};
use crate::time::{normalize_timestamp, TimeSettings};

/// Name of the top-level visualization aggregation
pub const AXIS_AGG: &str = "x";
/// Name of the breakdown aggregation nested under the axis
pub const BREAKDOWN_AGG: &str = "breakdown";

fn default_axis_size() -> usize {
    5
}

/// One visualization dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default = "default_axis_size")]
    pub size: usize,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub has_filters: bool,
    #[serde(default)]
    pub filters: Vec<FilterGroup>,
}

impl AxisSpec {
    pub fn fields(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            size: default_axis_size(),
            label: None,
            has_filters: false,
            filters: Vec::new(),
        }
    }

    pub fn groups(groups: Vec<FilterGroup>) -> Self {
        Self {
            fields: Vec::new(),
            size: default_axis_size(),
            label: None,
            has_filters: true,
            filters: groups,
        }
    }

    /// Compile into a `filters`, `terms` or `multi_terms` aggregation
    pub fn to_aggregation(&self) -> QueryResult<Aggregation> {
        if self.has_filters {
            let mut filters = NamedFilters::new();
            for group in build_filter_groups(&self.filters)? {
                filters.insert(group.label, group.fragment);
            }
            return Ok(Aggregation::new(AggregationKind::Filters {
                keyed: false,
                filters,
            }));
        }

        if self.fields.is_empty() {
            return Err(QueryError::MissingChartFields("bar".to_string()));
        }
        Ok(Aggregation::terms_for(&self.fields, self.size))
    }
}

/// A bar/breakdown visualization request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationRequest {
    pub index: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, alias = "xAxis")]
    pub x_axis: Option<AxisSpec>,
    #[serde(default, alias = "yAxis")]
    pub y_axis: Option<AxisSpec>,
    #[serde(default)]
    pub breakdown: Option<AxisSpec>,
    #[serde(default)]
    pub gte: Option<String>,
    #[serde(default)]
    pub lte: Option<String>,
    #[serde(default)]
    pub custom_filter: Vec<FilterGroup>,
}

/// Which aggregations a compiled visualization carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualizationShape {
    /// No axis, no breakdown: hit count only
    CountOnly,
    /// A single `x` aggregation
    Simple,
    /// `x` with a nested `breakdown`
    Breakdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledVisualization {
    pub request: SearchRequest,
    pub shape: VisualizationShape,
}

/// Compile a visualization into a size-0 aggregation request
pub fn create_bar_chart(
    viz: &VisualizationRequest,
    time: &TimeSettings,
) -> QueryResult<CompiledVisualization> {
    let mut request = SearchRequest::new(0);

    if let (Some(gte), Some(lte)) = (viz.gte.as_deref(), viz.lte.as_deref()) {
        let gte = normalize_timestamp(gte, time.utc_offset)?;
        let lte = normalize_timestamp(lte, time.utc_offset)?;
        request.bool_query().filter.push(timestamp_range(&gte, &lte));
    }

    for group in build_filter_groups(&viz.custom_filter)? {
        request.bool_query().filter.push(group.fragment);
    }

    let axis = viz.x_axis.as_ref().map(AxisSpec::to_aggregation).transpose()?;
    let breakdown = viz.breakdown.as_ref().map(AxisSpec::to_aggregation).transpose()?;

    let (top, shape) = match (axis, breakdown) {
        (Some(axis), Some(breakdown)) => (
            Some(axis.with_child(BREAKDOWN_AGG, breakdown)),
            VisualizationShape::Breakdown,
        ),
        (Some(single), None) | (None, Some(single)) => (Some(single), VisualizationShape::Simple),
        (None, None) => (None, VisualizationShape::CountOnly),
    };

    match top {
        Some(agg) => {
            request.aggs.insert(AXIS_AGG.to_string(), agg);
        }
        None => request.track_total_hits = Some(true),
    }

    debug!(
        index = %viz.index,
        shape = ?shape,
        body = %request.to_value(),
        "Compiled visualization"
    );
    Ok(CompiledVisualization { request, shape })
}
