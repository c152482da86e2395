//! Search request assembly
//!
//! [`build_search_query`] turns [`SearchParams`] into a [`SearchRequest`]: time
//! range, free text, compiled filters, projection, paging, sorting and, per
//! chart kind, a nested terms aggregation or a gap-filling date histogram.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::query::error::{QueryError, QueryResult};
use crate::query::filter::{Accumulation, FilterClause, FilterCompiler, SourceMembership};
use crate::query::request::{timestamp_range, Aggregation, AggregationKind, SearchRequest, SourceFilter};
use crate::query::QueryContext;
use crate::time::{normalize_timestamp, IntervalPlan};

/// Name of the aggregation carrying chart buckets
pub const CHART_AGG: &str = "chart_data";

/// Chart shapes a dashboard panel can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Donut,
    Line,
    Area,
    Table,
}

impl ChartKind {
    /// Bar, pie and donut charts bucket by field values
    pub fn is_categorical(self) -> bool {
        matches!(self, Self::Bar | Self::Pie | Self::Donut)
    }

    /// Line and area charts bucket by time
    pub fn is_time_series(self) -> bool {
        matches!(self, Self::Line | Self::Area)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Pie => "pie",
            Self::Donut => "donut",
            Self::Line => "line",
            Self::Area => "area",
            Self::Table => "table",
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller time range, local timestamps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub gte: String,
    pub lte: String,
}

impl TimeRange {
    pub fn new(gte: impl Into<String>, lte: impl Into<String>) -> Self {
        Self {
            gte: gte.into(),
            lte: lte.into(),
        }
    }

    /// Both bounds, when both are present
    pub fn from_bounds(gte: Option<&str>, lte: Option<&str>) -> Option<Self> {
        match (gte, lte) {
            (Some(gte), Some(lte)) => Some(Self::new(gte, lte)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Inputs to [`build_search_query`]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub range: Option<TimeRange>,
    pub text: Option<String>,
    pub filters: Vec<FilterClause>,
    pub selected_fields: Vec<String>,
    pub page: usize,
    pub size: usize,
    pub sort: Option<(String, SortOrder)>,
    pub search_after: Option<Vec<Value>>,
    pub chart: Option<ChartKind>,
    pub chart_fields: Vec<String>,
    pub membership: Option<SourceMembership>,
    pub ignore_field: Option<String>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            range: None,
            text: None,
            filters: Vec::new(),
            selected_fields: Vec::new(),
            page: 1,
            size: 20,
            sort: None,
            search_after: None,
            chart: None,
            chart_fields: Vec::new(),
            membership: None,
            ignore_field: None,
        }
    }
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(mut self, range: Option<TimeRange>) -> Self {
        self.range = range;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn filters(mut self, filters: Vec<FilterClause>) -> Self {
        self.filters = filters;
        self
    }

    pub fn select(mut self, fields: Vec<String>) -> Self {
        self.selected_fields = fields;
        self
    }

    /// One-based page number and page size
    pub fn page(mut self, page: usize, size: usize) -> Self {
        self.page = page;
        self.size = size;
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    pub fn search_after(mut self, values: Vec<Value>) -> Self {
        self.search_after = Some(values);
        self
    }

    pub fn chart(mut self, kind: ChartKind, fields: Vec<String>) -> Self {
        self.chart = Some(kind);
        self.chart_fields = fields;
        self
    }

    pub fn membership(mut self, membership: SourceMembership) -> Self {
        self.membership = Some(membership);
        self
    }

    pub fn ignore_field(mut self, field: impl Into<String>) -> Self {
        self.ignore_field = Some(field.into());
        self
    }

    fn from_offset(&self) -> QueryResult<usize> {
        self.page
            .saturating_sub(1)
            .checked_mul(self.size)
            .ok_or(QueryError::PageOutOfRange {
                page: self.page,
                size: self.size,
            })
    }
}

/// Assemble a search request
pub fn build_search_query(params: &SearchParams, ctx: &QueryContext) -> QueryResult<SearchRequest> {
    let mut request = SearchRequest::new(params.size);
    request.from = Some(params.from_offset()?);
    request.track_total_hits = Some(true);

    if let Some(range) = &params.range {
        let gte = normalize_timestamp(&range.gte, ctx.time.utc_offset)?;
        let lte = normalize_timestamp(&range.lte, ctx.time.utc_offset)?;
        request.bool_query().filter.push(timestamp_range(&gte, &lte));
    }

    if !params.selected_fields.is_empty() {
        request.source = Some(SourceFilter {
            includes: params.selected_fields.clone(),
        });
    }

    if let Some(text) = params.text.as_deref().filter(|t| !t.trim().is_empty()) {
        request.bool_query().must.push(free_text(text));
    }

    if !params.filters.is_empty() {
        let accumulation = match params.membership {
            Some(membership) if ctx.composite_sources => Accumulation::Composite(membership),
            _ => Accumulation::Direct,
        };
        FilterCompiler::new(&ctx.wildcard_fields)
            .accumulation(accumulation)
            .ignoring(params.ignore_field.as_deref())
            .apply(&params.filters, request.bool_query())?;
    }

    match params.chart {
        Some(kind) if kind.is_categorical() => {
            let agg = nested_terms(&params.chart_fields, params.size)
                .ok_or_else(|| QueryError::MissingChartFields(kind.to_string()))?;
            request.aggs.insert(CHART_AGG.to_string(), agg);
        }
        Some(kind) if kind.is_time_series() => {
            let range = params
                .range
                .as_ref()
                .ok_or_else(|| QueryError::MissingTimeRange(kind.to_string()))?;
            let plan = IntervalPlan::new(&range.gte, &range.lte, &ctx.time)?;
            request
                .aggs
                .insert(CHART_AGG.to_string(), date_histogram(&plan, range));
        }
        _ => {}
    }

    if let Some((field, order)) = &params.sort {
        request.sort.push(json!({ field.as_str(): {"order": order.as_str()} }));
    }

    if let Some(after) = &params.search_after {
        request.search_after = Some(after.clone());
    }

    debug!(body = %request.to_value(), "Built search query");
    Ok(request)
}

/// `multi_match` over all fields; quoted text switches to phrase matching
fn free_text(text: &str) -> Value {
    let phrase = text.contains('"');
    json!({
        "multi_match": {
            "query": text.replace('"', ""),
            "type": if phrase { "phrase" } else { "best_fields" },
            "lenient": true,
        }
    })
}

/// Terms aggregation nested one level per field.
///
/// The first field is outermost. Child levels are named `level_N`, where `N`
/// counts up from the innermost level (`level_1` holds the last field).
pub fn nested_terms(fields: &[String], size: usize) -> Option<Aggregation> {
    let mut levels = fields.iter().rev().enumerate();
    let (_, innermost) = levels.next()?;
    let mut agg = Aggregation::terms(innermost.clone(), size);
    for (depth, field) in levels {
        agg = Aggregation::terms(field.clone(), size).with_child(format!("level_{}", depth), agg);
    }
    Some(agg)
}

/// Gap-filling date histogram on `@timestamp`
fn date_histogram(plan: &IntervalPlan, range: &TimeRange) -> Aggregation {
    let mut body = serde_json::Map::new();
    body.insert("field".into(), json!("@timestamp"));
    body.extend(plan.interval().to_json());
    body.insert("min_doc_count".into(), json!(0));
    body.insert(
        "extended_bounds".into(),
        json!({"min": range.gte, "max": range.lte}),
    );
    Aggregation::new(AggregationKind::DateHistogram(body))
}
