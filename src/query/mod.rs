//! Dashboard Query Engine
//!
//! Compiles dashboard panel requests into search-engine requests:
//!
//! - **Filter**: `(field, operator, value)` clauses → bool fragments
//! - **Group**: ALL/ANY filter groups → fragment plus query-string label
//! - **Builder**: table, categorical and time-series search requests
//! - **Chart**: axis/breakdown bar visualizations
//! - **Executor**: runs compiled requests through the engine and reshapes them
//!
//! # Examples
//!
//! ```rust,ignore
//! use dashquery::query::{build_search_query, ChartKind, SearchParams, TimeRange};
//!
//! let params = SearchParams::new()
//!     .range(Some(TimeRange::new("2024-01-01T00:00:00Z", "2024-01-08T00:00:00Z")))
//!     .chart(ChartKind::Bar, vec!["country".into(), "city".into()]);
//!
//! let request = build_search_query(&params, &ctx)?;
//! let response = transport.search("alerts-*", &request.to_value()).await?;
//! ```

mod builder;
mod chart;
mod error;
mod executor;
mod filter;
mod group;
mod request;

pub use builder::{
    build_search_query, nested_terms, ChartKind, SearchParams, SortOrder, TimeRange, CHART_AGG,
};
pub use chart::{
    create_bar_chart, AxisSpec, CompiledVisualization, VisualizationRequest, VisualizationShape,
    AXIS_AGG, BREAKDOWN_AGG,
};
pub use error::{QueryError, QueryResult};
pub use executor::{ChartRequest, QueryExecutor, SavedSearchTitle, TableRequest, TableSettings};
pub use filter::{
    Accumulation, FilterClause, FilterCompiler, FilterOperator, Fragment, SourceMembership, Target,
};
pub use group::{build_filter_groups, compile_group, CompiledGroup, FilterGroup, GroupCondition};
pub use request::{
    timestamp_range, Aggregation, AggregationKind, BoolQuery, NamedFilters, QueryClause,
    SearchRequest, SourceFilter, TermsField,
};

use crate::time::TimeSettings;

/// Settings shared by every compiled request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryContext {
    pub time: TimeSettings,
    /// Fields where `is` compiles to a prefix wildcard
    pub wildcard_fields: Vec<String>,
    /// Honor per-request source membership with `should` branches
    pub composite_sources: bool,
}
