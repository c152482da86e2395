//! # dashquery
//!
//! Dashboard query engine - compiles dashboard panel requests into
//! Elasticsearch-compatible search requests and reshapes the bucket responses
//! into gap-filled chart series.
//!
//! ## Modules
//!
//! - [`time`]: Timestamp normalization, interval selection, dense timelines
//! - [`query`]: Filter compilation, search/aggregation building, execution
//! - [`reshape`]: Bucket responses → chart payloads and table rows
//! - [`engine`]: Search transport, per-index routing and the field catalog
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust
//! use dashquery::query::{build_search_query, ChartKind, QueryContext, SearchParams, TimeRange};
//!
//! let params = SearchParams::new()
//!     .range(Some(TimeRange::new("2024-01-01T00:00:00Z", "2024-01-01T00:00:10Z")))
//!     .chart(ChartKind::Line, Vec::new());
//!
//! let request = build_search_query(&params, &QueryContext::default()).unwrap();
//! let body = request.to_value();
//! assert_eq!(body["aggs"]["chart_data"]["date_histogram"]["fixed_interval"], "1s");
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod query;
pub mod reshape;
pub mod time;

// Re-export top-level types for convenience
pub use time::{IntervalBand, IntervalPlan, TimeError, TimeResult, TimeSettings};

pub use query::{
    build_search_query, create_bar_chart, ChartKind, ChartRequest, FilterClause, FilterGroup,
    QueryContext, QueryError, QueryExecutor, QueryResult, SearchParams, SearchRequest,
    TableRequest, VisualizationRequest,
};

pub use reshape::{ChartPayload, SearchResponse, TablePage};

pub use engine::{
    EngineError, EngineResult, FieldCatalog, HttpTransport, SearchTransport, TransportRouter,
};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError};
