//! Query Executor
//!
//! Runs compiled requests through the engine and reshapes the responses:
//!
//! ```text
//! Request → Compile → Route → Search → Reshape → Payload
//! ```
//!
//! Tables are driven by saved searches: the saved search supplies the
//! projected columns, base filters and target index.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::engine::{EngineError, TransportRouter};
use crate::query::builder::{build_search_query, ChartKind, SearchParams, SortOrder, TimeRange};
use crate::query::chart::{create_bar_chart, VisualizationRequest};
use crate::query::error::{QueryError, QueryResult};
use crate::query::filter::{FilterClause, SourceMembership};
use crate::query::request::SearchRequest;
use crate::query::QueryContext;
use crate::reshape::{reshape_chart, reshape_visualization, ChartPayload, SearchResponse, TablePage};
use crate::time::IntervalPlan;

fn default_chart_size() -> usize {
    10
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

/// A chart-data request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub index: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: ChartKind,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub filter: Vec<FilterClause>,
    #[serde(default = "default_chart_size")]
    pub size: usize,
    #[serde(default)]
    pub gte: Option<String>,
    #[serde(default)]
    pub lte: Option<String>,
    #[serde(default)]
    pub membership: Option<SourceMembership>,
    /// Field whose clauses are dropped before compiling
    #[serde(default)]
    pub ignore_field: Option<String>,
}

impl ChartRequest {
    /// Search parameters for this chart
    pub fn to_params(&self) -> SearchParams {
        let mut params = SearchParams::new()
            .range(TimeRange::from_bounds(self.gte.as_deref(), self.lte.as_deref()))
            .filters(self.filter.clone())
            .page(1, self.size)
            .chart(self.kind, self.fields.clone());
        params.membership = self.membership;
        params.ignore_field = self.ignore_field.clone();
        params
    }

    /// Interval plan for time-series kinds with a full range
    pub fn plan(&self, ctx: &QueryContext) -> QueryResult<Option<IntervalPlan>> {
        if !self.kind.is_time_series() {
            return Ok(None);
        }
        match (self.gte.as_deref(), self.lte.as_deref()) {
            (Some(gte), Some(lte)) => Ok(Some(IntervalPlan::new(gte, lte, &ctx.time)?)),
            _ => Err(QueryError::MissingTimeRange(self.kind.to_string())),
        }
    }
}

/// A table page request against a saved search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRequest {
    pub index: String,
    pub title: String,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
    #[serde(default)]
    pub sort_field: Option<String>,
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
    #[serde(default)]
    pub gte: Option<String>,
    #[serde(default)]
    pub lte: Option<String>,
    #[serde(default)]
    pub custom_filter: Vec<FilterClause>,
}

/// Where saved searches live and which indices ignore time ranges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSettings {
    pub saved_searches_index: String,
    pub undated_indices: Vec<String>,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            saved_searches_index: "saved_searches".to_string(),
            undated_indices: vec!["wazuh-states-vulnerabilities-*".to_string()],
        }
    }
}

/// Stored table definition
#[derive(Debug, Clone, Deserialize)]
struct SavedSearch {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    filter: Vec<FilterClause>,
    index_name: String,
}

/// Title and index of one saved search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedSearchTitle {
    pub title: String,
    pub index: String,
}

/// Executes dashboard requests against the engine
pub struct QueryExecutor {
    router: Arc<TransportRouter>,
    context: QueryContext,
    tables: TableSettings,
}

impl QueryExecutor {
    /// Create a new executor
    pub fn new(router: Arc<TransportRouter>, context: QueryContext) -> Self {
        Self {
            router,
            context,
            tables: TableSettings::default(),
        }
    }

    pub fn with_tables(mut self, tables: TableSettings) -> Self {
        self.tables = tables;
        self
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    pub fn router(&self) -> &Arc<TransportRouter> {
        &self.router
    }

    /// Run a search on the transport routed for `index`
    async fn search(&self, index: &str, body: &Value) -> QueryResult<SearchResponse> {
        let transport = self.router.for_index(index);
        debug!(index, transport = transport.name(), "Executing search");
        let raw = transport.search(index, body).await?;
        Ok(SearchResponse::from_value(&raw))
    }

    async fn run(&self, index: &str, request: &SearchRequest) -> QueryResult<SearchResponse> {
        self.search(index, &request.to_value()).await
    }

    /// Categorical or time-series chart data
    pub async fn chart_data(&self, chart: &ChartRequest) -> QueryResult<ChartPayload> {
        let plan = chart.plan(&self.context)?;
        let request = build_search_query(&chart.to_params(), &self.context)?;
        let response = self.run(&chart.index, &request).await?;

        let payload = reshape_chart(chart.kind, &response, plan.as_ref());
        debug!(index = %chart.index, kind = %chart.kind, "Chart data reshaped");
        Ok(payload)
    }

    /// Bar or breakdown visualization
    pub async fn bar_visualization(&self, viz: &VisualizationRequest) -> QueryResult<ChartPayload> {
        let compiled = create_bar_chart(viz, &self.context.time)?;
        let response = self.run(&viz.index, &compiled.request).await?;
        Ok(reshape_visualization(viz, compiled.shape, &response))
    }

    /// One page of a saved search, with caller filters appended
    pub async fn table_data(&self, table: &TableRequest) -> QueryResult<TablePage> {
        let saved = self.saved_search(&table.title, &table.index).await?;

        let range = if self.tables.undated_indices.iter().any(|i| i == &saved.index_name) {
            None
        } else {
            TimeRange::from_bounds(table.gte.as_deref(), table.lte.as_deref())
        };

        let mut filters = saved.filter;
        filters.extend(table.custom_filter.iter().cloned());

        let mut params = SearchParams::new()
            .range(range)
            .filters(filters)
            .select(saved.columns)
            .page(table.page, table.size);
        if let Some(field) = &table.sort_field {
            params = params.sort(field.clone(), table.sort_order.unwrap_or(SortOrder::Desc));
        }

        let request = build_search_query(&params, &self.context)?;
        let response = self.run(&saved.index_name, &request).await?;
        Ok(TablePage::from_response(&response))
    }

    async fn saved_search(&self, title: &str, index: &str) -> QueryResult<SavedSearch> {
        let body = json!({
            "query": {"bool": {"must": [
                {"term": {"title.keyword": title}},
                {"term": {"index_name.keyword": index}}
            ]}}
        });

        let response = self.search(&self.tables.saved_searches_index, &body).await?;
        let hit = response
            .hits
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::NotFound(format!("saved search '{}' on {}", title, index)))?;

        serde_json::from_value(Value::Object(hit.source))
            .map_err(|e| EngineError::Decode(format!("saved search '{}': {}", title, e)).into())
    }

    /// Every saved search with both a title and an index
    pub async fn saved_search_titles(&self) -> QueryResult<Vec<SavedSearchTitle>> {
        let body = json!({
            "query": {"match_all": {}},
            "size": 1000,
            "_source": ["title", "index_name"]
        });

        let response = self.search(&self.tables.saved_searches_index, &body).await?;
        let titles: Vec<SavedSearchTitle> = response
            .hits
            .iter()
            .filter_map(|hit| {
                Some(SavedSearchTitle {
                    title: hit.source.get("title")?.as_str()?.to_string(),
                    index: hit.source.get("index_name")?.as_str()?.to_string(),
                })
            })
            .collect();

        info!(count = titles.len(), "Loaded saved search titles");
        Ok(titles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryTransport;
    use crate::query::chart::AxisSpec;
    use crate::reshape::{BucketKey, ParsedBucket};

    fn executor(transport: MemoryTransport) -> (QueryExecutor, Arc<MemoryTransport>) {
        let transport = Arc::new(transport);
        let router = TransportRouter::new(transport.clone());
        (QueryExecutor::new(Arc::new(router), QueryContext::default()), transport)
    }

    fn chart(kind: ChartKind, fields: &[&str]) -> ChartRequest {
        ChartRequest {
            index: "alerts-*".into(),
            title: None,
            kind,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            filter: Vec::new(),
            size: 10,
            gte: None,
            lte: None,
            membership: None,
            ignore_field: None,
        }
    }

    fn table(title: &str) -> TableRequest {
        TableRequest {
            index: "alerts-*".into(),
            title: title.into(),
            page: 2,
            size: 10,
            sort_field: Some("@timestamp".into()),
            sort_order: None,
            gte: Some("2024-01-01T00:00:00Z".into()),
            lte: Some("2024-01-02T00:00:00Z".into()),
            custom_filter: vec![FilterClause::new("agent.name", "is", json!("web-1"))],
        }
    }

    fn saved_search_hit(index_name: &str) -> Value {
        json!({"hits": {"total": {"value": 1}, "hits": [{
            "_id": "s1",
            "_source": {
                "title": "Failed logins",
                "index_name": index_name,
                "columns": ["agent.name", "rule.level"],
                "filter": [{"field": "rule.level", "operator": "is_between", "value": [5, 10]}]
            }
        }]}})
    }

    #[test]
    fn test_chart_request_deserializes() {
        let chart: ChartRequest = serde_json::from_value(json!({
            "index": "alerts-*",
            "type": "donut",
            "fields": ["rule.level"]
        }))
        .unwrap();
        assert_eq!(chart.kind, ChartKind::Donut);
        assert_eq!(chart.size, 10);
        assert!(chart.filter.is_empty());
    }

    #[tokio::test]
    async fn test_categorical_chart() {
        let (executor, transport) = executor(MemoryTransport::named("primary").with_search(
            "alerts-*",
            json!({"hits": {"total": {"value": 7}, "hits": []}, "aggregations": {"chart_data": {"buckets": [
                {"key": "US", "doc_count": 5, "level_1": {"buckets": [{"key": "NYC", "doc_count": 5}]}},
                {"key": "FR", "doc_count": 2, "level_1": {"buckets": []}}
            ]}}}),
        ));

        let payload = executor.chart_data(&chart(ChartKind::Bar, &["country", "city"])).await.unwrap();
        let ChartPayload::Buckets(buckets) = payload else {
            panic!("expected buckets");
        };
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].key, BucketKey::Text("US".into()));
        assert_eq!(
            buckets[0].children.as_deref(),
            Some(
                &[ParsedBucket {
                    key: BucketKey::Text("NYC".into()),
                    count: 5,
                    children: None,
                }][..]
            )
        );

        let (_, body) = transport.requests().pop().unwrap();
        assert_eq!(body["aggs"]["chart_data"]["terms"]["field"], "country");
        assert_eq!(body["aggs"]["chart_data"]["aggs"]["level_1"]["terms"]["field"], "city");
    }

    #[tokio::test]
    async fn test_time_series_chart() {
        let (executor, _) = executor(MemoryTransport::named("primary").with_search(
            "alerts-*",
            json!({"hits": {"total": 4, "hits": []}, "aggregations": {"chart_data": {"buckets": [
                {"key": 1704240000000_i64, "doc_count": 4}
            ]}}}),
        ));

        let mut request = chart(ChartKind::Line, &[]);
        request.gte = Some("2024-01-01T00:00:00Z".into());
        request.lte = Some("2024-01-10T00:00:00Z".into());

        let ChartPayload::Series(series) = executor.chart_data(&request).await.unwrap() else {
            panic!("expected series");
        };
        assert_eq!(series.labels.len(), 10);
        assert_eq!(series.labels[2], "2024-01-03");
        assert_eq!(series.datasets[0].data[2], 4);
        assert_eq!(series.datasets[0].data.iter().sum::<u64>(), 4);
    }

    #[tokio::test]
    async fn test_time_series_requires_range() {
        let (executor, _) = executor(MemoryTransport::named("primary"));
        let err = executor.chart_data(&chart(ChartKind::Area, &[])).await.unwrap_err();
        assert!(matches!(err, QueryError::MissingTimeRange(_)));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_missing_aggregations_is_no_content() {
        let (executor, _) = executor(
            MemoryTransport::named("primary")
                .with_search("alerts-*", json!({"hits": {"total": {"value": 0}, "hits": []}})),
        );
        let payload = executor.chart_data(&chart(ChartKind::Pie, &["rule.level"])).await.unwrap();
        assert_eq!(payload, ChartPayload::NoContent);
    }

    #[tokio::test]
    async fn test_engine_failure_propagates() {
        let (executor, _) = executor(MemoryTransport::named("primary"));
        let err = executor.chart_data(&chart(ChartKind::Bar, &["a"])).await.unwrap_err();
        assert!(matches!(err, QueryError::Engine(_)));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_bar_visualization() {
        let (executor, _) = executor(MemoryTransport::named("primary").with_search(
            "alerts-*",
            json!({"hits": {"total": {"value": 3}, "hits": []}, "aggregations": {"x": {"buckets": [
                {"key": "web-1", "doc_count": 2},
                {"key": "web-2", "doc_count": 1}
            ]}}}),
        ));

        let viz = VisualizationRequest {
            index: "alerts-*".into(),
            title: None,
            kind: Some("bar".into()),
            x_axis: Some(AxisSpec::fields(&["agent.name"])),
            y_axis: None,
            breakdown: None,
            gte: None,
            lte: None,
            custom_filter: Vec::new(),
        };

        let ChartPayload::Bar(bar) = executor.bar_visualization(&viz).await.unwrap() else {
            panic!("expected bar");
        };
        assert_eq!(bar.labels, vec!["web-1", "web-2"]);
        assert_eq!(bar.data, vec![2, 1]);
        assert_eq!(bar.y_axis_label, "Count");
    }

    #[tokio::test]
    async fn test_table_data() {
        let (executor, transport) = executor(
            MemoryTransport::named("primary")
                .with_search("saved_searches", saved_search_hit("alerts-*"))
                .with_search(
                    "alerts-*",
                    json!({"hits": {"total": {"value": 42}, "hits": [
                        {"_id": "d1", "_source": {"agent": {"name": "web-1"}, "rule": {"level": 7}}}
                    ]}}),
                ),
        );

        let page = executor.table_data(&table("Failed logins")).await.unwrap();
        assert_eq!(page.total_records, 42);
        assert_eq!(page.details[0]["agent.name"], "web-1");
        assert_eq!(page.details[0]["_id"], "d1");

        let requests = transport.requests();
        let (index, lookup) = &requests[0];
        assert_eq!(index, "saved_searches");
        assert_eq!(lookup["query"]["bool"]["must"][0]["term"]["title.keyword"], "Failed logins");

        let (index, body) = &requests[1];
        assert_eq!(index, "alerts-*");
        assert_eq!(body["from"], 10);
        assert_eq!(body["_source"]["includes"], json!(["agent.name", "rule.level"]));
        assert_eq!(body["sort"][0]["@timestamp"]["order"], "desc");
        // range + saved between + custom is
        assert_eq!(body["query"]["bool"]["filter"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_undated_index_skips_range() {
        let undated = "wazuh-states-vulnerabilities-*";
        let (executor, transport) = executor(
            MemoryTransport::named("primary")
                .with_search("saved_searches", saved_search_hit(undated))
                .with_search(undated, json!({"hits": {"total": {"value": 0}, "hits": []}})),
        );

        let mut request = table("Failed logins");
        request.custom_filter.clear();
        executor.table_data(&request).await.unwrap();

        let (index, body) = transport.requests().pop().unwrap();
        assert_eq!(index, undated);
        let filter = body["query"]["bool"]["filter"].as_array().unwrap();
        assert_eq!(filter.len(), 1);
        assert!(filter[0].get("range").and_then(|r| r.get("@timestamp")).is_none());
    }

    #[tokio::test]
    async fn test_missing_saved_search() {
        let (executor, _) = executor(
            MemoryTransport::named("primary")
                .with_search("saved_searches", json!({"hits": {"total": {"value": 0}, "hits": []}})),
        );
        let err = executor.table_data(&table("Nope")).await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_saved_search_titles() {
        let (executor, transport) = executor(MemoryTransport::named("primary").with_search(
            "saved_searches",
            json!({"hits": {"total": {"value": 2}, "hits": [
                {"_id": "1", "_source": {"title": "Failed logins", "index_name": "alerts-*"}},
                {"_id": "2", "_source": {"title": "Orphan"}}
            ]}}),
        ));

        let titles = executor.saved_search_titles().await.unwrap();
        assert_eq!(
            titles,
            vec![SavedSearchTitle {
                title: "Failed logins".into(),
                index: "alerts-*".into(),
            }]
        );

        let (_, body) = transport.requests().pop().unwrap();
        assert_eq!(body["size"], 1000);
        assert!(body["query"].get("match_all").is_some());
    }
}
