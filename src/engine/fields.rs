//! Field catalog
//!
//! Knows which index patterns declare which fields, what type each field has,
//! which name to aggregate on, and which distinct values a field holds. The
//! field → patterns map is cached for a fixed TTL and refreshed on demand.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::engine::transport::TransportRouter;

const FIELD_VALUES_AGG: &str = "field_values";

/// Types whose values are aggregated on the field itself
const NON_TEXT_TYPES: [&str; 6] = ["long", "integer", "double", "float", "boolean", "date"];

#[derive(Debug, Default)]
struct CatalogState {
    sources: BTreeMap<String, Vec<String>>,
    refreshed_at: Option<Instant>,
}

impl CatalogState {
    /// An empty map is always stale so a failed load is retried on next access
    fn is_stale(&self, ttl: Duration) -> bool {
        if self.sources.is_empty() {
            return true;
        }
        match self.refreshed_at {
            Some(at) => at.elapsed() > ttl,
            None => true,
        }
    }
}

/// Input widget a filter value editor should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueCase {
    Dropdown,
    Integer,
    Boolean,
    Text,
}

/// Operator menu for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOperators {
    pub case: ValueCase,
    pub field_data_type: String,
    pub operators: Vec<&'static str>,
    pub source_index: String,
}

/// Filter operators offered for a mapping type
pub fn operators_for_type(field_type: &str) -> (ValueCase, Vec<&'static str>) {
    match field_type {
        "keyword" => (
            ValueCase::Dropdown,
            vec!["is", "is_not", "is_one_of", "is_not_one_of", "exists", "does_not_exist"],
        ),
        "text" => (ValueCase::Dropdown, vec!["is", "is_not", "exists", "does_not_exist"]),
        "date" => (
            ValueCase::Dropdown,
            vec!["is", "is_not", "is_between", "is_not_between", "exists", "does_not_exist"],
        ),
        "integer" | "long" | "double" | "float" => (
            ValueCase::Integer,
            vec!["is", "is_not", "is_between", "is_not_between", "exists", "does_not_exist"],
        ),
        "boolean" => (ValueCase::Boolean, vec!["is", "is_not", "exists", "does_not_exist"]),
        _ => (ValueCase::Text, vec!["is", "is_not", "exists", "does_not_exist"]),
    }
}

/// Field metadata cache over a set of index patterns
pub struct FieldCatalog {
    router: Arc<TransportRouter>,
    patterns: Vec<String>,
    ttl: Duration,
    value_limit: usize,
    state: RwLock<CatalogState>,
}

impl FieldCatalog {
    pub fn new(router: Arc<TransportRouter>, patterns: Vec<String>, ttl: Duration) -> Self {
        Self {
            router,
            patterns,
            ttl,
            value_limit: 1000,
            state: RwLock::new(CatalogState::default()),
        }
    }

    /// Cap on distinct values returned by [`FieldCatalog::field_values`]
    pub fn with_value_limit(mut self, limit: usize) -> Self {
        self.value_limit = limit;
        self
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Reload the field map when the TTL has expired.
    ///
    /// Safe to call concurrently: only one caller reloads, the rest wait on the
    /// write lock and then see the fresh state.
    pub async fn refresh_if_stale(&self) {
        if !self.state.read().await.is_stale(self.ttl) {
            return;
        }

        let mut state = self.state.write().await;
        if !state.is_stale(self.ttl) {
            return;
        }

        state.sources = self.load_sources().await;
        state.refreshed_at = Some(Instant::now());
        info!(
            fields = state.sources.len(),
            patterns = self.patterns.len(),
            "Field catalog refreshed"
        );
    }

    /// Unconditionally reload on the next access
    pub async fn invalidate(&self) {
        self.state.write().await.refreshed_at = None;
    }

    async fn load_sources(&self) -> BTreeMap<String, Vec<String>> {
        let mut sources: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for pattern in &self.patterns {
            let transport = self.router.for_index(pattern);
            let mapping = match transport.get_mapping(pattern).await {
                Ok(mapping) => mapping,
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Failed to fetch mapping");
                    continue;
                }
            };

            let mut fields = Vec::new();
            if let Some(indices) = mapping.as_object() {
                for index in indices.values() {
                    if let Some(props) = index.pointer("/mappings/properties").and_then(Value::as_object) {
                        flatten_properties(props, "", &mut fields);
                    }
                }
            }
            fields.sort();
            fields.dedup();

            for field in fields {
                sources.entry(field).or_default().push(pattern.clone());
            }
        }

        sources
    }

    /// Every known field, sorted
    pub async fn fields(&self) -> Vec<String> {
        self.refresh_if_stale().await;
        self.state.read().await.sources.keys().cloned().collect()
    }

    /// Index patterns declaring `name`, in configuration order
    pub async fn index_patterns_for_field(&self, name: &str) -> Vec<String> {
        self.refresh_if_stale().await;
        self.state
            .read()
            .await
            .sources
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Mapping type of `name` and the first pattern that declares it
    pub async fn field_type(&self, name: &str) -> Option<(String, String)> {
        for pattern in self.index_patterns_for_field(name).await {
            if let Some(info) = self.field_mapping(&pattern, name).await {
                if let Some(ty) = info.get("type").and_then(Value::as_str) {
                    return Some((ty.to_string(), pattern));
                }
            }
        }
        None
    }

    /// Operator menu for `name`, `None` for unknown fields
    pub async fn operators(&self, name: &str) -> Option<FieldOperators> {
        let (field_type, pattern) = self.field_type(name).await?;
        let (case, operators) = operators_for_type(&field_type);
        Some(FieldOperators {
            case,
            field_data_type: field_type,
            operators,
            source_index: pattern,
        })
    }

    /// Field name to aggregate on: the field itself for keywords, its
    /// `.keyword` sub-field for text, `None` otherwise
    pub async fn resolve_field_name(&self, pattern: &str, field: &str) -> Option<String> {
        let info = self.field_mapping(pattern, field).await?;
        match info.get("type").and_then(Value::as_str) {
            Some("keyword") => Some(field.to_string()),
            Some("text") if info.get("fields").and_then(|f| f.get("keyword")).is_some() => {
                Some(format!("{}.keyword", field))
            }
            Some("text") => {
                debug!(field, "Text field without keyword sub-field");
                None
            }
            _ => None,
        }
    }

    /// Distinct values of `name` from the first pattern that has any, sorted
    pub async fn field_values(&self, name: &str) -> Vec<Value> {
        for pattern in self.index_patterns_for_field(name).await {
            let Some(info) = self.field_mapping(&pattern, name).await else {
                continue;
            };
            let Some(field_type) = info.get("type").and_then(Value::as_str) else {
                continue;
            };

            let agg_field = if NON_TEXT_TYPES.contains(&field_type) {
                name.to_string()
            } else {
                match self.resolve_field_name(&pattern, name).await {
                    Some(resolved) => resolved,
                    None => continue,
                }
            };

            let body = json!({
                "size": 0,
                "aggs": {FIELD_VALUES_AGG: {"terms": {"field": agg_field, "size": self.value_limit}}}
            });

            let response = match self.router.for_index(&pattern).search(&pattern, &body).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(field = name, pattern = %pattern, error = %e, "Failed to fetch field values");
                    continue;
                }
            };

            let mut values: Vec<Value> = response
                .pointer(&format!("/aggregations/{}/buckets", FIELD_VALUES_AGG))
                .and_then(Value::as_array)
                .map(|buckets| buckets.iter().filter_map(|b| b.get("key").cloned()).collect())
                .unwrap_or_default();

            if !values.is_empty() {
                values.sort_by(compare_values);
                return values;
            }
        }

        Vec::new()
    }

    /// Leaf mapping (`{"type": ..., "fields"?: ...}`) of `field` under `pattern`
    async fn field_mapping(&self, pattern: &str, field: &str) -> Option<Map<String, Value>> {
        let response = match self.router.for_index(pattern).get_field_mapping(pattern, field).await {
            Ok(response) => response,
            Err(e) => {
                warn!(field, pattern, error = %e, "Failed to fetch field mapping");
                return None;
            }
        };

        response.as_object()?.values().find_map(|index| {
            index
                .get("mappings")?
                .get(field)?
                .get("mapping")?
                .as_object()?
                .values()
                .next()?
                .as_object()
                .cloned()
        })
    }
}

/// Collect dotted field paths from mapping `properties`
pub fn flatten_properties(properties: &Map<String, Value>, prefix: &str, out: &mut Vec<String>) {
    for (name, value) in properties {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        if let Some(nested) = value.get("properties").and_then(Value::as_object) {
            flatten_properties(nested, &path, out);
        }
        out.push(path);
    }
}

/// Numbers numerically, everything else by text
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => value_text(a).cmp(&value_text(b)),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
