//! Table rows from search hits

use serde::Serialize;
use serde_json::{Map, Value};

use crate::reshape::buckets::SearchResponse;

/// A page of flattened documents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePage {
    pub details: Vec<Map<String, Value>>,
    pub total_records: u64,
}

impl TablePage {
    /// Flatten every hit and tag it with its `_id`
    pub fn from_response(response: &SearchResponse) -> Self {
        let details = response
            .hits
            .iter()
            .map(|hit| {
                let mut row = flatten_document(&hit.source);
                row.insert("_id".to_string(), Value::String(hit.id.clone()));
                row
            })
            .collect();

        Self {
            details,
            total_records: response.total,
        }
    }
}

/// Flatten nested objects into dotted keys.
///
/// Lists of objects become their JSON texts joined by `", "`; other lists are
/// joined the same way from their plain text.
pub fn flatten_document(source: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    flatten_into(source, "", &mut out);
    out
}

fn flatten_into(source: &Map<String, Value>, prefix: &str, out: &mut Map<String, Value>) {
    for (key, value) in source {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Object(inner) => flatten_into(inner, &path, out),
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                out.insert(path, Value::String(joined));
            }
            scalar => {
                out.insert(path, scalar.clone());
            }
        }
    }
}
