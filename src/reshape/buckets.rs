//! Canonical engine responses
//!
//! Engine responses are loose JSON. Everything downstream works on the shapes
//! defined here: a [`Bucket`] tree with named sub-aggregations, and a
//! [`SearchResponse`] holding hits and top-level aggregations.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

const RESERVED_KEYS: [&str; 3] = ["key", "key_as_string", "doc_count"];

/// A bucket key as returned by terms, multi-terms, filters and histogram aggregations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BucketKey {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Multi-terms keys
    List(Vec<Value>),
    /// Composite keys
    Composite(Map<String, Value>),
    Missing,
}

impl BucketKey {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(s)) => Self::Text(s.clone()),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Missing),
            },
            Some(Value::Bool(b)) => Self::Bool(*b),
            Some(Value::Array(items)) => Self::List(items.clone()),
            Some(Value::Object(map)) => Self::Composite(map.clone()),
            Some(Value::Null) | None => Self::Missing,
        }
    }

    /// Epoch milliseconds, for histogram keys
    pub fn as_millis(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }
}

/// One aggregation bucket with its nested aggregations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub key: BucketKey,
    pub key_as_string: Option<String>,
    pub doc_count: u64,
    /// Nested aggregations that carry buckets, by name
    pub sub_aggregations: BTreeMap<String, Vec<Bucket>>,
}

impl Bucket {
    pub fn new(key: BucketKey, doc_count: u64) -> Self {
        Self {
            key,
            key_as_string: None,
            doc_count,
            sub_aggregations: BTreeMap::new(),
        }
    }

    pub fn with_child(mut self, name: impl Into<String>, buckets: Vec<Bucket>) -> Self {
        self.sub_aggregations.insert(name.into(), buckets);
        self
    }

    /// Normalize one raw bucket object
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let sub_aggregations = obj
            .iter()
            .filter(|(name, _)| !RESERVED_KEYS.contains(&name.as_str()))
            .filter_map(|(name, agg)| Some((name.clone(), bucket_list(agg)?)))
            .collect();

        Some(Self {
            key: BucketKey::from_value(obj.get("key")),
            key_as_string: obj
                .get("key_as_string")
                .and_then(Value::as_str)
                .map(str::to_string),
            doc_count: obj.get("doc_count").and_then(Value::as_u64).unwrap_or(0),
            sub_aggregations,
        })
    }

    /// The first nested aggregation by name
    pub fn first_child(&self) -> Option<&[Bucket]> {
        self.sub_aggregations.values().next().map(Vec::as_slice)
    }

    pub fn child(&self, name: &str) -> Option<&[Bucket]> {
        self.sub_aggregations.get(name).map(Vec::as_slice)
    }

    /// Display text for the key.
    ///
    /// Scalars are stringified, composite keys render as `field: value, ...`,
    /// string lists are comma-joined, anything else falls back to
    /// `key_as_string`.
    pub fn label(&self) -> String {
        match &self.key {
            BucketKey::Text(s) => s.clone(),
            BucketKey::Integer(i) => i.to_string(),
            BucketKey::Float(f) => f.to_string(),
            BucketKey::Bool(b) => b.to_string(),
            BucketKey::Composite(map) => map
                .iter()
                .map(|(field, value)| format!("{}: {}", field, value_text(value)))
                .collect::<Vec<_>>()
                .join(", "),
            BucketKey::List(items) if items.iter().all(Value::is_string) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            BucketKey::List(_) | BucketKey::Missing => {
                self.key_as_string.clone().unwrap_or_default()
            }
        }
    }
}

/// Buckets of a raw aggregation object, `None` if it has no `buckets`.
///
/// Keyed `filters` responses (an object of buckets) are converted to a list
/// with the filter name as key.
pub fn bucket_list(agg: &Value) -> Option<Vec<Bucket>> {
    match agg.get("buckets")? {
        Value::Array(items) => Some(items.iter().filter_map(Bucket::from_value).collect()),
        Value::Object(named) => Some(
            named
                .iter()
                .filter_map(|(name, raw)| {
                    let mut bucket = Bucket::from_value(raw)?;
                    if bucket.key == BucketKey::Missing {
                        bucket.key = BucketKey::Text(name.clone());
                    }
                    Some(bucket)
                })
                .collect(),
        ),
        _ => None,
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: String,
    pub source: Map<String, Value>,
}

/// Canonical search response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResponse {
    pub total: u64,
    pub hits: Vec<Hit>,
    /// `None` when the response carried no `aggregations` key
    pub aggregations: Option<BTreeMap<String, Vec<Bucket>>>,
}

impl SearchResponse {
    pub fn from_value(value: &Value) -> Self {
        let hits = value.get("hits");

        let total = match hits.and_then(|h| h.get("total")) {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(obj) => obj.get("value").and_then(Value::as_u64).unwrap_or(0),
            None => 0,
        };

        let hits = hits
            .and_then(|h| h.get("hits"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|hit| Hit {
                        id: hit
                            .get("_id")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        source: hit
                            .get("_source")
                            .and_then(Value::as_object)
                            .cloned()
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let aggregations = value.get("aggregations").and_then(Value::as_object).map(|aggs| {
            aggs.iter()
                .filter_map(|(name, agg)| Some((name.clone(), bucket_list(agg)?)))
                .collect()
        });

        Self {
            total,
            hits,
            aggregations,
        }
    }

    /// Buckets of a top-level aggregation
    pub fn aggregation(&self, name: &str) -> Option<&[Bucket]> {
        self.aggregations.as_ref()?.get(name).map(Vec::as_slice)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
