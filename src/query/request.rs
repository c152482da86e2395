//! Engine request types
//!
//! Typed mirror of the subset of the search DSL this crate emits. Requests are
//! built fresh per call and serialized straight into the transport body.
//!
//! ```text
//! {size, from, track_total_hits, query: {bool: {filter, must, must_not, should?}},
//!  sort, aggs?, _source?, search_after?}
//! ```

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

/// A complete search request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_total_hits: Option<bool>,
    pub query: QueryClause,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aggs: BTreeMap<String, Aggregation>,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_after: Option<Vec<Value>>,
}

impl SearchRequest {
    /// Empty request returning `size` hits
    pub fn new(size: usize) -> Self {
        Self {
            size,
            from: None,
            track_total_hits: None,
            query: QueryClause::default(),
            sort: Vec::new(),
            aggs: BTreeMap::new(),
            source: None,
            search_after: None,
        }
    }

    /// Top-level bool query
    pub fn bool_query(&mut self) -> &mut BoolQuery {
        &mut self.query.bool
    }

    /// Serialize into a JSON value (for logging and offline output)
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// `{"bool": {...}}` wrapper
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryClause {
    pub bool: BoolQuery,
}

/// Boolean query with the four clause lists
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoolQuery {
    pub filter: Vec<Value>,
    pub must: Vec<Value>,
    pub must_not: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<QueryClause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<u32>,
}

impl BoolQuery {
    /// Get the `should` branch at `index`, creating empty branches up to it
    pub fn should_branch(&mut self, index: usize) -> &mut BoolQuery {
        while self.should.len() <= index {
            self.should.push(QueryClause::default());
        }
        &mut self.should[index].bool
    }
}

/// `_source` projection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFilter {
    pub includes: Vec<String>,
}

/// One aggregation node with optional sub-aggregations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    #[serde(flatten)]
    pub kind: AggregationKind,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aggs: BTreeMap<String, Aggregation>,
}

impl Aggregation {
    pub fn new(kind: AggregationKind) -> Self {
        Self {
            kind,
            aggs: BTreeMap::new(),
        }
    }

    pub fn terms(field: impl Into<String>, size: usize) -> Self {
        Self::new(AggregationKind::Terms {
            field: field.into(),
            size,
        })
    }

    /// `terms` for one field, `multi_terms` for several
    pub fn terms_for(fields: &[String], size: usize) -> Self {
        match fields {
            [single] => Self::terms(single.clone(), size),
            many => Self::new(AggregationKind::MultiTerms {
                terms: many
                    .iter()
                    .map(|field| TermsField {
                        field: field.clone(),
                    })
                    .collect(),
                size,
            }),
        }
    }

    /// Attach a named sub-aggregation
    pub fn with_child(mut self, name: impl Into<String>, child: Aggregation) -> Self {
        self.aggs.insert(name.into(), child);
        self
    }
}

/// Aggregation bodies emitted by this crate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    Terms {
        field: String,
        size: usize,
    },
    MultiTerms {
        terms: Vec<TermsField>,
        size: usize,
    },
    Filters {
        keyed: bool,
        filters: NamedFilters,
    },
    /// Free-form `date_histogram` body
    DateHistogram(serde_json::Map<String, Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermsField {
    pub field: String,
}

/// Label → fragment map that serializes in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedFilters(Vec<(String, Value)>);

impl NamedFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the fragment for `label`
    pub fn insert(&mut self, label: impl Into<String>, fragment: Value) {
        let label = label.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == label) {
            Some(slot) => slot.1 = fragment,
            None => self.0.push((label, fragment)),
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(label, _)| label.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for NamedFilters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, fragment) in &self.0 {
            map.serialize_entry(label, fragment)?;
        }
        map.end()
    }
}

/// Inclusive `@timestamp` range filter over canonical UTC bounds
pub fn timestamp_range(gte: &str, lte: &str) -> Value {
    json!({
        "range": {
            "@timestamp": {
                "gte": gte,
                "lte": lte,
                "format": "strict_date_optional_time",
            }
        }
    })
}
