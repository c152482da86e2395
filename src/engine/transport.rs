//! Search transport seam and per-index routing

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::error::EngineResult;

/// Operations this crate needs from the search engine
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// `POST /{index}/_search`
    async fn search(&self, index: &str, body: &Value) -> EngineResult<Value>;

    /// Index a document, with an explicit id or an engine-assigned one
    async fn index(&self, index: &str, id: Option<&str>, document: &Value) -> EngineResult<Value>;

    /// Partial update of one document
    async fn update(&self, index: &str, id: &str, doc: &Value) -> EngineResult<Value>;

    async fn delete(&self, index: &str, id: &str) -> EngineResult<Value>;

    async fn bulk(&self, actions: &[BulkAction]) -> EngineResult<Value>;

    async fn get_mapping(&self, index: &str) -> EngineResult<Value>;

    async fn get_field_mapping(&self, index: &str, field: &str) -> EngineResult<Value>;

    async fn get_alias(&self, index: &str) -> EngineResult<Value>;
}

/// One `_bulk` action
#[derive(Debug, Clone, PartialEq)]
pub enum BulkAction {
    Index {
        index: String,
        id: Option<String>,
        document: Value,
    },
    Update {
        index: String,
        id: String,
        doc: Value,
    },
    Delete {
        index: String,
        id: String,
    },
}

impl BulkAction {
    /// Append the NDJSON lines for this action
    pub fn write_ndjson(&self, out: &mut String) {
        let (header, body) = match self {
            Self::Index { index, id, document } => {
                let mut meta = json!({"_index": index});
                if let Some(id) = id {
                    meta["_id"] = json!(id);
                }
                (json!({"index": meta}), Some(document.clone()))
            }
            Self::Update { index, id, doc } => (
                json!({"update": {"_index": index, "_id": id}}),
                Some(json!({"doc": doc})),
            ),
            Self::Delete { index, id } => (json!({"delete": {"_index": index, "_id": id}}), None),
        };

        out.push_str(&header.to_string());
        out.push('\n');
        if let Some(body) = body {
            out.push_str(&body.to_string());
            out.push('\n');
        }
    }
}

/// Render a batch of actions as a `_bulk` body
pub fn bulk_body(actions: &[BulkAction]) -> String {
    let mut out = String::new();
    for action in actions {
        action.write_ndjson(&mut out);
    }
    out
}

/// Picks a transport per index pattern
#[derive(Clone)]
pub struct TransportRouter {
    default: Arc<dyn SearchTransport>,
    routes: Vec<(String, Arc<dyn SearchTransport>)>,
}

impl TransportRouter {
    pub fn new(default: Arc<dyn SearchTransport>) -> Self {
        Self {
            default,
            routes: Vec::new(),
        }
    }

    /// Send indices matching `pattern` to `transport`.
    ///
    /// A trailing `*` matches by prefix; earlier routes win.
    pub fn with_route(mut self, pattern: impl Into<String>, transport: Arc<dyn SearchTransport>) -> Self {
        self.routes.push((pattern.into(), transport));
        self
    }

    pub fn for_index(&self, index: &str) -> &Arc<dyn SearchTransport> {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern_matches(pattern, index))
            .map(|(_, transport)| transport)
            .unwrap_or(&self.default)
    }

    pub fn default_transport(&self) -> &Arc<dyn SearchTransport> {
        &self.default
    }
}

impl std::fmt::Debug for TransportRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRouter")
            .field("default", &self.default.name())
            .field(
                "routes",
                &self
                    .routes
                    .iter()
                    .map(|(pattern, t)| (pattern.as_str(), t.name()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn pattern_matches(pattern: &str, index: &str) -> bool {
    if pattern == index {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => index.starts_with(prefix),
        None => false,
    }
}
