//! In-memory transport for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::transport::{BulkAction, SearchTransport};

/// Serves canned responses per index and records every search body
#[derive(Default)]
pub struct MemoryTransport {
    name: String,
    searches: HashMap<String, Value>,
    mappings: HashMap<String, Value>,
    field_mappings: HashMap<(String, String), Value>,
    mapping_failures: AtomicUsize,
    requests: Mutex<Vec<(String, Value)>>,
}

impl MemoryTransport {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_search(mut self, index: &str, response: Value) -> Self {
        self.searches.insert(index.to_string(), response);
        self
    }

    pub fn with_mapping(mut self, index: &str, mapping: Value) -> Self {
        self.mappings.insert(index.to_string(), mapping);
        self
    }

    pub fn with_field_mapping(mut self, index: &str, field: &str, mapping: Value) -> Self {
        self.field_mappings
            .insert((index.to_string(), field.to_string()), mapping);
        self
    }

    /// Fail the next `count` mapping lookups as if the engine were down
    pub fn with_mapping_failures(self, count: usize) -> Self {
        self.mapping_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Search requests seen so far, as `(index, body)`
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn missing(index: &str) -> EngineError {
        EngineError::Api {
            status: 404,
            message: format!("no such index [{}]", index),
        }
    }
}

#[async_trait]
impl SearchTransport for MemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, index: &str, body: &Value) -> EngineResult<Value> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((index.to_string(), body.clone()));
        }
        self.searches
            .get(index)
            .cloned()
            .ok_or_else(|| Self::missing(index))
    }

    async fn index(&self, index: &str, id: Option<&str>, _document: &Value) -> EngineResult<Value> {
        Ok(json!({"_index": index, "_id": id.unwrap_or("generated"), "result": "created"}))
    }

    async fn update(&self, index: &str, id: &str, _doc: &Value) -> EngineResult<Value> {
        Ok(json!({"_index": index, "_id": id, "result": "updated"}))
    }

    async fn delete(&self, index: &str, id: &str) -> EngineResult<Value> {
        Ok(json!({"_index": index, "_id": id, "result": "deleted"}))
    }

    async fn bulk(&self, actions: &[BulkAction]) -> EngineResult<Value> {
        Ok(json!({"errors": false, "items": actions.len()}))
    }

    async fn get_mapping(&self, index: &str) -> EngineResult<Value> {
        let failing = self
            .mapping_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(EngineError::Unavailable(index.to_string()));
        }
        self.mappings
            .get(index)
            .cloned()
            .ok_or_else(|| Self::missing(index))
    }

    async fn get_field_mapping(&self, index: &str, field: &str) -> EngineResult<Value> {
        Ok(self
            .field_mappings
            .get(&(index.to_string(), field.to_string()))
            .cloned()
            .unwrap_or_else(|| json!({})))
    }

    async fn get_alias(&self, index: &str) -> EngineResult<Value> {
        let aliases: serde_json::Map<String, Value> = self
            .mappings
            .keys()
            .filter(|name| name.as_str() == index)
            .map(|name| (name.clone(), json!({"aliases": {}})))
            .collect();
        Ok(Value::Object(aliases))
    }
}
