//! HTTP search transport
//!
//! `reqwest` client for the engine's REST API with basic auth and retries on
//! connection failures, timeouts and rate limiting.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::transport::{bulk_body, BulkAction, SearchTransport};

/// Connection settings for one engine cluster
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL (e.g., "https://localhost:9200")
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum attempts per request
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            accept_invalid_certs: false,
            request_timeout_ms: 150_000,
            max_retries: 3,
        }
    }
}

enum Body<'a> {
    Empty,
    Json(&'a Value),
    Ndjson(String),
}

/// Engine REST client
pub struct HttpTransport {
    name: String,
    client: Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(name: impl Into<String>, config: ClientConfig) -> EngineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            name: name.into(),
            client,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, url: &str, body: &Body<'_>) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(user) = &self.config.username {
            builder = builder.basic_auth(user, self.config.password.as_ref());
        }
        match body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Ndjson(text) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
                .body(text.clone()),
        }
    }

    /// Send a request with retry logic
    async fn send(&self, method: Method, path: &str, body: Body<'_>) -> EngineResult<Value> {
        let url = self.url(path);
        let attempts = self.config.max_retries.max(1);
        let mut last_error = EngineError::Unavailable(url.clone());

        for attempt in 0..attempts {
            if attempt > 0 {
                // Quadratic backoff: 0.5s, 2s, 4.5s...
                let delay = Duration::from_millis(500 * u64::from(attempt).pow(2));
                warn!(
                    transport = %self.name,
                    attempt,
                    error = %last_error,
                    "Retrying engine request"
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.request(method.clone(), &url, &body).send().await {
                Ok(response) => response,
                Err(e) => {
                    last_error = EngineError::from_send(e);
                    if last_error.is_retryable() {
                        continue;
                    }
                    return Err(last_error);
                }
            };

            let status = response.status();
            if status.is_success() {
                debug!(transport = %self.name, %method, path, status = status.as_u16(), "Engine request ok");
                return response
                    .json::<Value>()
                    .await
                    .map_err(|e| EngineError::Decode(e.to_string()));
            }

            if status.as_u16() == 429 {
                last_error = EngineError::RateLimited;
                if attempt + 1 < attempts {
                    if let Some(delay) = retry_after(response.headers(), self.config.request_timeout_ms) {
                        tokio::time::sleep(delay).await;
                    }
                }
                continue;
            }

            let message = response.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Err(last_error)
    }
}

/// `Retry-After` seconds, capped at the request timeout
fn retry_after(headers: &reqwest::header::HeaderMap, cap_ms: u64) -> Option<Duration> {
    let secs = headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;
    Some(Duration::from_secs(secs).min(Duration::from_millis(cap_ms)))
}

#[async_trait]
impl SearchTransport for HttpTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, index: &str, body: &Value) -> EngineResult<Value> {
        self.send(Method::POST, &format!("{}/_search", encode(index)), Body::Json(body))
            .await
    }

    async fn index(&self, index: &str, id: Option<&str>, document: &Value) -> EngineResult<Value> {
        match id {
            Some(id) => {
                self.send(
                    Method::PUT,
                    &format!("{}/_doc/{}", encode(index), encode(id)),
                    Body::Json(document),
                )
                .await
            }
            None => {
                self.send(Method::POST, &format!("{}/_doc", encode(index)), Body::Json(document))
                    .await
            }
        }
    }

    async fn update(&self, index: &str, id: &str, doc: &Value) -> EngineResult<Value> {
        let body = serde_json::json!({ "doc": doc });
        self.send(
            Method::POST,
            &format!("{}/_update/{}", encode(index), encode(id)),
            Body::Json(&body),
        )
        .await
    }

    async fn delete(&self, index: &str, id: &str) -> EngineResult<Value> {
        self.send(
            Method::DELETE,
            &format!("{}/_doc/{}", encode(index), encode(id)),
            Body::Empty,
        )
        .await
    }

    async fn bulk(&self, actions: &[BulkAction]) -> EngineResult<Value> {
        self.send(Method::POST, "_bulk", Body::Ndjson(bulk_body(actions)))
            .await
    }

    async fn get_mapping(&self, index: &str) -> EngineResult<Value> {
        self.send(Method::GET, &format!("{}/_mapping", encode(index)), Body::Empty)
            .await
    }

    async fn get_field_mapping(&self, index: &str, field: &str) -> EngineResult<Value> {
        self.send(
            Method::GET,
            &format!("{}/_mapping/field/{}", encode(index), encode(field)),
            Body::Empty,
        )
        .await
    }

    async fn get_alias(&self, index: &str) -> EngineResult<Value> {
        self.send(Method::GET, &format!("{}/_alias", encode(index)), Body::Empty)
            .await
    }
}

/// Percent-encode a path segment, keeping `*` and `,` for index patterns
fn encode(segment: &str) -> String {
    urlencoding::encode(segment)
        .replace("%2A", "*")
        .replace("%2C", ",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:9200");
        assert_eq!(config.max_retries, 3);
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn test_url_building() {
        let transport = HttpTransport::new(
            "primary",
            ClientConfig {
                base_url: "https://es.local:9200/".into(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(transport.url("alerts-*/_search"), "https://es.local:9200/alerts-*/_search");
        assert_eq!(transport.name(), "primary");
    }

    #[test]
    fn test_encode_keeps_patterns() {
        assert_eq!(encode("logstash-*"), "logstash-*");
        assert_eq!(encode("a,b"), "a,b");
        assert_eq!(encode("my doc"), "my%20doc");
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_unavailable() {
        let transport = HttpTransport::new(
            "dead",
            ClientConfig {
                base_url: "http://127.0.0.1:9".into(),
                request_timeout_ms: 500,
                max_retries: 1,
                ..Default::default()
            },
        )
        .unwrap();

        let err = transport
            .search("alerts-*", &serde_json::json!({"size": 0}))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retry_after_is_capped() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(retry_after(&headers, 1000), None);

        headers.insert(reqwest::header::RETRY_AFTER, "2".parse().unwrap());
        assert_eq!(retry_after(&headers, 10_000), Some(Duration::from_secs(2)));

        headers.insert(reqwest::header::RETRY_AFTER, "3600".parse().unwrap());
        assert_eq!(retry_after(&headers, 1500), Some(Duration::from_millis(1500)));
    }

    #[tokio::test]
    async fn test_rate_limited_last_attempt_returns_without_sleeping() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 429 Too Many Requests\r\nRetry-After: 3600\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                )
                .await;
        });

        let transport = HttpTransport::new(
            "busy",
            ClientConfig {
                base_url: format!("http://{}", addr),
                request_timeout_ms: 60_000,
                max_retries: 1,
                ..Default::default()
            },
        )
        .unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            transport.search("alerts-*", &serde_json::json!({"size": 0})),
        )
        .await
        .expect("rate-limited request should not wait out Retry-After");
        assert!(matches!(result, Err(EngineError::RateLimited)));
    }
}
