//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{ClientConfig, EngineResult, HttpTransport, TransportRouter};
use crate::query::{QueryContext, TableSettings};
use crate::time::{TimeResult, TimeSettings};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub time: TimeConfig,

    #[serde(default)]
    pub filters: FiltersConfig,

    #[serde(default)]
    pub fields: FieldsConfig,

    #[serde(default)]
    pub tables: TablesConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search engine connection
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_url")]
    pub url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub accept_invalid_certs: bool,

    #[serde(default = "default_engine_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Index patterns served by another cluster
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// One index pattern → cluster route
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub pattern: String,
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_engine_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_engine_timeout() -> u64 {
    150_000 // 150 seconds
}

fn default_max_retries() -> u32 {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            username: None,
            password: None,
            accept_invalid_certs: false,
            request_timeout_ms: default_engine_timeout(),
            max_retries: default_max_retries(),
            routes: Vec::new(),
        }
    }
}

impl EngineConfig {
    fn client_config(&self, url: &str, username: &Option<String>, password: &Option<String>) -> ClientConfig {
        ClientConfig {
            base_url: url.to_string(),
            username: username.clone(),
            password: password.clone(),
            accept_invalid_certs: self.accept_invalid_certs,
            request_timeout_ms: self.request_timeout_ms,
            max_retries: self.max_retries,
        }
    }

    /// Build the HTTP transports and route table
    pub fn router(&self) -> EngineResult<TransportRouter> {
        let primary = HttpTransport::new(
            "primary",
            self.client_config(&self.url, &self.username, &self.password),
        )?;

        let mut router = TransportRouter::new(Arc::new(primary));
        for route in &self.routes {
            let transport = HttpTransport::new(
                route.pattern.clone(),
                self.client_config(&route.url, &route.username, &route.password),
            )?;
            router = router.with_route(route.pattern.clone(), Arc::new(transport));
        }
        Ok(router)
    }
}

/// Display timezone and the local offset caller timestamps are written in
#[derive(Debug, Clone, Deserialize)]
pub struct TimeConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            utc_offset: default_utc_offset(),
        }
    }
}

impl TimeConfig {
    pub fn settings(&self) -> TimeResult<TimeSettings> {
        TimeSettings::parse(&self.timezone, &self.utc_offset)
    }
}

/// Filter compilation options
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FiltersConfig {
    /// Accumulate into per-source `should` branches when a request names its sources
    #[serde(default)]
    pub composite_sources: bool,

    /// Fields where `is` matches by prefix
    #[serde(default)]
    pub wildcard_fields: Vec<String>,
}

/// Field catalog settings
#[derive(Debug, Clone, Deserialize)]
pub struct FieldsConfig {
    #[serde(default = "default_index_patterns")]
    pub index_patterns: Vec<String>,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_value_limit")]
    pub value_limit: usize,
}

fn default_index_patterns() -> Vec<String> {
    vec![
        "wazuh-alerts-*".to_string(),
        "wazuh-states-vulnerabilities-*".to_string(),
        "logstash-*".to_string(),
    ]
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

fn default_value_limit() -> usize {
    1000
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            index_patterns: default_index_patterns(),
            cache_ttl_secs: default_cache_ttl(),
            value_limit: default_value_limit(),
        }
    }
}

impl FieldsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Saved-search tables
#[derive(Debug, Clone, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_saved_searches_index")]
    pub saved_searches_index: String,

    /// Indices queried without a time range
    #[serde(default = "default_undated_indices")]
    pub undated_indices: Vec<String>,
}

fn default_saved_searches_index() -> String {
    "saved_searches".to_string()
}

fn default_undated_indices() -> Vec<String> {
    vec!["wazuh-states-vulnerabilities-*".to_string()]
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            saved_searches_index: default_saved_searches_index(),
            undated_indices: default_undated_indices(),
        }
    }
}

impl From<&TablesConfig> for TableSettings {
    fn from(config: &TablesConfig) -> Self {
        Self {
            saved_searches_index: config.saved_searches_index.clone(),
            undated_indices: config.undated_indices.clone(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("dashquery").join("config.toml")),
            Some(PathBuf::from("/etc/dashquery/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Engine overrides
        if let Some(url) = var("DASHQUERY_ENGINE_URL") {
            self.engine.url = url;
        }
        if let Some(user) = var("DASHQUERY_ENGINE_USERNAME") {
            self.engine.username = Some(user);
        }
        if let Some(password) = var("DASHQUERY_ENGINE_PASSWORD") {
            self.engine.password = Some(password);
        }

        // Time overrides
        if let Some(tz) = var("DASHQUERY_TIMEZONE") {
            self.time.timezone = tz;
        }
        if let Some(offset) = var("DASHQUERY_UTC_OFFSET") {
            self.time.utc_offset = offset;
        }

        // API overrides
        if let Some(host) = var("DASHQUERY_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("DASHQUERY_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Logging overrides
        if let Some(level) = var("DASHQUERY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("DASHQUERY_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Query settings derived from `[time]` and `[filters]`
    pub fn query_context(&self) -> TimeResult<QueryContext> {
        Ok(QueryContext {
            time: self.time.settings()?,
            wildcard_fields: self.filters.wildcard_fields.clone(),
            composite_sources: self.filters.composite_sources,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# dashquery Configuration
#
# Environment variables override these settings:
# - DASHQUERY_ENGINE_URL
# - DASHQUERY_ENGINE_USERNAME
# - DASHQUERY_ENGINE_PASSWORD
# - DASHQUERY_TIMEZONE
# - DASHQUERY_UTC_OFFSET
# - DASHQUERY_API_HOST
# - DASHQUERY_API_PORT
# - DASHQUERY_LOG_LEVEL
# - DASHQUERY_LOG_FORMAT

[engine]
# Search engine base URL
url = "http://localhost:9200"

# Basic auth credentials
# username = "admin"
# password = "admin"

# Skip TLS certificate verification (self-signed clusters)
accept_invalid_certs = false

# Per-request timeout (ms)
request_timeout_ms = 150000

# Attempts per request on connection failures and timeouts
max_retries = 3

# Index patterns served by another cluster
# [[engine.routes]]
# pattern = "logstash-*"
# url = "http://localhost:9201"

[time]
# Display timezone name
timezone = "UTC"

# Offset that caller timestamps are written in
utc_offset = "+00:00"

[filters]
# Split filters into per-source should branches
composite_sources = false

# Fields where `is` matches by prefix
wildcard_fields = []

[fields]
# Index patterns scanned for field discovery
index_patterns = ["wazuh-alerts-*", "wazuh-states-vulnerabilities-*", "logstash-*"]

# Field catalog cache lifetime (seconds)
cache_ttl_secs = 300

# Maximum distinct values per field
value_limit = 1000

[tables]
# Index holding saved searches
saved_searches_index = "saved_searches"

# Indices queried without a time range
undated_indices = ["wazuh-states-vulnerabilities-*"]

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8082

# Allowed CORS origins (empty allows any)
cors_origins = []

# Request timeout in seconds
request_timeout_secs = 30

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.url, "http://localhost:9200");
        assert_eq!(config.engine.request_timeout_ms, 150_000);
        assert_eq!(config.fields.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.tables.saved_searches_index, "saved_searches");
        assert!(!config.filters.composite_sources);
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.api.port, 8082);
        assert_eq!(config.fields.index_patterns.len(), 3);
        assert_eq!(config.tables.undated_indices, vec!["wazuh-states-vulnerabilities-*"]);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[engine]
url = "https://es.local:9200"
max_retries = 5

[[engine.routes]]
pattern = "logstash-*"
url = "https://logs.local:9200"

[time]
timezone = "Asia/Karachi"
utc_offset = "+05:00"

[filters]
composite_sources = true
wildcard_fields = ["agent.name"]
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.engine.url, "https://es.local:9200");
        assert_eq!(config.engine.max_retries, 5);
        assert_eq!(config.engine.routes[0].pattern, "logstash-*");
        assert_eq!(config.api.port, 8082);

        let ctx = config.query_context().unwrap();
        assert_eq!(ctx.time.utc_offset.local_minus_utc(), 5 * 3600);
        assert!(ctx.composite_sources);
        assert_eq!(ctx.wildcard_fields, vec!["agent.name"]);

        let router = config.engine.router().unwrap();
        assert_eq!(router.for_index("logstash-2024").name(), "logstash-*");
        assert_eq!(router.for_index("wazuh-alerts-*").name(), "primary");
    }

    #[test]
    fn test_load_errors() {
        let err = Config::load(Path::new("/nonexistent/dashquery.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nport = \"not a port\"").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DASHQUERY_ENGINE_URL", "http://es:9200"),
            ("DASHQUERY_UTC_OFFSET", "-03:00"),
            ("DASHQUERY_API_PORT", "9000"),
            ("DASHQUERY_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.engine.url, "http://es:9200");
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.logging.format, "json");
        assert_eq!(
            config.query_context().unwrap().time.utc_offset.local_minus_utc(),
            -3 * 3600
        );
    }

    #[test]
    fn test_bad_offset() {
        let mut config = Config::default();
        config.time.utc_offset = "sometime".into();
        assert!(config.query_context().is_err());
    }
}
