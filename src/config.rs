use crate::search::SearchConfig;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Document store connection
    pub elasticsearch: ElasticsearchConfig,

    /// Search behaviour
    #[serde(default)]
    pub search: SearchConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Load configuration, layering `path` (if it exists) over the built-in
    /// defaults and environment variables over both
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(path).required(false))
            // Override with environment variables (prefix: CHAT_SEARCH_)
            .add_source(
                config::Environment::with_prefix("CHAT_SEARCH")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("elasticsearch.hosts")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Node URLs; requests go to the first one
    #[serde(default = "default_es_hosts")]
    pub hosts: Vec<String>,

    /// Basic auth user
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(default)]
    pub password: Option<String>,

    /// Per-request timeout (seconds)
    #[serde(default = "default_es_timeout")]
    pub timeout_secs: u64,

    /// Index names
    #[serde(default)]
    pub index: IndexNames,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            hosts: default_es_hosts(),
            username: None,
            password: None,
            timeout_secs: default_es_timeout(),
            index: IndexNames::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexNames {
    #[serde(default = "default_conversations_index")]
    pub conversations: String,

    #[serde(default = "default_messages_index")]
    pub messages: String,
}

impl Default for IndexNames {
    fn default() -> Self {
        Self {
            conversations: default_conversations_index(),
            messages: default_messages_index(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_es_hosts() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_es_timeout() -> u64 {
    30
}

fn default_conversations_index() -> String {
    "conversations".to_string()
}

fn default_messages_index() -> String {
    "messages".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "chat-history-search".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let config = Config::load_from("does/not/exist").unwrap();
        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.elasticsearch.hosts, vec!["http://localhost:9200"]);
        assert_eq!(config.elasticsearch.index.conversations, "conversations");
        assert_eq!(config.search.max_page_size, 100);
        assert_eq!(config.search.weights.title, 10);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[elasticsearch]
hosts = ["http://search:9200"]
username = "elastic"
password = "changeme"

[elasticsearch.index]
conversations = "conversations_v2"

[search]
max_page_size = 50
"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.elasticsearch.hosts, vec!["http://search:9200"]);
        assert_eq!(config.elasticsearch.username.as_deref(), Some("elastic"));
        assert_eq!(config.elasticsearch.index.conversations, "conversations_v2");
        assert_eq!(config.elasticsearch.index.messages, "messages");
        assert_eq!(config.search.max_page_size, 50);
        assert_eq!(config.search.default_page_size, 10);
    }
}
