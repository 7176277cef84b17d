use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::retry::{Backoff, RetryPolicy};

/// Client configuration record.
///
/// Built once from defaults plus an ordered list of [`ClientOption`]s, then
/// changed only through the client's explicit setters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClientOptions {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub sql_key: String,
    #[serde(rename = "timeout_ms", default = "default_timeout", with = "duration_ms")]
    pub timeout: Duration,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(
        rename = "retry_delay_ms",
        default = "default_retry_delay",
        with = "duration_ms"
    )]
    pub retry_delay: Duration,
    #[serde(default)]
    pub backoff: Backoff,
    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            sql_key: String::new(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            backoff: Backoff::default(),
            headers: HashMap::new(),
        }
    }
}

impl ClientOptions {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let options: ClientOptions = serde_json::from_str(&contents)?;
        Ok(options)
    }

    /// Defaults with `options` applied in order
    pub fn from_options(options: impl IntoIterator<Item = ClientOption>) -> Self {
        let mut resolved = Self::default();
        for option in options {
            resolved.apply(option);
        }
        resolved
    }

    /// Apply one adjustment; only the targeted field changes
    pub fn apply(&mut self, option: ClientOption) {
        match option {
            ClientOption::ApiKey(key) => self.api_key = key,
            ClientOption::SqlKey(key) => self.sql_key = key,
            ClientOption::Timeout(timeout) => self.timeout = timeout,
            ClientOption::MaxRetries(retries) => self.max_retries = retries,
            ClientOption::RetryDelay(delay) => self.retry_delay = delay,
            ClientOption::Backoff(backoff) => self.backoff = backoff,
            ClientOption::Header(name, value) => {
                self.headers.insert(name, value);
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            delay: self.retry_delay,
            backoff: self.backoff,
        }
    }
}

/// Named adjustment applied on top of [`ClientOptions::default`]
#[derive(Debug, Clone, PartialEq)]
pub enum ClientOption {
    ApiKey(String),
    SqlKey(String),
    Timeout(Duration),
    MaxRetries(u32),
    RetryDelay(Duration),
    Backoff(Backoff),
    Header(String, String),
}

/// Mock server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Name reported by `/health`
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_version")]
    pub version: String,

    /// Artificial delay added to every executed query
    #[serde(default)]
    pub simulated_latency_ms: u64,

    /// Client libraries advertised by `/info`
    #[serde(default = "default_supported_clients")]
    pub supported_clients: Vec<String>,

    // CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_enabled")]
    pub enabled: bool,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_cors_enabled() -> bool {
    true
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_cors_enabled(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> String {
    "8080".to_string()
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_database() -> String {
    "mock".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_supported_clients() -> Vec<String> {
    ["python", "javascript", "go", "rust", "csharp"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_dir: default_log_dir(),
            database: default_database(),
            version: default_version(),
            simulated_latency_ms: 0,
            supported_clients: default_supported_clients(),
            cors: CorsConfig::default(),
        }
    }
}

/// Serde adapter storing a [`Duration`] as whole milliseconds
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
