//! Bindings for embedding hosts.
//!
//! Every call builds its own short-lived transport and reports failures as
//! a plain `{"error": "<message>"}` value instead of a Rust error, so a
//! script runtime can hand the result straight back to its caller.

use crate::transport::{HttpTransport, TransportOptions};
use aetherquery_core::retry::RetryPolicy;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Transport settings recognized in a host options mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRequestOptions {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for HostRequestOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl HostRequestOptions {
    /// Read `timeout`, `retries` and `retryDelay` (milliseconds) from a JSON
    /// object. Missing, non-numeric or negative entries keep their default.
    /// A zero timeout means no timeout.
    pub fn from_value(options: &Value) -> Self {
        let mut resolved = Self::default();
        let number = |key: &str| {
            options
                .get(key)
                .and_then(Value::as_f64)
                .filter(|n| *n >= 0.0)
        };

        if let Some(ms) = number("timeout") {
            resolved.timeout = Duration::from_millis(ms as u64);
        }
        if let Some(retries) = number("retries") {
            resolved.retries = retries.min(u32::MAX as f64) as u32;
        }
        if let Some(ms) = number("retryDelay") {
            resolved.retry_delay = Duration::from_millis(ms as u64);
        }
        resolved
    }

    fn transport(&self) -> Result<HttpTransport, Value> {
        HttpTransport::new(TransportOptions {
            // Empty base so the host's URL is used verbatim
            base_url: String::new(),
            timeout: self.timeout,
            retry: RetryPolicy::fixed(self.retries, self.retry_delay),
            headers: HashMap::new(),
        })
        .map_err(|e| error_value(e.to_string()))
    }
}

/// POST `body` as JSON to `url` and return the parsed response
pub async fn post(url: &str, body: &Value, options: &Value) -> Value {
    let transport = match HostRequestOptions::from_value(options).transport() {
        Ok(transport) => transport,
        Err(error) => return error,
    };

    let payload = match serde_json::to_vec(body) {
        Ok(payload) => payload,
        Err(e) => return error_value(format!("Failed to marshal data: {}", e)),
    };

    match transport.post(url, payload).await {
        Ok(response) => parse_response(&response),
        Err(e) => error_value(e.to_string()),
    }
}

/// GET `url` and return the parsed response
pub async fn get(url: &str, options: &Value) -> Value {
    let transport = match HostRequestOptions::from_value(options).transport() {
        Ok(transport) => transport,
        Err(error) => return error,
    };

    match transport.get(url).await {
        Ok(response) => parse_response(&response),
        Err(e) => error_value(e.to_string()),
    }
}

fn parse_response(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|e| error_value(format!("Failed to parse response: {}", e)))
}

fn error_value(message: String) -> Value {
    json!({ "error": message })
}
