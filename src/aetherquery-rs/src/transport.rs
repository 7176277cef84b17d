use aetherquery_core::error::{AetherError, ErrorCode};
use aetherquery_core::models::ErrorEnvelope;
use aetherquery_core::retry::{is_retryable_status, RetryPolicy};
use aetherquery_core::ClientOptions;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Request, Response, Url};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Client identifier sent with every request
pub const USER_AGENT: &str = concat!("AetherQuery-Rust-Client/", env!("CARGO_PKG_VERSION"));

/// Transport settings
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub base_url: String,
    /// Zero means no timeout
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Seed for the instance-level headers
    pub headers: HashMap<String, String>,
}

impl TransportOptions {
    pub fn from_client_options(base_url: impl Into<String>, options: &ClientOptions) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: options.timeout,
            retry: options.retry_policy(),
            headers: options.headers.clone(),
        }
    }
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::from_client_options(String::new(), &ClientOptions::default())
    }
}

/// Per-call settings layered over the transport's own
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Applied last, overriding instance headers of the same name
    pub headers: HashMap<String, String>,
    /// Zero keeps the transport's own timeout
    pub timeout: Option<Duration>,
    /// Replaces the configured retry budget for this call
    pub max_retries: Option<u32>,
    /// Aborts the current attempt and suppresses further retries
    pub cancel: Option<CancellationToken>,
}

impl RequestConfig {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// HTTP transport with bounded retry.
///
/// Requests take `&self`, so one transport can serve concurrent calls.
/// Mutators take `&mut self`; reconfiguring a shared transport needs the
/// caller's own lock.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    /// Lowercase name to value
    headers: HashMap<String, String>,
}

impl HttpTransport {
    pub fn new(options: TransportOptions) -> Result<Self, AetherError> {
        let mut builder = reqwest::Client::builder();
        if !options.timeout.is_zero() {
            builder = builder.timeout(options.timeout);
        }
        let client = builder.build().map_err(|e| {
            AetherError::new(
                ErrorCode::RequestError,
                format!("Failed to create HTTP client: {}", e),
            )
        })?;

        Ok(Self {
            client,
            base_url: options.base_url,
            retry: options.retry,
            headers: options
                .headers
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
        })
    }

    /// POST a JSON body
    pub async fn post(&self, endpoint: &str, body: Vec<u8>) -> Result<Vec<u8>, AetherError> {
        self.request(Method::POST, endpoint, Some(body), &RequestConfig::default())
            .await
    }

    pub async fn get(&self, endpoint: &str) -> Result<Vec<u8>, AetherError> {
        self.request(Method::GET, endpoint, None, &RequestConfig::default())
            .await
    }

    /// Execute `method` against `base_url + endpoint`, retrying transient failures.
    ///
    /// Returns the raw body of the first 2xx response. Network failures are
    /// retried unconditionally; HTTP failures only for 408, 429 and 5xx
    /// without a structured error body. At most `max_retries + 1` attempts
    /// are made.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
        config: &RequestConfig,
    ) -> Result<Vec<u8>, AetherError> {
        let cancel = config.cancel.as_ref();
        let mut retries_left = config.max_retries.unwrap_or(self.retry.max_retries);
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(AetherError::cancelled());
            }
            attempt += 1;

            let request = self.build_request(&method, endpoint, body.as_deref(), config)?;
            tracing::debug!(method = %method, url = %request.url(), attempt, "Sending request");

            let response = match self.send(request, cancel).await? {
                Ok(response) => response,
                Err(e) => {
                    if retries_left > 0 {
                        tracing::warn!(
                            attempt,
                            retries_left,
                            delay = ?self.retry.delay_for(attempt - 1),
                            "Network error, retrying: {}",
                            e
                        );
                        self.pause(attempt, cancel).await?;
                        retries_left -= 1;
                        continue;
                    }
                    return Err(AetherError::new(
                        ErrorCode::NetworkError,
                        format!("Network error: {}", e),
                    ));
                }
            };

            let status = response.status().as_u16();
            let response_body = read_body(response).await?;

            if (200..300).contains(&status) {
                return Ok(response_body);
            }

            if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&response_body) {
                return Err(AetherError::from_detail(envelope.error, Some(status)));
            }

            if retries_left > 0 && is_retryable_status(status) {
                tracing::warn!(
                    attempt,
                    retries_left,
                    status,
                    delay = ?self.retry.delay_for(attempt - 1),
                    "Server returned retryable status"
                );
                self.pause(attempt, cancel).await?;
                retries_left -= 1;
                continue;
            }

            return Err(AetherError::new(
                ErrorCode::HttpError,
                String::from_utf8_lossy(&response_body).into_owned(),
            )
            .with_http_code(status));
        }
    }

    fn build_request(
        &self,
        method: &Method,
        endpoint: &str,
        body: Option<&[u8]>,
        config: &RequestConfig,
    ) -> Result<Request, AetherError> {
        let url = Url::parse(&format!("{}{}", self.base_url, endpoint)).map_err(request_error)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        for (name, value) in self.headers.iter().chain(config.headers.iter()) {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(request_error)?;
            let value = HeaderValue::from_str(value).map_err(request_error)?;
            headers.insert(name, value);
        }

        let mut builder = self.client.request(method.clone(), url).headers(headers);
        if let Some(timeout) = config.timeout.filter(|timeout| !timeout.is_zero()) {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = body {
            builder = builder.body(body.to_vec());
        }

        builder.build().map_err(request_error)
    }

    async fn send(
        &self,
        request: Request,
        cancel: Option<&CancellationToken>,
    ) -> Result<reqwest::Result<Response>, AetherError> {
        match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(AetherError::cancelled()),
                outcome = self.client.execute(request) => Ok(outcome),
            },
            None => Ok(self.client.execute(request).await),
        }
    }

    /// Sleep before the retry that follows `attempt`
    async fn pause(
        &self,
        attempt: u32,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), AetherError> {
        let delay = self.retry.delay_for(attempt - 1);
        match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(AetherError::cancelled()),
                _ = tokio::time::sleep(delay) => Ok(()),
            },
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    /// Names are case-insensitive; a later value replaces an earlier one
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(&name.to_ascii_lowercase());
    }

    /// Instance headers, keyed by lowercase name
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

async fn read_body(response: Response) -> Result<Vec<u8>, AetherError> {
    response.bytes().await.map(|bytes| bytes.to_vec()).map_err(|e| {
        AetherError::new(
            ErrorCode::ReadError,
            format!("Failed to read response: {}", e),
        )
    })
}

fn request_error(e: impl std::fmt::Display) -> AetherError {
    AetherError::new(
        ErrorCode::RequestError,
        format!("Failed to create request: {}", e),
    )
}
