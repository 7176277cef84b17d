use crate::transport::{HttpTransport, RequestConfig, TransportOptions};
use crate::Result;
use aetherquery_core::config::{ClientOption, ClientOptions};
use aetherquery_core::error::{AetherError, ErrorCode};
use aetherquery_core::models::{
    BatchRequest, BatchResponse, HealthResponse, QueryOptions, QueryRequest, QueryResponse, Record,
};
use aetherquery_core::retry::Backoff;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const QUERY_ENDPOINT: &str = "/query";
pub const BATCH_ENDPOINT: &str = "/batch";
pub const HEALTH_ENDPOINT: &str = "/health";

const API_KEY_HEADER: &str = "X-API-Key";
const SQL_KEY_HEADER: &str = "X-SQL-Key";

/// AetherQuery REST API Client
pub struct AetherClient {
    base_url: String,
    transport: HttpTransport,
    options: ClientOptions,
}

impl AetherClient {
    /// Create a client for `base_url`, applying `options` in order over the defaults
    pub fn new(
        base_url: impl Into<String>,
        options: impl IntoIterator<Item = ClientOption>,
    ) -> Result<Self> {
        Self::with_options(base_url, ClientOptions::from_options(options))
    }

    /// Create a client from an already resolved options record
    pub fn with_options(base_url: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let base_url = base_url.into();
        let transport =
            HttpTransport::new(TransportOptions::from_client_options(base_url.clone(), &options))?;

        let mut client = Self {
            base_url,
            transport,
            options,
        };
        let (api_key, sql_key) = (client.options.api_key.clone(), client.options.sql_key.clone());
        client.set_auth(&api_key, &sql_key);
        Ok(client)
    }

    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            base_url: base_url.into(),
            options: Vec::new(),
        }
    }

    /// Execute a single query
    #[tracing::instrument(skip(self, params, options))]
    pub async fn execute_query(
        &self,
        query: &str,
        params: Vec<Value>,
        options: Option<QueryOptions>,
    ) -> Result<QueryResponse> {
        let request = QueryRequest {
            query: query.to_string(),
            params,
            options,
        };
        self.execute_query_with(&request, &RequestConfig::default())
            .await
    }

    /// Execute a single query with call-level headers, timeout or cancellation
    pub async fn execute_query_with(
        &self,
        request: &QueryRequest,
        config: &RequestConfig,
    ) -> Result<QueryResponse> {
        let body = encode(request)?;
        let response = self
            .transport
            .request(Method::POST, QUERY_ENDPOINT, Some(body), config)
            .await?;
        decode(&response)
    }

    /// Execute several queries in one round trip
    #[tracing::instrument(skip(self, queries), fields(count = queries.len()))]
    pub async fn execute_batch(
        &self,
        queries: Vec<QueryRequest>,
        transaction: bool,
    ) -> Result<BatchResponse> {
        let request = BatchRequest {
            queries,
            transaction,
        };
        let body = encode(&request)?;
        let response = self.transport.post(BATCH_ENDPOINT, body).await?;
        decode(&response)
    }

    /// Health check
    #[tracing::instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self.transport.get(HEALTH_ENDPOINT).await?;
        decode(&response)
    }

    /// Execute a query and return its rows as records
    pub async fn quick_query(&self, query: &str, params: Vec<Value>) -> Result<Vec<Record>> {
        let response = self.execute_query(query, params, None).await?;
        response.validate()?;
        Ok(response.records())
    }

    /// Execute a query and return its first row as a record
    pub async fn quick_row(&self, query: &str, params: Vec<Value>) -> Result<Option<Record>> {
        let response = self.execute_query(query, params, None).await?;
        response.validate()?;
        Ok(response.first_row())
    }

    /// Execute a query and return the first column of its first row
    pub async fn quick_value(&self, query: &str, params: Vec<Value>) -> Result<Option<Value>> {
        let response = self.execute_query(query, params, None).await?;
        response.validate()?;
        Ok(response.first_value().cloned())
    }

    /// Replace both credentials. An empty key removes its header.
    pub fn set_auth(&mut self, api_key: &str, sql_key: &str) {
        self.options.api_key = api_key.to_string();
        self.options.sql_key = sql_key.to_string();

        for (header, key) in [(API_KEY_HEADER, api_key), (SQL_KEY_HEADER, sql_key)] {
            if key.is_empty() {
                self.transport.remove_header(header);
            } else {
                self.transport.set_header(header, key);
            }
        }
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
        self.transport.set_base_url(self.base_url.clone());
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }
}

/// Chained construction over the same adjustments as [`ClientOption`]
pub struct ClientBuilder {
    base_url: String,
    options: Vec<ClientOption>,
}

impl ClientBuilder {
    pub fn api_key(self, key: impl Into<String>) -> Self {
        self.option(ClientOption::ApiKey(key.into()))
    }

    pub fn sql_key(self, key: impl Into<String>) -> Self {
        self.option(ClientOption::SqlKey(key.into()))
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        self.option(ClientOption::Timeout(timeout))
    }

    pub fn max_retries(self, retries: u32) -> Self {
        self.option(ClientOption::MaxRetries(retries))
    }

    pub fn retry_delay(self, delay: Duration) -> Self {
        self.option(ClientOption::RetryDelay(delay))
    }

    /// Opt into exponential backoff instead of a fixed delay
    pub fn exponential_backoff(self, max_delay: Duration) -> Self {
        self.option(ClientOption::Backoff(Backoff::Exponential { max_delay }))
    }

    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.option(ClientOption::Header(name.into(), value.into()))
    }

    pub fn option(mut self, option: ClientOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn build(self) -> Result<AetherClient> {
        AetherClient::new(self.base_url, self.options)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        AetherError::new(
            ErrorCode::RequestError,
            format!("Failed to marshal request: {}", e),
        )
    })
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        AetherError::new(
            ErrorCode::InvalidResponse,
            format!("Failed to unmarshal response: {}", e),
        )
    })
}
