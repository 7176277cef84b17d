//! AetherQuery Client Library
//!
//! Resilient HTTP client for AetherQuery servers: a retrying transport,
//! the query/batch/health API and record-oriented convenience calls.

mod client;
pub mod host;
mod transport;

#[cfg(test)]
mod test_support;

pub use client::{AetherClient, ClientBuilder, BATCH_ENDPOINT, HEALTH_ENDPOINT, QUERY_ENDPOINT};
pub use transport::{HttpTransport, RequestConfig, TransportOptions, USER_AGENT};
pub use tokio_util::sync::CancellationToken;

pub use aetherquery_core::{
    is_authentication_error, is_connection_error, is_validation_error, AetherError, Backoff,
    BatchRequest, BatchResponse, ClientOption, ClientOptions, ErrorCode, ErrorDetail,
    HealthResponse, QueryOptions, QueryRequest, QueryResponse, QueryResult, Record, RetryPolicy,
};

pub type Result<T> = std::result::Result<T, AetherError>;
