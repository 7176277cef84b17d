//! AetherQuery Core Library
//!
//! This crate provides the transport-independent pieces of AetherQuery:
//! - Error taxonomy shared by every client and the mock server
//! - Wire data model for queries, batches and health checks
//! - Record-oriented views over tabular results
//! - Retry policy
//! - Client and server configuration

pub mod config;
pub mod error;
pub mod models;
pub mod retry;

// Re-export commonly used types
pub use config::{ClientOption, ClientOptions, Config};
pub use error::{
    is_authentication_error, is_connection_error, is_validation_error, map_status, AetherError,
    ErrorCode,
};
pub use models::*;
pub use retry::{Backoff, RetryPolicy};
