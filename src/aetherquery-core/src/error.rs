use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::ErrorDetail;

/// Symbolic failure category carried by every [`AetherError`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    // Mapped from HTTP status codes
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    ValidationError,
    RateLimited,
    ServerError,
    ServiceUnavailable,
    #[default]
    UnknownError,

    // Raised by the transport and client layers
    NetworkError,
    RequestError,
    ReadError,
    HttpError,
    ConnectionFailed,
    InvalidResponse,
    QueryExecutionFailed,
    AuthenticationFailed,
    Timeout,
    Cancelled,

    /// Code reported by the server that has no dedicated variant
    Other(String),
}

impl ErrorCode {
    /// Map an HTTP status to its category. Unmatched statuses are `UNKNOWN_ERROR`.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorCode::BadRequest,
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            422 => ErrorCode::ValidationError,
            429 => ErrorCode::RateLimited,
            500 => ErrorCode::ServerError,
            502..=504 => ErrorCode::ServiceUnavailable,
            _ => ErrorCode::UnknownError,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::RequestError => "REQUEST_ERROR",
            ErrorCode::ReadError => "READ_ERROR",
            ErrorCode::HttpError => "HTTP_ERROR",
            ErrorCode::ConnectionFailed => "CONNECTION_FAILED",
            ErrorCode::InvalidResponse => "INVALID_RESPONSE",
            ErrorCode::QueryExecutionFailed => "QUERY_EXECUTION_FAILED",
            ErrorCode::AuthenticationFailed => "AUTHENTICATION_FAILED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Other(code) => code,
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "BAD_REQUEST" => ErrorCode::BadRequest,
            "UNAUTHORIZED" => ErrorCode::Unauthorized,
            "FORBIDDEN" => ErrorCode::Forbidden,
            "NOT_FOUND" => ErrorCode::NotFound,
            "VALIDATION_ERROR" => ErrorCode::ValidationError,
            "RATE_LIMITED" => ErrorCode::RateLimited,
            "SERVER_ERROR" => ErrorCode::ServerError,
            "SERVICE_UNAVAILABLE" => ErrorCode::ServiceUnavailable,
            "UNKNOWN_ERROR" => ErrorCode::UnknownError,
            "NETWORK_ERROR" => ErrorCode::NetworkError,
            "REQUEST_ERROR" => ErrorCode::RequestError,
            "READ_ERROR" => ErrorCode::ReadError,
            "HTTP_ERROR" => ErrorCode::HttpError,
            "CONNECTION_FAILED" => ErrorCode::ConnectionFailed,
            "INVALID_RESPONSE" => ErrorCode::InvalidResponse,
            "QUERY_EXECUTION_FAILED" => ErrorCode::QueryExecutionFailed,
            "AUTHENTICATION_FAILED" => ErrorCode::AuthenticationFailed,
            "TIMEOUT" => ErrorCode::Timeout,
            "CANCELLED" => ErrorCode::Cancelled,
            other => ErrorCode::Other(other.to_string()),
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        ErrorCode::from(code.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AetherError is the single error value produced by every failure path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("[{code}] {}{message}", http_prefix(.http_code))]
pub struct AetherError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_code: Option<u16>,
}

fn http_prefix(http_code: &Option<u16>) -> String {
    match http_code {
        Some(status) => format!("HTTP {}: ", status),
        None => String::new(),
    }
}

impl AetherError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            http_code: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_http_code(mut self, status: u16) -> Self {
        self.http_code = Some(status);
        self
    }

    /// Build an error from a server-side [`ErrorDetail`], keeping its code verbatim
    pub fn from_detail(detail: ErrorDetail, http_code: Option<u16>) -> Self {
        Self {
            code: detail.code,
            message: detail.message,
            details: detail.details,
            http_code,
        }
    }

    pub fn connection_failed() -> Self {
        Self::new(
            ErrorCode::ConnectionFailed,
            "Failed to connect to AetherQuery server",
        )
    }

    pub fn invalid_response() -> Self {
        Self::new(ErrorCode::InvalidResponse, "Invalid response from server")
    }

    pub fn query_execution_failed() -> Self {
        Self::new(ErrorCode::QueryExecutionFailed, "Query execution failed")
    }

    pub fn authentication_failed() -> Self {
        Self::new(ErrorCode::AuthenticationFailed, "Authentication failed")
    }

    pub fn validation() -> Self {
        Self::new(ErrorCode::ValidationError, "Request validation failed")
    }

    pub fn timeout() -> Self {
        Self::new(ErrorCode::Timeout, "Request timeout")
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "Request cancelled")
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::NetworkError | ErrorCode::ConnectionFailed
        ) || self.http_code.is_some_and(|status| status >= 500)
    }

    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::Unauthorized | ErrorCode::Forbidden | ErrorCode::AuthenticationFailed
        ) || matches!(self.http_code, Some(401) | Some(403))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ValidationError | ErrorCode::BadRequest
        ) || matches!(self.http_code, Some(400) | Some(422))
    }
}

/// Classify a failure by HTTP status
pub fn map_status(
    status: u16,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> AetherError {
    AetherError {
        code: ErrorCode::from_status(status),
        message: message.into(),
        details,
        http_code: Some(status),
    }
}

/// Find the first [`AetherError`] in an error's source chain
fn find_aether_error<'a>(
    err: &'a (dyn std::error::Error + 'static),
) -> Option<&'a AetherError> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(aether) = err.downcast_ref::<AetherError>() {
            return Some(aether);
        }
        current = err.source();
    }
    None
}

pub fn is_connection_error(err: &(dyn std::error::Error + 'static)) -> bool {
    find_aether_error(err).is_some_and(AetherError::is_connection_error)
}

pub fn is_authentication_error(err: &(dyn std::error::Error + 'static)) -> bool {
    find_aether_error(err).is_some_and(AetherError::is_authentication_error)
}

pub fn is_validation_error(err: &(dyn std::error::Error + 'static)) -> bool {
    find_aether_error(err).is_some_and(AetherError::is_validation_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (400, ErrorCode::BadRequest),
            (401, ErrorCode::Unauthorized),
            (403, ErrorCode::Forbidden),
            (404, ErrorCode::NotFound),
            (422, ErrorCode::ValidationError),
            (429, ErrorCode::RateLimited),
            (500, ErrorCode::ServerError),
            (502, ErrorCode::ServiceUnavailable),
            (503, ErrorCode::ServiceUnavailable),
            (504, ErrorCode::ServiceUnavailable),
        ];

        for (status, expected) in cases {
            let err = map_status(status, "test message", None);
            assert_eq!(err.code, expected, "status {}", status);
            assert_eq!(err.http_code, Some(status));
            assert_eq!(err.message, "test message");
        }
    }

    #[test]
    fn test_unmatched_status_is_unknown() {
        for status in [0, 200, 302, 405, 408, 418, 501, 505, 999] {
            assert_eq!(ErrorCode::from_status(status), ErrorCode::UnknownError);
        }
    }

    #[test]
    fn test_is_connection_error() {
        assert!(AetherError::new(ErrorCode::NetworkError, "down").is_connection_error());
        assert!(AetherError::connection_failed().is_connection_error());

        let server_error = map_status(500, "boom", None);
        assert!(server_error.is_connection_error());

        let validation = map_status(422, "bad column", None);
        assert!(!validation.is_connection_error());
    }

    #[test]
    fn test_is_authentication_error() {
        assert!(map_status(401, "no key", None).is_authentication_error());
        assert!(map_status(403, "denied", None).is_authentication_error());
        assert!(AetherError::authentication_failed().is_authentication_error());

        // Custom server code still counts when the status says so
        let custom = AetherError::new(ErrorCode::from("TOKEN_EXPIRED"), "expired")
            .with_http_code(401);
        assert!(custom.is_authentication_error());

        assert!(!map_status(500, "boom", None).is_authentication_error());
    }

    #[test]
    fn test_is_validation_error() {
        assert!(map_status(400, "bad", None).is_validation_error());
        assert!(map_status(422, "bad column", None).is_validation_error());
        assert!(AetherError::validation().is_validation_error());
        assert!(!AetherError::timeout().is_validation_error());
    }

    #[test]
    fn test_predicates_on_foreign_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "not ours");
        assert!(!is_connection_error(&io));
        assert!(!is_authentication_error(&io));
        assert!(!is_validation_error(&io));

        let aether = map_status(503, "unavailable", None);
        assert!(is_connection_error(&aether));
        assert!(!is_validation_error(&aether));
    }

    #[test]
    fn test_predicates_walk_source_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("wrapped")]
        struct Wrapper(#[source] AetherError);

        let wrapped = Wrapper(map_status(422, "bad column", None));
        assert!(is_validation_error(&wrapped));
        assert!(!is_connection_error(&wrapped));
    }

    #[test]
    fn test_display() {
        let with_status = map_status(422, "bad column", None);
        assert_eq!(with_status.to_string(), "[VALIDATION_ERROR] HTTP 422: bad column");

        let without_status = AetherError::timeout();
        assert_eq!(without_status.to_string(), "[TIMEOUT] Request timeout");
    }

    #[test]
    fn test_unknown_codes_are_preserved() {
        let code = ErrorCode::from("DEADLOCK_DETECTED");
        assert_eq!(code, ErrorCode::Other("DEADLOCK_DETECTED".to_string()));
        assert_eq!(code.as_str(), "DEADLOCK_DETECTED");

        let json = serde_json::to_value(&code).unwrap();
        assert_eq!(json, serde_json::json!("DEADLOCK_DETECTED"));
    }

    #[test]
    fn test_error_serialization_skips_absent_fields() {
        let err = AetherError::query_execution_failed();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "code": "QUERY_EXECUTION_FAILED",
                "message": "Query execution failed"
            })
        );
    }
}
