use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{AetherError, ErrorCode};

/// Record is a single row keyed by column name
pub type Record = HashMap<String, Value>;

/// QueryRequest is the body of `POST /query`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<QueryOptions>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
            options: None,
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// QueryOptions are per-query hints. Absent fields use the server default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<usize>,
}

impl QueryOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout.as_secs_f64());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }
}

/// BatchRequest is the body of `POST /batch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub queries: Vec<QueryRequest>,
    /// All-or-nothing semantics, applied by the server
    #[serde(default)]
    pub transaction: bool,
}

/// QueryResult is a tabular payload: column names plus row-major values.
///
/// Rows are not required to match the column count; every accessor
/// tolerates short rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
    #[serde(default)]
    pub row_count: usize,
    /// Execution time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

impl QueryResult {
    /// Pair each column name with the value at the same position in row `index`.
    ///
    /// Returns `None` when the row does not exist. Columns without a value in
    /// a short row are left out. Under duplicate column names the later
    /// column's value is kept.
    pub fn row_to_map(&self, index: usize) -> Option<Record> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .zip(row.iter())
                .map(|(column, value)| (column.clone(), value.clone()))
                .collect(),
        )
    }

    /// All rows as records, in row order
    pub fn all_to_maps(&self) -> Vec<Record> {
        (0..self.rows.len())
            .filter_map(|index| self.row_to_map(index))
            .collect()
    }

    /// Bounds-checked cell lookup
    pub fn get_value(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row)?.get(col)
    }

    /// Values of column `col`; rows too short to have it are skipped
    pub fn get_column(&self, col: usize) -> Vec<&Value> {
        self.rows.iter().filter_map(|row| row.get(col)).collect()
    }

    /// Values of the first column called `name`
    pub fn get_column_by_name(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.get_column(index))
    }

    /// Position of the first column called `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn execution_duration(&self) -> Option<Duration> {
        seconds_to_duration(self.execution_time)
    }
}

/// QueryResponse is the answer to `POST /query`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(default)]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_insert_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl QueryResponse {
    /// Check that the query succeeded.
    ///
    /// A failed response becomes an error built from its embedded
    /// [`ErrorDetail`], or `QUERY_EXECUTION_FAILED` when none was sent.
    pub fn validate(&self) -> Result<(), AetherError> {
        if self.success {
            return Ok(());
        }

        match &self.error {
            Some(detail) => Err(AetherError::from_detail(detail.clone(), None)),
            None => Err(AetherError::query_execution_failed()),
        }
    }

    /// All rows as records; empty when there is no result
    pub fn records(&self) -> Vec<Record> {
        self.result
            .as_ref()
            .map(QueryResult::all_to_maps)
            .unwrap_or_default()
    }

    pub fn first_row(&self) -> Option<Record> {
        self.result.as_ref()?.row_to_map(0)
    }

    /// First column of the first row
    pub fn first_value(&self) -> Option<&Value> {
        self.result.as_ref()?.get_value(0, 0)
    }

    pub fn execution_duration(&self) -> Option<Duration> {
        seconds_to_duration(self.execution_time)
    }
}

/// BatchResponse is the answer to `POST /batch`, one entry per input query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<QueryResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_execution_time: Option<f64>,
}

impl BatchResponse {
    /// Failed entries with their position in the batch
    pub fn failures(&self) -> impl Iterator<Item = (usize, &QueryResponse)> {
        self.results
            .iter()
            .enumerate()
            .filter(|(_, response)| !response.success)
    }

    pub fn total_duration(&self) -> Option<Duration> {
        seconds_to_duration(self.total_execution_time)
    }
}

/// HealthResponse is the answer to `GET /health`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// ErrorDetail describes a failure reported by the server.
///
/// Every field may be absent on the wire; a missing code reads as
/// `UNKNOWN_ERROR`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: ErrorCode,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorDetail {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }
}

/// ErrorEnvelope is the body of a structured non-2xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

impl ErrorEnvelope {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail::new(code, message),
        }
    }
}

fn seconds_to_duration(seconds: Option<f64>) -> Option<Duration> {
    seconds.and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}
