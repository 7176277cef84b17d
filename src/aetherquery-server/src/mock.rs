//! Query executor that fabricates results from the query text.
//!
//! Nothing is parsed or stored. The shape of the answer is chosen by a few
//! textual patterns so clients can be exercised against every response form
//! the protocol allows.

use aetherquery_core::error::ErrorCode;
use aetherquery_core::models::{
    BatchRequest, BatchResponse, ErrorDetail, QueryOptions, QueryRequest, QueryResponse,
    QueryResult,
};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// Id reported for every simulated insert
pub const MOCK_INSERT_ID: i64 = 42;

#[derive(Debug, Clone, PartialEq)]
enum QueryKind {
    Scalar(i64),
    Users,
    Products,
    Mutation { verb: &'static str },
    Failure,
    Generic,
}

impl QueryKind {
    fn classify(query: &str) -> Self {
        let upper = query.trim().to_ascii_uppercase();

        if upper.contains("ERROR") {
            return QueryKind::Failure;
        }

        for verb in ["INSERT", "UPDATE", "DELETE", "CREATE"] {
            if upper.starts_with(verb) {
                return QueryKind::Mutation { verb };
            }
        }

        if let Some(rest) = upper.strip_prefix("SELECT") {
            if let Ok(value) = rest.trim().trim_end_matches(';').trim().parse::<i64>() {
                return QueryKind::Scalar(value);
            }
        }

        if upper.contains("USERS") {
            QueryKind::Users
        } else if upper.contains("PRODUCTS") {
            QueryKind::Products
        } else {
            QueryKind::Generic
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    latency: Duration,
}

impl MockExecutor {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    /// Execute one query after the configured latency
    pub async fn execute(&self, request: &QueryRequest) -> QueryResponse {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.run(request)
    }

    /// Execute every query in order.
    ///
    /// The response holds one entry per input query. A transactional batch
    /// stops executing at the first failure and reports every later query
    /// as not executed; otherwise every query runs. Either way the batch
    /// succeeds only if all of them did.
    pub async fn execute_batch(&self, batch: &BatchRequest) -> BatchResponse {
        let started = Instant::now();
        let mut results = Vec::with_capacity(batch.queries.len());
        let mut aborted = false;

        for request in &batch.queries {
            if aborted {
                results.push(not_executed(request));
                continue;
            }

            let response = self.execute(request).await;
            if !response.success && batch.transaction {
                tracing::debug!(executed = results.len() + 1, "Transactional batch aborted");
                aborted = true;
            }
            results.push(response);
        }

        BatchResponse {
            success: results.iter().all(|response| response.success),
            results,
            total_execution_time: Some(started.elapsed().as_secs_f64()),
        }
    }

    /// Synchronous core of [`execute`](Self::execute), without latency
    pub fn run(&self, request: &QueryRequest) -> QueryResponse {
        let started = Instant::now();
        let options = request.options.clone().unwrap_or_default();
        let kind = QueryKind::classify(&request.query);
        tracing::debug!(query = %request.query, kind = ?kind, "Executing mock query");

        let mut response = QueryResponse {
            success: true,
            query: request.query.clone(),
            ..Default::default()
        };

        match kind {
            QueryKind::Failure => {
                response.success = false;
                response.error = Some(ErrorDetail {
                    code: ErrorCode::QueryExecutionFailed,
                    message: "Simulated query failure".to_string(),
                    details: Some(json!({ "query": request.query })),
                });
            }
            QueryKind::Mutation { verb } if options.read_only == Some(true) => {
                response.success = false;
                response.error = Some(ErrorDetail::new(
                    ErrorCode::ValidationError,
                    format!("{} is not allowed in a read-only query", verb),
                ));
            }
            QueryKind::Mutation { verb } => {
                response.affected_rows = Some(if verb == "CREATE" { 0 } else { 1 });
                if verb == "INSERT" {
                    response.last_insert_id = Some(MOCK_INSERT_ID);
                }
            }
            QueryKind::Scalar(value) => {
                response.result = Some(table(
                    &["value"],
                    vec![vec![json!(value)]],
                    &options,
                    &request.query,
                ));
            }
            QueryKind::Users => {
                response.result = Some(table(
                    &["id", "name", "email", "status", "created_at"],
                    users(),
                    &options,
                    &request.query,
                ));
            }
            QueryKind::Products => {
                response.result = Some(table(
                    &["id", "name", "price", "in_stock"],
                    products(),
                    &options,
                    &request.query,
                ));
            }
            QueryKind::Generic => {
                response.result = Some(table(
                    &["query", "status"],
                    vec![vec![json!(request.query), json!("executed")]],
                    &options,
                    &request.query,
                ));
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        if let Some(result) = response.result.as_mut() {
            result.execution_time = Some(elapsed);
        }
        response.execution_time = Some(elapsed);
        response
    }
}

fn not_executed(request: &QueryRequest) -> QueryResponse {
    QueryResponse {
        success: false,
        query: request.query.clone(),
        error: Some(ErrorDetail::new(
            ErrorCode::QueryExecutionFailed,
            "not executed: transaction aborted",
        )),
        ..Default::default()
    }
}

/// Build a result, honoring a trailing `LIMIT n` and `max_rows`
fn table(
    columns: &[&str],
    mut rows: Vec<Vec<Value>>,
    options: &QueryOptions,
    query: &str,
) -> QueryResult {
    if let Some(limit) = limit_clause(query) {
        rows.truncate(limit);
    }
    if let Some(max_rows) = options.max_rows {
        rows.truncate(max_rows);
    }

    QueryResult {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        row_count: rows.len(),
        rows,
        execution_time: None,
    }
}

fn limit_clause(query: &str) -> Option<usize> {
    let upper = query.to_ascii_uppercase();
    let position = upper.rfind("LIMIT")?;
    upper[position + "LIMIT".len()..]
        .split_whitespace()
        .next()?
        .trim_end_matches(';')
        .parse()
        .ok()
}

fn users() -> Vec<Vec<Value>> {
    vec![
        user(1, "Alice", "active", "2024-01-15"),
        user(2, "Bob", "active", "2024-02-20"),
        user(3, "Carol", "inactive", "2024-03-10"),
    ]
}

fn user(id: i64, name: &str, status: &str, created_at: &str) -> Vec<Value> {
    let email = format!("{}@example.com", name.to_ascii_lowercase());
    vec![json!(id), json!(name), json!(email), json!(status), json!(created_at)]
}

fn products() -> Vec<Vec<Value>> {
    vec![
        vec![json!(1), json!("Keyboard"), json!(49.99), json!(true)],
        vec![json!(2), json!("Monitor"), json!(199.0), json!(true)],
        vec![json!(3), json!("Webcam"), json!(79.5), json!(false)],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(query: &str) -> QueryResponse {
        MockExecutor::default().run(&QueryRequest::new(query))
    }

    #[test]
    fn test_scalar_select() {
        let response = run("SELECT 1");
        assert!(response.success);
        assert_eq!(response.first_value(), Some(&json!(1)));

        let response = run("select -7;");
        assert_eq!(response.first_value(), Some(&json!(-7)));
    }

    #[test]
    fn test_users_table() {
        let response = run("SELECT * FROM users");
        let result = response.result.clone().unwrap();
        assert_eq!(result.row_count, 3);
        assert_eq!(result.columns[1], "name");
        assert_eq!(response.records()[0].get("name"), Some(&json!("Alice")));
    }

    #[test]
    fn test_products_table() {
        let response = run("SELECT name, price FROM products");
        let result = response.result.unwrap();
        assert_eq!(
            result.get_column_by_name("name"),
            Some(vec![&json!("Keyboard"), &json!("Monitor"), &json!("Webcam")])
        );
    }

    #[test]
    fn test_limit_and_max_rows() {
        let response = run("SELECT * FROM users LIMIT 2");
        assert_eq!(response.result.unwrap().row_count, 2);

        let request = QueryRequest::new("SELECT * FROM users")
            .with_options(QueryOptions::default().max_rows(1));
        let response = MockExecutor::default().run(&request);
        let result = response.result.unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.row_count, 1);
    }

    #[test]
    fn test_mutations() {
        let insert = run("INSERT INTO users (name) VALUES ('Dave')");
        assert!(insert.success);
        assert!(insert.result.is_none());
        assert_eq!(insert.affected_rows, Some(1));
        assert_eq!(insert.last_insert_id, Some(MOCK_INSERT_ID));

        let update = run("UPDATE users SET status = 'active'");
        assert_eq!(update.affected_rows, Some(1));
        assert_eq!(update.last_insert_id, None);

        let create = run("CREATE TABLE t (id INTEGER)");
        assert_eq!(create.affected_rows, Some(0));
    }

    #[test]
    fn test_read_only_rejects_mutation() {
        let request = QueryRequest::new("DELETE FROM users")
            .with_options(QueryOptions::default().read_only(true));
        let response = MockExecutor::default().run(&request);
        assert!(!response.success);
        let err = response.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_failure_pattern() {
        let response = run("SELECT error FROM nowhere");
        assert!(!response.success);
        assert!(response.result.is_none());
        assert_eq!(
            response.error.map(|e| e.code),
            Some(ErrorCode::QueryExecutionFailed)
        );
    }

    #[test]
    fn test_generic_query() {
        let response = run("SHOW TABLES");
        assert!(response.success);
        assert_eq!(response.first_row().unwrap().get("status"), Some(&json!("executed")));
    }

    #[tokio::test]
    async fn test_transactional_batch_stops_at_failure() {
        let batch = BatchRequest {
            queries: vec![
                QueryRequest::new("INSERT INTO t VALUES (1)"),
                QueryRequest::new("SELECT error"),
                QueryRequest::new("SELECT 2"),
            ],
            transaction: true,
        };

        let response = MockExecutor::default().execute_batch(&batch).await;
        assert!(!response.success);
        assert_eq!(response.results.len(), batch.queries.len());
        assert_eq!(
            response.failures().map(|(i, _)| i).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let skipped = &response.results[2];
        assert_eq!(skipped.query, "SELECT 2");
        assert!(skipped.result.is_none());
        let detail = skipped.error.as_ref().unwrap();
        assert_eq!(detail.code, ErrorCode::QueryExecutionFailed);
        assert!(detail.message.contains("not executed"));
    }

    #[tokio::test]
    async fn test_plain_batch_runs_everything() {
        let batch = BatchRequest {
            queries: vec![QueryRequest::new("SELECT error"), QueryRequest::new("SELECT 2")],
            transaction: false,
        };

        let response = MockExecutor::default().execute_batch(&batch).await;
        assert!(!response.success);
        assert_eq!(response.results.len(), 2);
        assert!(response.results[1].success);
    }

    #[tokio::test]
    async fn test_simulated_latency() {
        let executor = MockExecutor::new(Duration::from_millis(30));
        let started = Instant::now();
        executor.execute(&QueryRequest::new("SELECT 1")).await;
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
