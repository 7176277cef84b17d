//! Batch and Error Handling Example
//!
//! Runs a transactional batch and shows how the different failure kinds
//! surface: query-level failures, server-side validation errors and
//! connection errors after the retry budget is spent.
//!
//! Run with: cargo run --example batch_and_errors

use aetherquery_rs::{
    is_connection_error, is_validation_error, AetherClient, CancellationToken, ClientOption,
    QueryRequest, RequestConfig,
};
use serde_json::json;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_url =
        std::env::var("AETHERQUERY_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

    let mut client = AetherClient::new(
        base_url.as_str(),
        vec![
            ClientOption::MaxRetries(1),
            ClientOption::RetryDelay(Duration::from_millis(200)),
        ],
    )?;

    // Transactional batch: stops at the failing statement
    let batch = client
        .execute_batch(
            vec![
                QueryRequest::new("INSERT INTO users (name) VALUES (?)")
                    .with_params(vec![json!("Dave")]),
                QueryRequest::new("SELECT error FROM audit"),
                QueryRequest::new("SELECT COUNT(*) FROM users"),
            ],
            true,
        )
        .await?;

    println!("Batch success: {}", batch.success);
    for (index, failed) in batch.failures() {
        println!(
            "   query #{} failed: {:?}",
            index,
            failed.error.as_ref().map(|e| &e.message)
        );
    }

    // Query-level failure is only an error once validated
    match client.quick_query("SELECT error", Vec::new()).await {
        Ok(rows) => println!("Unexpected rows: {:?}", rows),
        Err(e) => println!("Query failed: {}", e),
    }

    // Server-side validation
    if let Err(e) = client.execute_query("", Vec::new(), None).await {
        println!("Validation error? {} ({})", is_validation_error(&e), e);
    }

    // Per-call timeout and cancellation
    let token = CancellationToken::new();
    let config = RequestConfig::default()
        .timeout(Duration::from_secs(2))
        .header("X-Trace-Id", "demo-1")
        .cancel_on(token.clone());
    let response = client
        .execute_query_with(&QueryRequest::new("SELECT 7"), &config)
        .await?;
    println!("SELECT 7 => {:?}", response.first_value());

    // Nothing listens here; the retry budget runs out
    client.set_base_url("http://127.0.0.1:1");
    if let Err(e) = client.health().await {
        println!("Connection error? {} ({})", is_connection_error(&e), e);
    }

    Ok(())
}
