//! Basic Query Example
//!
//! Connects to a running AetherQuery server, checks its health and reads
//! rows with the convenience calls.
//!
//! Start the mock server first (`cargo run -p aetherquery-server`), then
//! run with: cargo run --example basic_query

use aetherquery_rs::{AetherClient, QueryOptions};
use serde_json::json;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_url =
        std::env::var("AETHERQUERY_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    println!("AetherQuery Basic Example ({})\n", base_url);

    let client = AetherClient::builder(&base_url)
        .api_key("demo-key")
        .timeout(Duration::from_secs(10))
        .max_retries(2)
        .retry_delay(Duration::from_millis(500))
        .build()?;

    let health = client.health().await?;
    println!("✅ Server is {} (version {:?})\n", health.status, health.version);

    // Single value
    if let Some(value) = client.quick_value("SELECT 1", Vec::new()).await? {
        println!("SELECT 1 => {}", value);
    }

    // Rows as records
    let users = client
        .quick_query("SELECT * FROM users WHERE status = ?", vec![json!("active")])
        .await?;
    println!("\n👥 {} users:", users.len());
    for user in &users {
        println!("   {} <{}>", user["name"], user["email"]);
    }

    // Full response with options
    let response = client
        .execute_query(
            "SELECT * FROM products",
            Vec::new(),
            Some(QueryOptions::default().read_only(true).max_rows(2)),
        )
        .await?;
    response.validate()?;

    if let Some(result) = &response.result {
        println!("\n📦 Products ({} rows):", result.row_count);
        if let Some(names) = result.get_column_by_name("name") {
            for name in names {
                println!("   {}", name);
            }
        }
    }
    if let Some(duration) = response.execution_duration() {
        println!("   took {:?}", duration);
    }

    Ok(())
}
