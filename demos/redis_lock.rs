//! Example: Using Redis distributed mutexes
//!
//! Run with: `cargo run --example redis_lock`
//!
//! Requires a Redis server. Set REDIS_URL environment variable
//! or modify the URL below.

use distributed_mutex::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Get Redis URL from environment or use default
    let redis_url = std::env::var("REDIS_URL")
        .unwrap_or_else(|_| "redis://localhost:6379".to_string());

    println!("Connecting to Redis...");
    let store = RedisLockStore::builder().url(&redis_url).build().await?;

    // One client per process; clone it into every consumer
    let client = LockClient::builder(store)
        .expire_time(Duration::from_secs(10))
        .retry_count(5)
        .retry_interval(Duration::from_millis(200))
        .build()?;

    // Acquire with the default retry budget
    println!("Acquiring lock...");
    let Some(token) = client
        .acquire_and_retry("example-resource", AcquireOptions::new())
        .await?
    else {
        println!("Lock busy after 5 attempts, giving up");
        return Ok(());
    };
    println!("Lock acquired with token {token}");

    // Work longer than the TTL, renewing as we go
    for step in 1..=3 {
        tokio::time::sleep(Duration::from_secs(5)).await;
        let renewed = client.extend("example-resource", &token, None).await?;
        println!("Step {step} done, lock renewed: {renewed}");
    }

    // Release the lock
    let released = client.release("example-resource", &token).await?;
    println!("Lock released: {released}");

    Ok(())
}
