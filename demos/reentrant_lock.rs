//! Example: Nested protected operations sharing one lock
//!
//! Run with: `cargo run --example reentrant_lock`
//!
//! Uses the in-memory store, so no server is needed.

use distributed_mutex::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

async fn transfer(
    interceptor: &LockInterceptor<MemoryLockStore>,
    ctx: &mut ReentrancyContext,
    options: &LockOptions,
) -> LockResult<Option<u32>> {
    let locked = interceptor
        .run_locked(ctx, options, async |ctx| {
            println!("transfer: depth {}", ctx.depth(&options.lock_key));
            // debit is protected on its own and re-enters here
            if let Ok(None) = debit(interceptor, ctx, options).await {
                println!("debit skipped");
            }
            ctx.depth(&options.lock_key)
        })
        .await?;

    Ok(locked.map(|locked| {
        if let Err(e) = &locked.release {
            println!("transfer ran but the unlock failed: {e}");
        }
        locked.value
    }))
}

async fn debit(
    interceptor: &LockInterceptor<MemoryLockStore>,
    ctx: &mut ReentrancyContext,
    options: &LockOptions,
) -> LockResult<Option<Locked<()>>> {
    interceptor
        .run_locked(ctx, options, async |ctx| {
            println!("debit: depth {}", ctx.depth(&options.lock_key));
        })
        .await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    let store = MemoryLockStore::new();
    let client = LockClient::new(store.clone());
    let interceptor = LockInterceptor::new(client);

    let options: LockOptions = serde_json::from_str(
        r#"{ "lockKey": "account:7", "expireTime": 5000, "retryCount": 3, "retryTime": 100 }"#,
    )?;

    let mut ctx = ReentrancyContext::new();
    let depth = transfer(&interceptor, &mut ctx, &options).await?;
    println!("transfer finished at depth {depth:?}");
    println!("still locked: {}", store.holder("account:7").is_some());

    // A rival call chain is turned away while another chain holds the key
    let holder = interceptor.client().acquire("account:7", None, Some(Duration::from_secs(5))).await?;
    let mut rival = ReentrancyContext::new();
    let skipped = transfer(&interceptor, &mut rival, &options).await?;
    println!("rival transfer ran: {}", skipped.is_some());

    if let Some(token) = holder {
        interceptor.client().release("account:7", &token).await?;
    }
    Ok(())
}
