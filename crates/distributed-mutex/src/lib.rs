//! Re-entrant distributed mutexes over a shared key-value store.
//!
//! Callers in independent processes coordinate exclusive access to a named
//! resource through a store they can all reach. Acquire and release are
//! atomic on the store side, ownership is proven with a per-acquisition
//! token, and every lock carries a time-to-live so a crashed holder cannot
//! wedge it forever.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use distributed_mutex::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // One client per process, cloned into every consumer
//!     let store = RedisLockStore::new("redis://localhost:6379").await?;
//!     let client = LockClient::builder(store)
//!         .expire_time(Duration::from_secs(30))
//!         .build()?;
//!
//!     // Retry up to the default budget (10 attempts, 300ms apart)
//!     if let Some(token) = client.acquire_and_retry("orders:42", AcquireOptions::new()).await? {
//!         println!("Doing critical work...");
//!         client.release("orders:42", &token).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Re-entrancy
//!
//! A [`ReentrancyContext`] per call chain lets nested operations re-enter a
//! key they already hold. Only the outermost enter and exit reach the store.
//!
//! ```rust,no_run
//! # use distributed_mutex::*;
//! # async fn nested(client: LockClient<MemoryLockStore>) -> LockResult<()> {
//! let interceptor = LockInterceptor::new(client);
//! let options = LockOptions::new("account:7");
//! let mut ctx = ReentrancyContext::new();
//!
//! interceptor
//!     .run_locked(&mut ctx, &options, async |ctx| {
//!         // Same key, same chain: depth 2, no store round trip
//!         interceptor.run_locked(ctx, &options, async |_| ()).await
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Backends
//!
//! - **Redis** (`distributed-mutex-redis`): `SET NX PX` plus Lua scripts.
//! - **Memory** (`distributed-mutex-core`): in-process map, for tests and
//!   single-process deployments.
//!
//! # Crate Organization
//!
//! This is a facade crate that re-exports types from:
//! - `distributed-mutex-core`: store trait, client, policy, re-entrancy
//! - `distributed-mutex-redis`: Redis store
//!
//! For fine-grained control, you can depend on individual crates instead.

// Re-export core types and traits
pub use distributed_mutex_core::*;

// Re-export redis backend
pub use distributed_mutex_redis::*;
