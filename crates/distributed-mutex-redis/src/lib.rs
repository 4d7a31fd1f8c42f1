//! Redis backend for distributed mutexes.
//!
//! Acquire is a single `SET NX PX`; release and extend are Lua scripts that
//! compare the stored token before touching the key.

pub mod provider;
pub mod store;

pub use provider::{RedisLockClient, RedisLockStoreBuilder};
pub use store::{DEFAULT_KEY_PREFIX, RedisLockStore};
