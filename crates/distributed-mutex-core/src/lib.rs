//! Core lock protocol for distributed mutexes.
//!
//! A [`LockStore`] provides the atomic store-side operations, [`LockClient`]
//! layers token minting, expiry and retry policy on top of it, and
//! [`ReentrancyContext`] lets one call chain nest acquisitions of the same key
//! while the store sees a single acquire and a single release.

pub mod client;
pub mod error;
pub mod interceptor;
pub mod memory;
pub mod policy;
pub mod prelude;
pub mod reentrancy;
pub mod token;
pub mod traits;

pub use error::{LockError, LockResult};
pub use prelude::*;
