//! Convenience prelude for distributed mutex types.

pub use crate::client::{LockClient, LockClientBuilder};
pub use crate::error::{LockError, LockResult};
pub use crate::interceptor::{LockInterceptor, LockOptions, Locked};
pub use crate::memory::MemoryLockStore;
pub use crate::policy::{
    AcquireOptions, DEFAULT_EXPIRE_TIME, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_INTERVAL,
    RetryPolicy, UNLIMITED_RETRY,
};
pub use crate::reentrancy::{EnterOutcome, ExitOutcome, ReentrancyContext};
pub use crate::token::OwnershipToken;
pub use crate::traits::LockStore;
