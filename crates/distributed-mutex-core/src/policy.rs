//! Expiry and retry configuration.

use std::time::Duration;

use crate::token::OwnershipToken;

/// Default lifetime of a lock record in the store.
pub const DEFAULT_EXPIRE_TIME: Duration = Duration::from_millis(60 * 1000);

/// Default number of acquire attempts made by a retrying acquire.
pub const DEFAULT_RETRY_COUNT: i32 = 10;

/// Default pause between two acquire attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(300);

/// Retry count meaning "retry until acquired".
pub const UNLIMITED_RETRY: i32 = -1;

/// How long a lock survives unattended and how hard an acquirer retries.
///
/// - `retry_count <= 0` - retry indefinitely
/// - `retry_count > 0` - make at most `retry_count` attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Time-to-live of the lock record.
    pub expire_time: Duration,
    /// Attempt budget, see the type docs.
    pub retry_count: i32,
    /// Pause between attempts.
    pub retry_interval: Duration,
}

impl RetryPolicy {
    /// Creates a policy from explicit values.
    pub const fn new(expire_time: Duration, retry_count: i32, retry_interval: Duration) -> Self {
        Self {
            expire_time,
            retry_count,
            retry_interval,
        }
    }

    /// Returns `true` if acquirers retry until they get the lock.
    pub fn is_unbounded(&self) -> bool {
        self.retry_count <= 0
    }

    /// Returns the attempt budget, `None` when unbounded.
    pub fn attempt_limit(&self) -> Option<u32> {
        if self.is_unbounded() {
            None
        } else {
            Some(self.retry_count as u32)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRE_TIME, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_INTERVAL)
    }
}

/// Per-call overrides for an acquire.
///
/// Unset fields fall back to the client's [`RetryPolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquireOptions {
    /// Token to acquire under; a fresh one is minted when unset.
    pub token: Option<OwnershipToken>,
    /// Overrides [`RetryPolicy::expire_time`].
    pub expire_time: Option<Duration>,
    /// Overrides [`RetryPolicy::retry_count`].
    pub retry_count: Option<i32>,
    /// Overrides [`RetryPolicy::retry_interval`].
    pub retry_interval: Option<Duration>,
}

impl AcquireOptions {
    /// Options with nothing overridden.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `token` instead of minting a fresh one.
    pub fn token(mut self, token: impl Into<OwnershipToken>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the record TTL.
    pub fn expire_time(mut self, expire_time: Duration) -> Self {
        self.expire_time = Some(expire_time);
        self
    }

    /// Sets the attempt budget; zero or less retries until acquired.
    pub fn retry_count(mut self, retry_count: i32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    /// Sets the pause between attempts.
    pub fn retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = Some(retry_interval);
        self
    }

    /// Merges these overrides over `defaults`.
    pub fn resolve(&self, defaults: &RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            expire_time: self.expire_time.unwrap_or(defaults.expire_time),
            retry_count: self.retry_count.unwrap_or(defaults.retry_count),
            retry_interval: self.retry_interval.unwrap_or(defaults.retry_interval),
        }
    }
}
