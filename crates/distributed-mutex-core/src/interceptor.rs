//! Acquire-before / release-after wrapping of protected operations.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::LockClient;
use crate::error::LockResult;
use crate::policy::{AcquireOptions, DEFAULT_EXPIRE_TIME, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_INTERVAL};
use crate::reentrancy::{ExitOutcome, ReentrancyContext};
use crate::traits::LockStore;

/// Per call-site lock configuration.
///
/// Field names follow the camelCase form used in configuration files:
///
/// ```json
/// { "lockKey": "orders:42", "expireTime": 30000, "retryCount": 5, "retryTime": 200 }
/// ```
///
/// Only `lockKey` is required. Times are whole milliseconds; a `retryCount`
/// of zero or less retries until the lock is acquired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockOptions {
    /// Store key of the lock.
    pub lock_key: String,
    /// Lock record TTL in milliseconds.
    #[serde(default = "default_expire_time_ms")]
    pub expire_time: u64,
    /// Attempt budget; zero or less is unbounded.
    #[serde(default = "default_retry_count")]
    pub retry_count: i32,
    /// Pause between attempts in milliseconds.
    #[serde(default = "default_retry_time_ms")]
    pub retry_time: u64,
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn default_expire_time_ms() -> u64 {
    whole_millis(DEFAULT_EXPIRE_TIME)
}

fn default_retry_count() -> i32 {
    DEFAULT_RETRY_COUNT
}

fn default_retry_time_ms() -> u64 {
    whole_millis(DEFAULT_RETRY_INTERVAL)
}

impl LockOptions {
    /// Options for `lock_key` with the default expiry and retry settings.
    pub fn new(lock_key: impl Into<String>) -> Self {
        Self {
            lock_key: lock_key.into(),
            expire_time: default_expire_time_ms(),
            retry_count: default_retry_count(),
            retry_time: default_retry_time_ms(),
        }
    }

    /// Sets the record TTL, rounded down to whole milliseconds.
    ///
    /// A TTL under one millisecond becomes zero and is rejected as
    /// [`LockError::InvalidConfig`](crate::error::LockError::InvalidConfig)
    /// on acquire.
    pub fn expire_time(mut self, expire_time: Duration) -> Self {
        self.expire_time = whole_millis(expire_time);
        self
    }

    /// Sets the attempt budget; zero or less retries until acquired.
    pub fn retry_count(mut self, retry_count: i32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Sets the pause between attempts, rounded down to whole milliseconds.
    pub fn retry_time(mut self, retry_time: Duration) -> Self {
        self.retry_time = whole_millis(retry_time);
        self
    }

    /// Converts to the per-call overrides understood by [`LockClient`].
    pub fn acquire_options(&self) -> AcquireOptions {
        AcquireOptions::new()
            .expire_time(Duration::from_millis(self.expire_time))
            .retry_count(self.retry_count)
            .retry_interval(Duration::from_millis(self.retry_time))
    }
}

/// A protected operation that ran, with the outcome of exiting its lock.
///
/// The value is kept even when the release fails, since the operation has
/// already taken effect by then.
#[derive(Debug)]
pub struct Locked<T> {
    /// Value returned by the protected operation.
    pub value: T,
    /// Result of exiting the lock after the operation.
    pub release: LockResult<ExitOutcome>,
}

impl<T> Locked<T> {
    /// Returns the operation's value, discarding the release outcome.
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Wraps protected operations with acquire/release calls.
///
/// Acquisition goes through the caller's [`ReentrancyContext`], so a protected
/// operation that calls another protected operation on the same key re-enters
/// instead of deadlocking on itself.
///
/// # Example
///
/// ```rust,ignore
/// let interceptor = LockInterceptor::new(client);
/// let options = LockOptions::new("inventory:sku-1");
/// let mut ctx = ReentrancyContext::new();
///
/// match interceptor
///     .run_locked(&mut ctx, &options, async |_ctx| reserve_stock().await)
///     .await?
/// {
///     Some(locked) => {
///         // reserve_stock ran; locked.release reports whether the unlock worked
///     }
///     None => {
///         // Lock not acquired within the retry budget; reserve_stock was skipped.
///     }
/// }
/// ```
pub struct LockInterceptor<S> {
    client: LockClient<S>,
}

impl<S> Clone for LockInterceptor<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<S: LockStore> LockInterceptor<S> {
    /// Creates an interceptor acquiring through `client`.
    pub fn new(client: LockClient<S>) -> Self {
        Self { client }
    }

    /// Returns the client used for acquire and release.
    pub fn client(&self) -> &LockClient<S> {
        &self.client
    }

    /// Acquires (or re-enters) the lock named by `options`.
    ///
    /// Returns `false` if the retry budget ran out; the protected operation
    /// should then be skipped.
    pub async fn acquire_for_method(
        &self,
        ctx: &mut ReentrancyContext,
        options: &LockOptions,
    ) -> LockResult<bool> {
        let outcome = ctx
            .enter(&self.client, &options.lock_key, options.acquire_options())
            .await?;
        Ok(outcome.is_held())
    }

    /// Exits the lock named by `options`; the store record is released only
    /// by the outermost exit.
    pub async fn release_for_method(
        &self,
        ctx: &mut ReentrancyContext,
        options: &LockOptions,
    ) -> LockResult<ExitOutcome> {
        ctx.exit(&self.client, &options.lock_key).await
    }

    /// Runs `op` while holding the lock named by `options`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(locked))` - Lock held and `op` ran; `locked.release` holds
    ///   the exit outcome, including a failed release
    /// * `Ok(None)` - Lock not acquired, `op` did not run
    /// * `Err(...)` - Acquire failed at the store, `op` did not run
    pub async fn run_locked<T, F>(
        &self,
        ctx: &mut ReentrancyContext,
        options: &LockOptions,
        op: F,
    ) -> LockResult<Option<Locked<T>>>
    where
        F: AsyncFnOnce(&mut ReentrancyContext) -> T,
    {
        if !self.acquire_for_method(ctx, options).await? {
            return Ok(None);
        }

        let value = op(&mut *ctx).await;

        let release = self.release_for_method(ctx, options).await;
        Ok(Some(Locked { value, release }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: LockOptions = serde_json::from_str(r#"{ "lockKey": "orders:42" }"#).unwrap();
        assert_eq!(options, LockOptions::new("orders:42"));
        assert_eq!(options.expire_time, 60_000);
        assert_eq!(options.retry_count, 10);
        assert_eq!(options.retry_time, 300);
    }

    #[test]
    fn test_options_deserialize_overrides() {
        let options: LockOptions = serde_json::from_str(
            r#"{ "lockKey": "k", "expireTime": 1000, "retryCount": -1, "retryTime": 50 }"#,
        )
        .unwrap();

        let acquire = options.acquire_options();
        assert_eq!(acquire.expire_time, Some(Duration::from_secs(1)));
        assert_eq!(acquire.retry_count, Some(-1));
        assert_eq!(acquire.retry_interval, Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_option_durations_round_down_to_millis() {
        let options = LockOptions::new("k")
            .expire_time(Duration::from_micros(1500))
            .retry_time(Duration::MAX);
        assert_eq!(options.expire_time, 1);
        assert_eq!(options.retry_time, u64::MAX);

        let options = LockOptions::new("k").expire_time(Duration::from_micros(999));
        assert_eq!(options.expire_time, 0);
    }

    #[test]
    fn test_options_require_lock_key() {
        let result = serde_json::from_str::<LockOptions>(r#"{ "expireTime": 1000 }"#);
        assert!(result.is_err());
    }
}
