//! Lock client: single-attempt acquire, retrying acquire, release, extend.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{Span, debug, field, info, instrument, warn};

use crate::error::{LockError, LockResult};
use crate::policy::{AcquireOptions, RetryPolicy};
use crate::token::OwnershipToken;
use crate::traits::LockStore;

/// Builder for [`LockClient`] configuration.
///
/// Every setter overrides one process-wide default; individual calls can still
/// override it again through [`AcquireOptions`].
pub struct LockClientBuilder<S> {
    store: Arc<S>,
    defaults: RetryPolicy,
}

impl<S: LockStore> LockClientBuilder<S> {
    /// Sets the default lock expiry time.
    pub fn expire_time(mut self, expire_time: Duration) -> Self {
        self.defaults.expire_time = expire_time;
        self
    }

    /// Sets the default attempt budget. Zero or negative retries forever.
    pub fn retry_count(mut self, retry_count: i32) -> Self {
        self.defaults.retry_count = retry_count;
        self
    }

    /// Sets the default pause between attempts.
    pub fn retry_interval(mut self, retry_interval: Duration) -> Self {
        self.defaults.retry_interval = retry_interval;
        self
    }

    /// Replaces all defaults at once.
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.defaults = policy;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::InvalidConfig`] if the defaults describe a zero
    /// expiry or an unbounded retry loop without a pause.
    pub fn build(self) -> LockResult<LockClient<S>> {
        validate_policy(&self.defaults)?;
        Ok(LockClient {
            store: self.store,
            defaults: self.defaults,
        })
    }
}

/// Coordinates exclusive access to named resources through a [`LockStore`].
///
/// Construct one client per process and hand clones to every consumer; clones
/// share the same store connection.
///
/// # Example
///
/// ```rust,ignore
/// let client = LockClient::builder(store)
///     .expire_time(Duration::from_secs(30))
///     .build()?;
///
/// if let Some(token) = client.acquire_and_retry("orders:42", AcquireOptions::new()).await? {
///     process_order().await;
///     client.release("orders:42", &token).await?;
/// }
/// ```
pub struct LockClient<S> {
    store: Arc<S>,
    defaults: RetryPolicy,
}

impl<S> Clone for LockClient<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            defaults: self.defaults,
        }
    }
}

impl<S: LockStore> LockClient<S> {
    /// Creates a client with the default [`RetryPolicy`].
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            defaults: RetryPolicy::default(),
        }
    }

    /// Returns a builder for configuring the client.
    pub fn builder(store: S) -> LockClientBuilder<S> {
        Self::builder_shared(Arc::new(store))
    }

    /// Returns a builder over a store that is already shared.
    pub fn builder_shared(store: Arc<S>) -> LockClientBuilder<S> {
        LockClientBuilder {
            store,
            defaults: RetryPolicy::default(),
        }
    }

    /// Returns the process-wide defaults.
    pub fn defaults(&self) -> &RetryPolicy {
        &self.defaults
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Makes a single acquire attempt.
    ///
    /// A fresh token is minted when `token` is `None`; `ttl` falls back to
    /// the default expire time.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(token))` - Lock acquired under `token`
    /// * `Ok(None)` - Lock is held by someone else
    /// * `Err(...)` - Invalid input or store failure
    #[instrument(skip(self, token), fields(lock.key = %key, backend = self.store.backend(), acquired = field::Empty))]
    pub async fn acquire(
        &self,
        key: &str,
        token: Option<OwnershipToken>,
        ttl: Option<Duration>,
    ) -> LockResult<Option<OwnershipToken>> {
        validate_key(key)?;
        let ttl = ttl.unwrap_or(self.defaults.expire_time);
        validate_expire_time(ttl)?;

        let token = token.unwrap_or_else(OwnershipToken::generate);
        let acquired = self.store.conditional_acquire(key, &token, ttl).await?;
        Span::current().record("acquired", acquired);

        Ok(acquired.then_some(token))
    }

    /// Acquires the lock, retrying under the resolved [`RetryPolicy`].
    ///
    /// With a positive retry count this makes exactly that many attempts,
    /// pausing `retry_interval` after each failed one, and then returns
    /// `Ok(None)`. With a zero or negative retry count it only returns once
    /// the lock is acquired (or the store fails), so use it deliberately.
    pub async fn acquire_and_retry(
        &self,
        key: &str,
        options: AcquireOptions,
    ) -> LockResult<Option<OwnershipToken>> {
        // Keep the sender alive so the loop is never cancelled.
        let (_cancel_sender, cancel_receiver) = watch::channel(false);
        self.acquire_and_retry_cancellable(key, options, cancel_receiver)
            .await
    }

    /// Like [`acquire_and_retry`](Self::acquire_and_retry), but abandons the
    /// loop with [`LockError::Cancelled`] as soon as `true` is sent on
    /// `cancel`.
    ///
    /// Cancellation is observed before every attempt and during every pause.
    /// A dropped sender never cancels.
    #[instrument(skip(self, options, cancel), fields(lock.key = %key, backend = self.store.backend(), acquired = field::Empty, attempts = field::Empty, elapsed_ms = field::Empty))]
    pub async fn acquire_and_retry_cancellable(
        &self,
        key: &str,
        options: AcquireOptions,
        mut cancel: watch::Receiver<bool>,
    ) -> LockResult<Option<OwnershipToken>> {
        validate_key(key)?;
        let policy = options.resolve(&self.defaults);
        validate_policy(&policy)?;

        let token = options.token.unwrap_or_else(OwnershipToken::generate);
        let limit = policy.attempt_limit();
        let start = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            if *cancel.borrow() {
                warn!(attempts, "lock acquisition cancelled");
                return Err(LockError::Cancelled);
            }

            attempts += 1;
            let acquired = self
                .store
                .conditional_acquire(key, &token, policy.expire_time)
                .await?;

            if acquired {
                let span = Span::current();
                span.record("acquired", true);
                span.record("attempts", attempts);
                span.record("elapsed_ms", start.elapsed().as_millis() as u64);
                return Ok(Some(token));
            }

            debug!(attempt = attempts, "lock held by another owner");

            if let Err(e) = sleep_or_cancel(policy.retry_interval, &mut cancel).await {
                warn!(attempts, "lock acquisition cancelled");
                return Err(e);
            }

            if limit.is_some_and(|limit| attempts >= limit) {
                let span = Span::current();
                span.record("acquired", false);
                span.record("attempts", attempts);
                span.record("elapsed_ms", start.elapsed().as_millis() as u64);
                return Ok(None);
            }
        }
    }

    /// Releases the lock if `token` still owns it.
    ///
    /// `Ok(false)` means the record was already gone or belongs to someone
    /// else, typically because it expired while the work was running.
    #[instrument(skip(self, token), fields(lock.key = %key, backend = self.store.backend()))]
    pub async fn release(&self, key: &str, token: &OwnershipToken) -> LockResult<bool> {
        validate_key(key)?;
        let released = self.store.conditional_release(key, token).await?;
        if !released {
            info!(%token, "lock not released: not held by this token");
        }
        Ok(released)
    }

    /// Resets the lock's time-to-live if `token` still owns it.
    ///
    /// `ttl` falls back to the default expire time.
    #[instrument(skip(self, token), fields(lock.key = %key, backend = self.store.backend()))]
    pub async fn extend(
        &self,
        key: &str,
        token: &OwnershipToken,
        ttl: Option<Duration>,
    ) -> LockResult<bool> {
        validate_key(key)?;
        let ttl = ttl.unwrap_or(self.defaults.expire_time);
        validate_expire_time(ttl)?;

        let extended = self.store.conditional_extend(key, token, ttl).await?;
        if !extended {
            info!(%token, "lock not extended: not held by this token");
        }
        Ok(extended)
    }
}

fn validate_key(key: &str) -> LockResult<()> {
    if key.is_empty() {
        return Err(LockError::InvalidKey("lock key cannot be empty".to_string()));
    }
    Ok(())
}

fn validate_expire_time(expire_time: Duration) -> LockResult<()> {
    if expire_time.is_zero() {
        return Err(LockError::InvalidConfig(
            "expire time must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_policy(policy: &RetryPolicy) -> LockResult<()> {
    validate_expire_time(policy.expire_time)?;
    if policy.is_unbounded() && policy.retry_interval.is_zero() {
        return Err(LockError::InvalidConfig(
            "unbounded retries require a non-zero retry interval".to_string(),
        ));
    }
    Ok(())
}

/// Sleeps for `interval` unless `cancel` flips to `true` first.
async fn sleep_or_cancel(interval: Duration, cancel: &mut watch::Receiver<bool>) -> LockResult<()> {
    tokio::select! {
        _ = tokio::time::sleep(interval) => Ok(()),
        _ = cancelled(cancel) => Err(LockError::Cancelled),
    }
}

async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            // Sender dropped without cancelling.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLockStore;

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let client = LockClient::new(MemoryLockStore::new());
        let result = client.acquire("", None, None).await;
        assert!(matches!(result, Err(LockError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_rejected() {
        let client = LockClient::new(MemoryLockStore::new());
        let result = client.acquire("k", None, Some(Duration::ZERO)).await;
        assert!(matches!(result, Err(LockError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_rejects_busy_unbounded_loop() {
        let result = LockClient::builder(MemoryLockStore::new())
            .retry_count(0)
            .retry_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(LockError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_overrides_defaults() {
        let client = LockClient::builder(MemoryLockStore::new())
            .expire_time(Duration::from_secs(5))
            .retry_count(3)
            .retry_interval(Duration::from_millis(20))
            .build()
            .unwrap();

        assert_eq!(
            *client.defaults(),
            RetryPolicy::new(Duration::from_secs(5), 3, Duration::from_millis(20))
        );
    }

    #[tokio::test]
    async fn test_acquire_uses_supplied_token() {
        let client = LockClient::new(MemoryLockStore::new());
        let token = client
            .acquire("k", Some(OwnershipToken::new("mine")), None)
            .await
            .unwrap();
        assert_eq!(token, Some(OwnershipToken::new("mine")));
        assert_eq!(client.store().holder("k"), Some(OwnershipToken::new("mine")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_attempt() {
        let client = LockClient::new(MemoryLockStore::new());
        let (_tx, rx) = watch::channel(true);

        let result = client
            .acquire_and_retry_cancellable("k", AcquireOptions::new(), rx)
            .await;

        assert!(matches!(result, Err(LockError::Cancelled)));
        assert_eq!(client.store().holder("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_cancel_sender_does_not_cancel() {
        let client = LockClient::new(MemoryLockStore::new());
        let holder = client.acquire("k", None, Some(Duration::from_millis(500))).await.unwrap();
        assert!(holder.is_some());

        let (tx, rx) = watch::channel(false);
        drop(tx);

        let options = AcquireOptions::new()
            .retry_count(0)
            .retry_interval(Duration::from_millis(100));
        let token = client
            .acquire_and_retry_cancellable("k", options, rx)
            .await
            .unwrap();
        assert!(token.is_some());
    }
}
