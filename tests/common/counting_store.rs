//! Store wrappers for observing and breaking the lock protocol in tests.

use distributed_mutex_core::error::{LockError, LockResult};
use distributed_mutex_core::memory::MemoryLockStore;
use distributed_mutex_core::token::OwnershipToken;
use distributed_mutex_core::traits::LockStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Memory store that records every call made through it.
#[derive(Clone, Default)]
pub struct CountingStore {
    inner: MemoryLockStore,
    acquire_attempts: Arc<Mutex<Vec<Instant>>>,
    releases: Arc<AtomicUsize>,
    extends: Arc<AtomicUsize>,
    failing_releases: Arc<AtomicBool>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares the record map of `inner` so other clients contend with us.
    pub fn wrapping(inner: MemoryLockStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &MemoryLockStore {
        &self.inner
    }

    pub fn acquire_calls(&self) -> usize {
        self.acquire_attempts.lock().unwrap().len()
    }

    /// Instants at which acquire attempts reached the store.
    pub fn acquire_instants(&self) -> Vec<Instant> {
        self.acquire_attempts.lock().unwrap().clone()
    }

    pub fn release_calls(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn extend_calls(&self) -> usize {
        self.extends.load(Ordering::SeqCst)
    }

    /// Makes every following release fail as if the connection dropped.
    pub fn fail_releases(&self, fail: bool) {
        self.failing_releases.store(fail, Ordering::SeqCst);
    }
}

impl LockStore for CountingStore {
    fn backend(&self) -> &'static str {
        "counting"
    }

    async fn conditional_acquire(
        &self,
        key: &str,
        token: &OwnershipToken,
        ttl: Duration,
    ) -> LockResult<bool> {
        self.acquire_attempts.lock().unwrap().push(Instant::now());
        self.inner.conditional_acquire(key, token, ttl).await
    }

    async fn conditional_release(&self, key: &str, token: &OwnershipToken) -> LockResult<bool> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        if self.failing_releases.load(Ordering::SeqCst) {
            return Err(LockError::connection("connection reset"));
        }
        self.inner.conditional_release(key, token).await
    }

    async fn conditional_extend(
        &self,
        key: &str,
        token: &OwnershipToken,
        ttl: Duration,
    ) -> LockResult<bool> {
        self.extends.fetch_add(1, Ordering::SeqCst);
        self.inner.conditional_extend(key, token, ttl).await
    }
}

/// Store whose every call fails as if Redis were unreachable.
#[derive(Clone, Default)]
pub struct UnreachableStore;

impl LockStore for UnreachableStore {
    fn backend(&self) -> &'static str {
        "unreachable"
    }

    async fn conditional_acquire(
        &self,
        _key: &str,
        _token: &OwnershipToken,
        _ttl: Duration,
    ) -> LockResult<bool> {
        Err(LockError::connection("connection refused"))
    }

    async fn conditional_release(&self, _key: &str, _token: &OwnershipToken) -> LockResult<bool> {
        Err(LockError::connection("connection refused"))
    }

    async fn conditional_extend(
        &self,
        _key: &str,
        _token: &OwnershipToken,
        _ttl: Duration,
    ) -> LockResult<bool> {
        Err(LockError::connection("connection refused"))
    }
}
