//! In-process lock store.
//!
//! Useful for tests and for deployments where every contender lives in one
//! process. Deadlines use the tokio clock, so `tokio::time::pause` drives
//! expiry deterministically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{LockError, LockResult};
use crate::token::OwnershipToken;
use crate::traits::LockStore;

#[derive(Debug, Clone)]
struct Record {
    token: OwnershipToken,
    deadline: Instant,
}

impl Record {
    fn is_live(&self, now: Instant) -> bool {
        now < self.deadline
    }
}

/// A [`LockStore`] backed by a mutex-guarded map.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryLockStore {
    records: Arc<Mutex<HashMap<String, Record>>>,
}

impl MemoryLockStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the token currently holding `key`, if the record is live.
    pub fn holder(&self, key: &str) -> Option<OwnershipToken> {
        let now = Instant::now();
        self.records()
            .get(key)
            .filter(|record| record.is_live(now))
            .map(|record| record.token.clone())
    }

    /// Returns the remaining time-to-live of `key`, if the record is live.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.records()
            .get(key)
            .filter(|record| record.is_live(now))
            .map(|record| record.deadline - now)
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deadline(ttl: Duration) -> LockResult<Instant> {
        Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| LockError::InvalidConfig(format!("expire time {ttl:?} overflows")))
    }
}

impl LockStore for MemoryLockStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn conditional_acquire(
        &self,
        key: &str,
        token: &OwnershipToken,
        ttl: Duration,
    ) -> LockResult<bool> {
        let deadline = Self::deadline(ttl)?;
        let now = Instant::now();
        let mut records = self.records();

        if records.get(key).is_some_and(|record| record.is_live(now)) {
            return Ok(false);
        }

        records.insert(
            key.to_string(),
            Record {
                token: token.clone(),
                deadline,
            },
        );
        Ok(true)
    }

    async fn conditional_release(&self, key: &str, token: &OwnershipToken) -> LockResult<bool> {
        let now = Instant::now();
        let mut records = self.records();

        match records.get(key) {
            Some(record) if record.is_live(now) && record.token == *token => {
                records.remove(key);
                Ok(true)
            }
            Some(record) if !record.is_live(now) => {
                records.remove(key);
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    async fn conditional_extend(
        &self,
        key: &str,
        token: &OwnershipToken,
        ttl: Duration,
    ) -> LockResult<bool> {
        let deadline = Self::deadline(ttl)?;
        let now = Instant::now();
        let mut records = self.records();

        match records.get_mut(key) {
            Some(record) if record.is_live(now) && record.token == *token => {
                record.deadline = deadline;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
