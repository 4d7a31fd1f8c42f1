//! Call-chain scoped re-entrancy tracking.
//!
//! A [`ReentrancyContext`] belongs to exactly one logical call chain (one task,
//! one request). It remembers which keys the chain holds, under which token,
//! and how deeply each one has been entered. Only the outermost enter talks
//! to the store to acquire, and only the outermost exit talks to it to
//! release. The context is a cache over store state; the store stays the
//! authority on who holds a key.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::client::LockClient;
use crate::error::{LockError, LockResult};
use crate::policy::AcquireOptions;
use crate::token::OwnershipToken;
use crate::traits::LockStore;

/// Result of [`ReentrancyContext::enter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnterOutcome {
    /// The outermost enter acquired the key in the store under this token.
    FirstAcquire(OwnershipToken),
    /// The chain already held the key; nesting depth is now `depth`.
    Reentrant { depth: u32 },
    /// The retry budget ran out without acquiring the key.
    NotAcquired,
}

impl EnterOutcome {
    /// Returns `true` if the chain holds the key after this enter.
    pub fn is_held(&self) -> bool {
        !matches!(self, EnterOutcome::NotAcquired)
    }
}

/// Result of [`ReentrancyContext::exit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// An inner exit; the key stays held at `depth`.
    Nested { depth: u32 },
    /// The outermost exit released the store record.
    Released,
    /// The outermost exit found the record gone or owned by another token.
    ReleaseMismatch,
    /// The chain did not hold the key.
    NotHeld,
}

#[derive(Debug, Clone)]
struct HeldEntry {
    token: OwnershipToken,
    depth: u32,
}

/// Per call chain `{key -> (token, depth)}` map.
///
/// Mutating methods take `&mut self`, so a context cannot be shared between
/// concurrently running call chains. Create one per task or request and pass
/// it down the call chain.
///
/// # Example
///
/// ```rust,ignore
/// let mut ctx = ReentrancyContext::new();
///
/// ctx.enter(&client, "account:7", AcquireOptions::new()).await?; // store acquire
/// ctx.enter(&client, "account:7", AcquireOptions::new()).await?; // depth 2, no store call
/// ctx.exit(&client, "account:7").await?;                         // depth 1, no store call
/// ctx.exit(&client, "account:7").await?;                         // store release
/// ```
#[derive(Debug, Default)]
pub struct ReentrancyContext {
    held: HashMap<String, HeldEntry>,
}

impl ReentrancyContext {
    /// Creates a context that holds nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters `key`, acquiring it in the store only if this chain does not
    /// already hold it.
    pub async fn enter<S: LockStore>(
        &mut self,
        client: &LockClient<S>,
        key: &str,
        options: AcquireOptions,
    ) -> LockResult<EnterOutcome> {
        let (_cancel_sender, cancel_receiver) = watch::channel(false);
        self.enter_cancellable(client, key, options, cancel_receiver)
            .await
    }

    /// Like [`enter`](Self::enter), with a cancel signal for the acquire loop.
    ///
    /// A re-entrant enter never waits, so `cancel` only matters for the
    /// outermost one.
    #[instrument(skip(self, client, options, cancel), fields(lock.key = %key))]
    pub async fn enter_cancellable<S: LockStore>(
        &mut self,
        client: &LockClient<S>,
        key: &str,
        options: AcquireOptions,
        cancel: watch::Receiver<bool>,
    ) -> LockResult<EnterOutcome> {
        if let Some(entry) = self.held.get_mut(key) {
            entry.depth += 1;
            debug!(depth = entry.depth, "re-entered held lock");
            return Ok(EnterOutcome::Reentrant { depth: entry.depth });
        }

        match client
            .acquire_and_retry_cancellable(key, options, cancel)
            .await?
        {
            Some(token) => {
                info!(%token, "lock acquired");
                self.held.insert(
                    key.to_string(),
                    HeldEntry {
                        token: token.clone(),
                        depth: 1,
                    },
                );
                Ok(EnterOutcome::FirstAcquire(token))
            }
            None => {
                info!("lock not acquired: retry budget exhausted");
                Ok(EnterOutcome::NotAcquired)
            }
        }
    }

    /// Exits `key`, releasing it in the store only when the outermost enter
    /// is matched.
    ///
    /// The entry is forgotten at depth zero even if the release fails, so
    /// the context never claims a key it has handed back. A store failure is
    /// returned as [`LockError::ReleaseFailed`] carrying the token, so the
    /// caller can retry the release itself.
    #[instrument(skip(self, client), fields(lock.key = %key))]
    pub async fn exit<S: LockStore>(
        &mut self,
        client: &LockClient<S>,
        key: &str,
    ) -> LockResult<ExitOutcome> {
        match self.held.get_mut(key) {
            None => return Ok(ExitOutcome::NotHeld),
            Some(entry) if entry.depth > 1 => {
                entry.depth -= 1;
                debug!(depth = entry.depth, "left nested lock scope");
                return Ok(ExitOutcome::Nested { depth: entry.depth });
            }
            Some(_) => {}
        }

        let Some(entry) = self.held.remove(key) else {
            return Ok(ExitOutcome::NotHeld);
        };

        match client.release(key, &entry.token).await {
            Ok(true) => {
                info!(token = %entry.token, "lock released");
                Ok(ExitOutcome::Released)
            }
            Ok(false) => Ok(ExitOutcome::ReleaseMismatch),
            Err(source) => {
                warn!(token = %entry.token, error = %source, "lock release failed");
                Err(LockError::ReleaseFailed {
                    token: entry.token,
                    source: Box::new(source),
                })
            }
        }
    }

    /// Resets the store TTL of a held key. Returns `false` without touching
    /// the store if this chain does not hold `key`.
    pub async fn renew<S: LockStore>(
        &self,
        client: &LockClient<S>,
        key: &str,
        ttl: Option<Duration>,
    ) -> LockResult<bool> {
        match self.held.get(key) {
            Some(entry) => client.extend(key, &entry.token, ttl).await,
            None => Ok(false),
        }
    }

    /// Current nesting depth of `key`; zero when not held.
    pub fn depth(&self, key: &str) -> u32 {
        self.held.get(key).map_or(0, |entry| entry.depth)
    }

    /// Token under which `key` is held.
    pub fn token(&self, key: &str) -> Option<&OwnershipToken> {
        self.held.get(key).map(|entry| &entry.token)
    }

    /// Returns `true` if this chain holds `key` at any depth.
    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains_key(key)
    }

    /// Keys currently held by this chain.
    pub fn held_keys(&self) -> impl Iterator<Item = &str> {
        self.held.keys().map(String::as_str)
    }
}

impl Drop for ReentrancyContext {
    fn drop(&mut self) {
        // Can't release asynchronously here; the records expire on their own.
        if !self.held.is_empty() {
            warn!(
                held = self.held.len(),
                "reentrancy context dropped while holding locks"
            );
        }
    }
}
