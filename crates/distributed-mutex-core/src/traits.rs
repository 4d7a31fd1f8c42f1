//! Core traits for distributed mutexes.

use std::future::Future;
use std::time::Duration;

use crate::error::LockResult;
use crate::token::OwnershipToken;

// ============================================================================
// Store Trait
// ============================================================================

/// Atomic compound operations against the shared key-value store.
///
/// The store is the single source of truth for "is this key locked, and by
/// which token". Every method must execute as one indivisible unit on the
/// store side (a `SET NX`, a server-side script, a transaction), never as a
/// client-side read followed by a write.
///
/// Implementations report contention and ownership mismatches as `Ok(false)`.
/// `Err` is reserved for transport or backend failures and must never be
/// returned to mean "not held".
///
/// # Example
///
/// ```rust,ignore
/// let token = OwnershipToken::generate();
/// if store.conditional_acquire("orders:42", &token, Duration::from_secs(30)).await? {
///     // Critical section
///     store.conditional_release("orders:42", &token).await?;
/// }
/// ```
pub trait LockStore: Send + Sync {
    /// Short backend name used in tracing fields.
    fn backend(&self) -> &'static str;

    /// Creates the record `key -> token` with time-to-live `ttl` if no live
    /// record exists for `key`.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Record created, the caller now holds the lock
    /// * `Ok(false)` - A live record already exists
    /// * `Err(...)` - The store could not be reached or failed the command
    fn conditional_acquire(
        &self,
        key: &str,
        token: &OwnershipToken,
        ttl: Duration,
    ) -> impl Future<Output = LockResult<bool>> + Send;

    /// Deletes the record for `key` if it currently stores `token`.
    ///
    /// Returns `Ok(false)` when the record is absent, expired, or owned by a
    /// different token.
    fn conditional_release(
        &self,
        key: &str,
        token: &OwnershipToken,
    ) -> impl Future<Output = LockResult<bool>> + Send;

    /// Resets the time-to-live of the record for `key` to `ttl` if it
    /// currently stores `token`. Never creates a record.
    fn conditional_extend(
        &self,
        key: &str,
        token: &OwnershipToken,
        ttl: Duration,
    ) -> impl Future<Output = LockResult<bool>> + Send;
}
