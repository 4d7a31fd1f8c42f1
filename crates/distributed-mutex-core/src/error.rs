//! Error types for distributed mutex operations.
//!
//! Contention, retry exhaustion and release mismatch are ordinary outcomes
//! (`Ok(None)` / `Ok(false)`), so they have no variant here.

use thiserror::Error;

use crate::token::OwnershipToken;

/// Errors that can occur during lock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// A waiting acquire loop was cancelled.
    #[error("lock operation was cancelled")]
    Cancelled,

    /// The shared store could not be reached.
    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The store was reached but rejected or failed the command.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid lock key.
    #[error("invalid lock key: {0}")]
    InvalidKey(String),

    /// Invalid expiry or retry configuration.
    #[error("invalid lock configuration: {0}")]
    InvalidConfig(String),

    /// An outermost exit failed to release its record at the store.
    ///
    /// The record stays until its TTL runs out unless the caller retries
    /// [`LockClient::release`](crate::client::LockClient::release) with `token`.
    #[error("failed to release lock held by {token}: {source}")]
    ReleaseFailed {
        token: OwnershipToken,
        #[source]
        source: Box<LockError>,
    },
}

impl LockError {
    /// Wraps a message as a [`LockError::Backend`] error.
    pub fn backend(message: impl Into<String>) -> Self {
        LockError::Backend(Box::new(std::io::Error::other(message.into())))
    }

    /// Wraps a message as a [`LockError::Connection`] error.
    pub fn connection(message: impl Into<String>) -> Self {
        LockError::Connection(Box::new(std::io::Error::other(message.into())))
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
