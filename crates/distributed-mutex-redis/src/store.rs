//! Redis lock store implementation.

use std::time::Duration;

use distributed_mutex_core::error::{LockError, LockResult};
use distributed_mutex_core::token::OwnershipToken;
use distributed_mutex_core::traits::LockStore;
use fred::error::RedisErrorKind;
use fred::prelude::*;
use fred::types::CustomCommand;
use tracing::{instrument, trace};

use crate::provider::RedisLockStoreBuilder;

/// Default namespace prepended to every lock key.
pub const DEFAULT_KEY_PREFIX: &str = "distributed-lock:";

/// Lua script to release the lock.
const RELEASE_SCRIPT_LUA: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('del', KEYS[1])
    end
    return 0
"#;

/// Lua script to reset the lock's TTL.
const EXTEND_SCRIPT_LUA: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('pexpire', KEYS[1], ARGV[2])
    end
    return 0
"#;

/// A [`LockStore`] backed by a single Redis server.
///
/// - acquire: `SET key token NX PX ttl`
/// - release: compare-and-`DEL` script
/// - extend: compare-and-`PEXPIRE` script
///
/// Redis runs each command and script atomically, so no other client can
/// observe a half-done acquire or release.
#[derive(Clone)]
pub struct RedisLockStore {
    client: RedisClient,
    key_prefix: String,
}

impl RedisLockStore {
    /// Returns a new builder for configuring the store.
    pub fn builder() -> RedisLockStoreBuilder {
        RedisLockStoreBuilder::new()
    }

    /// Connects to the Redis server at `url` with the default key prefix.
    pub async fn new(url: impl Into<String>) -> LockResult<Self> {
        Self::builder().url(url).build().await
    }

    /// Wraps an already connected client.
    pub fn from_client(client: RedisClient, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    /// Returns the underlying Redis client.
    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    /// Returns the namespace prepended to lock keys.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Returns the Redis key used for lock `key`.
    pub fn redis_key(&self, key: &str) -> String {
        prefixed_key(&self.key_prefix, key)
    }

    /// Runs a Lua script with `EVAL`, returning its integer reply.
    async fn eval_script(&self, operation: &str, args: Vec<RedisValue>) -> LockResult<i64> {
        let cmd = CustomCommand::new_static("EVAL", None, false);
        self.client
            .custom(cmd, args)
            .await
            .map_err(|e| map_redis_error(operation, e))
    }
}

impl LockStore for RedisLockStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    #[instrument(skip(self, token), fields(redis.key = %self.redis_key(key)))]
    async fn conditional_acquire(
        &self,
        key: &str,
        token: &OwnershipToken,
        ttl: Duration,
    ) -> LockResult<bool> {
        let redis_key = self.redis_key(key);
        let expiry_millis = ttl_millis(ttl)?;

        // SET NX returns Some("OK") if the key was set, None if it already exists
        let result: Option<String> = self
            .client
            .set(
                &redis_key,
                token.as_str(),
                Some(Expiration::PX(expiry_millis)),
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(|e| map_redis_error("SET NX", e))?;

        trace!(acquired = result.is_some(), "SET NX PX");
        Ok(result.is_some())
    }

    #[instrument(skip(self, token), fields(redis.key = %self.redis_key(key)))]
    async fn conditional_release(&self, key: &str, token: &OwnershipToken) -> LockResult<bool> {
        let args: Vec<RedisValue> = vec![
            RELEASE_SCRIPT_LUA.into(),
            1_i64.into(), // numkeys
            self.redis_key(key).into(),
            token.as_str().into(),
        ];

        let deleted = self.eval_script("EVAL (release)", args).await?;
        Ok(deleted == 1)
    }

    #[instrument(skip(self, token), fields(redis.key = %self.redis_key(key)))]
    async fn conditional_extend(
        &self,
        key: &str,
        token: &OwnershipToken,
        ttl: Duration,
    ) -> LockResult<bool> {
        let args: Vec<RedisValue> = vec![
            EXTEND_SCRIPT_LUA.into(),
            1_i64.into(), // numkeys
            self.redis_key(key).into(),
            token.as_str().into(),
            ttl_millis(ttl)?.into(),
        ];

        let extended = self.eval_script("EVAL (extend)", args).await?;
        Ok(extended == 1)
    }
}

pub(crate) fn prefixed_key(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}

fn ttl_millis(ttl: Duration) -> LockResult<i64> {
    match i64::try_from(ttl.as_millis()) {
        Ok(millis) if millis > 0 => Ok(millis),
        _ => Err(LockError::InvalidConfig(format!(
            "expire time {ttl:?} is not a positive millisecond count"
        ))),
    }
}

/// Maps a fred error onto the lock error taxonomy.
///
/// Anything that means "could not talk to Redis" becomes a connection error;
/// everything else is a backend error.
pub(crate) fn map_redis_error(operation: &str, e: RedisError) -> LockError {
    let message = format!("Redis {operation} failed: {e}");
    match e.kind() {
        RedisErrorKind::IO | RedisErrorKind::Timeout | RedisErrorKind::Canceled => {
            LockError::connection(message)
        }
        _ => LockError::backend(message),
    }
}
