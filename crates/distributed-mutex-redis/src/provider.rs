//! Redis lock store configuration.

use distributed_mutex_core::client::LockClient;
use distributed_mutex_core::error::{LockError, LockResult};
use fred::prelude::*;
use tracing::info;

use crate::store::{DEFAULT_KEY_PREFIX, RedisLockStore, map_redis_error};

/// A [`LockClient`] talking to Redis.
pub type RedisLockClient = LockClient<RedisLockStore>;

/// Builder for [`RedisLockStore`] configuration.
pub struct RedisLockStoreBuilder {
    url: Option<String>,
    client: Option<RedisClient>,
    key_prefix: String,
}

impl RedisLockStoreBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url: None,
            client: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    /// Sets the Redis server URL, e.g. `redis://localhost:6379`.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Uses an existing Redis client instead of connecting from a URL.
    ///
    /// The caller is responsible for connecting it.
    pub fn client(mut self, client: RedisClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the namespace prepended to every lock key.
    ///
    /// Pass an empty string to use lock keys verbatim.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Builds the store, connecting if a URL was given.
    pub async fn build(self) -> LockResult<RedisLockStore> {
        if let Some(client) = self.client {
            return Ok(RedisLockStore::from_client(client, self.key_prefix));
        }

        let url = self.url.ok_or_else(|| {
            LockError::InvalidConfig("no Redis client or URL provided".to_string())
        })?;

        let config = RedisConfig::from_url(&url)
            .map_err(|e| LockError::InvalidConfig(format!("invalid Redis URL: {e}")))?;

        let client = RedisClient::new(config, None, None, None);
        client.connect();
        client
            .wait_for_connect()
            .await
            .map_err(|e| map_redis_error("connect", e))?;
        info!(%url, "connected to Redis lock store");

        Ok(RedisLockStore::from_client(client, self.key_prefix))
    }

    /// Builds the store and wraps it in a [`LockClient`] with default policy.
    pub async fn build_client(self) -> LockResult<RedisLockClient> {
        Ok(LockClient::new(self.build().await?))
    }
}

impl Default for RedisLockStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_without_url_or_client_fails() {
        let result = RedisLockStoreBuilder::new().build().await;
        assert!(matches!(result, Err(LockError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_build_rejects_malformed_url() {
        let result = RedisLockStoreBuilder::new().url("not a url").build().await;
        assert!(matches!(result, Err(LockError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_existing_client_keeps_prefix() {
        let store = RedisLockStoreBuilder::new()
            .client(RedisClient::new(RedisConfig::default(), None, None, None))
            .key_prefix("app:")
            .build()
            .await
            .unwrap();
        assert_eq!(store.redis_key("orders"), "app:orders");
    }
}
