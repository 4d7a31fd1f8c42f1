//! Tests that every store honors the same atomic-operation contract.

use distributed_mutex_core::memory::MemoryLockStore;
use distributed_mutex_core::token::OwnershipToken;
use distributed_mutex_core::traits::LockStore;
use distributed_mutex_redis::RedisLockStore;
use std::time::Duration;

mod common;
use common::counting_store::CountingStore;

const TTL: Duration = Duration::from_secs(30);

/// Tests that any store can be used with the same code.
async fn check_store_contract<S: LockStore>(store: &S, key: &str) {
    let a = OwnershipToken::generate();
    let b = OwnershipToken::generate();

    // Acquire is exclusive
    assert!(store.conditional_acquire(key, &a, TTL).await.unwrap());
    assert!(!store.conditional_acquire(key, &b, TTL).await.unwrap());

    // Only the owner can extend or release
    assert!(!store.conditional_extend(key, &b, TTL).await.unwrap());
    assert!(store.conditional_extend(key, &a, TTL).await.unwrap());
    assert!(!store.conditional_release(key, &b).await.unwrap());
    assert!(store.conditional_release(key, &a).await.unwrap());

    // Released records are gone for everyone
    assert!(!store.conditional_release(key, &a).await.unwrap());
    assert!(!store.conditional_extend(key, &a, TTL).await.unwrap());

    // Now anyone can acquire again
    assert!(store.conditional_acquire(key, &b, TTL).await.unwrap());
    assert!(store.conditional_release(key, &b).await.unwrap());
}

/// Tests that a short-lived record disappears on its own.
async fn check_store_expiry<S: LockStore>(store: &S, key: &str) {
    let a = OwnershipToken::generate();
    let b = OwnershipToken::generate();
    let ttl = Duration::from_millis(100);

    assert!(store.conditional_acquire(key, &a, ttl).await.unwrap());
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(!store.conditional_release(key, &a).await.unwrap());
    assert!(store.conditional_acquire(key, &b, ttl).await.unwrap());
    assert!(store.conditional_release(key, &b).await.unwrap());
}

#[tokio::test]
async fn test_memory_store_contract() {
    check_store_contract(&MemoryLockStore::new(), "contract").await;
}

#[tokio::test]
async fn test_counting_store_contract() {
    let store = CountingStore::new();
    check_store_contract(&store, "contract").await;
    assert_eq!(store.acquire_calls(), 3);
    assert_eq!(store.release_calls(), 4);
    assert_eq!(store.extend_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_memory_store_expiry() {
    check_store_expiry(&MemoryLockStore::new(), "expiry").await;
}

fn get_redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

#[tokio::test]
#[ignore] // Requires Redis server running
async fn test_redis_store_contract() {
    let store = RedisLockStore::new(get_redis_url()).await.unwrap();
    check_store_contract(&store, "test-contract").await;
}

#[tokio::test]
#[ignore] // Requires Redis server running
async fn test_redis_store_expiry() {
    let store = RedisLockStore::new(get_redis_url()).await.unwrap();
    check_store_expiry(&store, "test-expiry").await;
}
