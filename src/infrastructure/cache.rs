use lru::LruCache;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;

use crate::core::UserId;

pub struct Cache<K, V> {
    inner: LruCache<K, V>,
}

impl<K: std::hash::Hash + Eq, V> Cache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Cache {
            inner: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.inner.put(key, value);
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.pop(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Session token -> user lookups in front of the sessions table
pub struct SessionCache {
    inner: Mutex<Cache<String, UserId>>,
}

impl SessionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Cache::new(capacity)),
        }
    }

    pub async fn get(&self, token: &str) -> Option<UserId> {
        self.inner.lock().await.get(&token.to_string()).copied()
    }

    pub async fn insert(&self, token: &str, user_id: UserId) {
        self.inner.lock().await.insert(token.to_string(), user_id);
    }

    pub async fn evict(&self, token: &str) {
        self.inner.lock().await.remove(&token.to_string());
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
