//! Time-boxed memoization for on-demand queries.
//!
//! Entries are checked on read and replaced wholesale on expiry. There is no
//! size bound or background sweep: callers use a handful of fixed keys. The
//! lock is not held while a producer runs, so concurrent misses on one key
//! may each run the producer.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

type Payload = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
struct CacheEntry {
    payload: Payload,
    created: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created) < self.ttl
    }
}

#[derive(Default)]
pub struct RuntimeCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl RuntimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the payload cached under `key` while it is younger than its
    /// ttl; otherwise run `producer`, store its result under `key` with
    /// `ttl`, and return it. A cached payload of another type counts as a miss.
    pub async fn get_or_populate<T, F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(hit) = self.lookup::<T>(key).await {
            debug!(key, "runtime cache hit");
            return hit;
        }

        debug!(key, "runtime cache miss");
        let value = producer().await;
        let entry = CacheEntry {
            payload: Arc::new(value.clone()),
            created: Instant::now(),
            ttl,
        };
        self.entries.lock().await.insert(key.to_string(), entry);
        value
    }

    async fn lookup<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = self.entries.lock().await;
        let entry = entries.get(key)?;
        if !entry.is_fresh(Instant::now()) {
            return None;
        }
        entry.payload.downcast_ref::<T>().cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
