//! Cache-aside store for derived summaries.
//!
//! Entries are monotonically replaceable: a recomputation always
//! overwrites. There is no invalidation hook on transaction ingestion,
//! so a freshly synced account can serve a summary up to a day old.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::EngineError;

/// Whole-history summary lifetime.
pub const TTL_ALL_TRANSACTIONS: Duration = Duration::from_secs(60 * 60 * 24);
/// Query-scoped summary lifetime.
pub const TTL_QUERY_RESULT: Duration = Duration::from_secs(60 * 15);
/// Suggested-questions lifetime.
pub const TTL_SUGGESTED_QUESTIONS: Duration = Duration::from_secs(60 * 60);

pub fn all_transactions_key(user_id: Uuid) -> String {
    format!("transactions:{user_id}")
}

pub fn query_result_key(user_id: Uuid, query: &str) -> String {
    format!("transactions_query:{user_id}:{query}")
}

pub fn suggestions_key(conversation_id: Uuid) -> String {
    format!("conversation:{conversation_id}:questions")
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>)
    -> Result<(), EngineError>;
    async fn del(&self, key: &str) -> Result<(), EngineError>;
    async fn exists(&self, key: &str) -> Result<bool, EngineError>;
}

#[async_trait]
impl<T: Cache + ?Sized> Cache for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        (**self).get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), EngineError> {
        (**self).set(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<(), EngineError> {
        (**self).del(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, EngineError> {
        (**self).exists(key).await
    }
}

/// In-process cache. Used by tests and as a fallback when no Redis is
/// configured.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, MemoryEntry>>>,
}

#[derive(Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at.is_none_or(|at| at > now) => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
            }
        }

        // Expired: drop it lazily.
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), EngineError> {
        let entry = MemoryEntry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), EngineError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, EngineError> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Redis-backed cache shared by every server task.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), EngineError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), EngineError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, EngineError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip() {
        let cache = MemoryCache::new();
        cache.set("k", "v", None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(cache.exists("k").await.unwrap());

        cache.del("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v", Some(Duration::from_secs(900)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(899)).await;
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(!cache.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn set_overwrites() {
        let cache = MemoryCache::new();
        cache.set("k", "old", None).await.unwrap();
        cache.set("k", "new", None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn keys_are_scoped_per_user_and_query() {
        let user = Uuid::new_v4();
        assert_eq!(
            all_transactions_key(user),
            format!("transactions:{user}")
        );
        assert_eq!(
            query_result_key(user, "rent in march"),
            format!("transactions_query:{user}:rent in march")
        );
        assert_ne!(
            query_result_key(user, "rent"),
            query_result_key(user, "groceries")
        );
    }
}
