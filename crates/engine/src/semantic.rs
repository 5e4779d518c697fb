//! Embedding-backed free-text queries over the transaction history.
//!
//! One vector per user lives in the index, embedding the whole-history
//! markdown summary. Queries embed the question, search filtered to the
//! user, and cache the best match under the query-scoped key.

use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::EngineError;
use crate::cache::{Cache, TTL_QUERY_RESULT, query_result_key};
use crate::insights::{InsightsService, TransactionSource};

#[derive(Clone, Debug, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: BTreeMap<String, String>,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn fetch(&self, ids: &[String]) -> Result<Vec<VectorRecord>, EngineError>;
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), EngineError>;
    /// Similarity search restricted to vectors whose id matches `user_id`.
    async fn query(
        &self,
        vector: &[f32],
        top_k: u32,
        user_id: &str,
    ) -> Result<Vec<VectorMatch>, EngineError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryAnswer {
    pub summary: String,
    /// Absent when the answer came from the cache.
    pub score: Option<f32>,
}

pub struct SemanticQueryService<S, C, E, V> {
    insights: InsightsService<S, C>,
    cache: C,
    embedder: E,
    vectors: V,
}

impl<S, C, E, V> SemanticQueryService<S, C, E, V>
where
    S: TransactionSource,
    C: Cache + Clone,
    E: Embedder,
    V: VectorStore,
{
    pub fn new(insights: InsightsService<S, C>, cache: C, embedder: E, vectors: V) -> Self {
        Self {
            insights,
            cache,
            embedder,
            vectors,
        }
    }

    pub async fn query(
        &self,
        user_id: Uuid,
        mx_user_guid: &str,
        query: &str,
    ) -> Result<QueryAnswer, EngineError> {
        let cache_key = query_result_key(user_id, query);
        if let Some(summary) = self.cache.get(&cache_key).await? {
            return Ok(QueryAnswer {
                summary,
                score: None,
            });
        }
        tracing::debug!("no cached query result for user {user_id}");

        let markdown = self
            .insights
            .summary_markdown_cached(user_id, mx_user_guid)
            .await?;

        // One vector per user; skip the upsert when it is already there.
        let id = user_id.to_string();
        let existing = self.vectors.fetch(std::slice::from_ref(&id)).await?;
        if existing.is_empty() {
            let values = self.embedder.embed(&markdown).await?;
            let mut metadata = BTreeMap::new();
            metadata.insert("summary".to_string(), markdown.clone());
            self.vectors
                .upsert(vec![VectorRecord {
                    id: id.clone(),
                    values,
                    metadata,
                }])
                .await?;
            tracing::debug!("upserted summary vector for user {user_id}");
        }

        let query_vector = self.embedder.embed(query).await?;
        let matches = self.vectors.query(&query_vector, 1, &id).await?;
        let Some(best) = matches.into_iter().next() else {
            return Err(EngineError::KeyNotFound(
                "matching transactions".to_string(),
            ));
        };

        let summary = best.metadata.get("summary").cloned().unwrap_or_default();
        self.cache
            .set(&cache_key, &summary, Some(TTL_QUERY_RESULT))
            .await?;

        Ok(QueryAnswer {
            summary,
            score: Some(best.score),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::insights::tests::FakeSource;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct FakeEmbedder {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0, 2.0])
        }
    }

    #[derive(Clone, Default)]
    struct FakeVectorStore {
        records: Arc<Mutex<Vec<VectorRecord>>>,
        upserts: Arc<AtomicU32>,
        empty_results: bool,
    }

    #[async_trait]
    impl VectorStore for FakeVectorStore {
        async fn fetch(&self, ids: &[String]) -> Result<Vec<VectorRecord>, EngineError> {
            let records = self.records.lock().await;
            Ok(records
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .collect())
        }

        async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), EngineError> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            self.records.lock().await.extend(records);
            Ok(())
        }

        async fn query(
            &self,
            _vector: &[f32],
            top_k: u32,
            user_id: &str,
        ) -> Result<Vec<VectorMatch>, EngineError> {
            if self.empty_results {
                return Ok(Vec::new());
            }
            let records = self.records.lock().await;
            Ok(records
                .iter()
                .filter(|r| r.id == user_id)
                .take(top_k as usize)
                .map(|r| VectorMatch {
                    id: r.id.clone(),
                    score: 0.87,
                    metadata: r.metadata.clone(),
                })
                .collect())
        }
    }

    fn service(
        source_count: usize,
        vectors: FakeVectorStore,
    ) -> (
        SemanticQueryService<FakeSource, MemoryCache, FakeEmbedder, FakeVectorStore>,
        Arc<AtomicU32>,
    ) {
        let cache = MemoryCache::new();
        let embedder = FakeEmbedder::default();
        let embed_calls = embedder.calls.clone();
        let insights = InsightsService::new(FakeSource::with_count(source_count), cache.clone());
        (
            SemanticQueryService::new(insights, cache, embedder, vectors),
            embed_calls,
        )
    }

    #[tokio::test]
    async fn answers_carry_summary_and_score() {
        let (service, _) = service(3, FakeVectorStore::default());
        let answer = service
            .query(Uuid::new_v4(), "USR-1", "how much on groceries")
            .await
            .unwrap();
        assert!(answer.summary.contains("# Financial Summary"));
        assert_eq!(answer.score, Some(0.87));
    }

    #[tokio::test]
    async fn upsert_happens_once_per_user() {
        let vectors = FakeVectorStore::default();
        let upserts = vectors.upserts.clone();
        let (service, _) = service(3, vectors);
        let user = Uuid::new_v4();

        service.query(user, "USR-1", "groceries").await.unwrap();
        service.query(user, "USR-1", "rent").await.unwrap();
        assert_eq!(upserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_query_is_served_from_cache() {
        let (service, embed_calls) = service(3, FakeVectorStore::default());
        let user = Uuid::new_v4();

        let first = service.query(user, "USR-1", "groceries").await.unwrap();
        let calls_after_first = embed_calls.load(Ordering::SeqCst);

        let second = service.query(user, "USR-1", "groceries").await.unwrap();
        assert_eq!(second.summary, first.summary);
        assert_eq!(second.score, None);
        assert_eq!(embed_calls.load(Ordering::SeqCst), calls_after_first);
    }

    #[tokio::test]
    async fn no_match_is_a_typed_failure() {
        let vectors = FakeVectorStore {
            empty_results: true,
            ..Default::default()
        };
        let (service, _) = service(3, vectors);
        let err = service
            .query(Uuid::new_v4(), "USR-1", "groceries")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::KeyNotFound("matching transactions".to_string())
        );
    }
}
