//! Full-history aggregation with cache-aside.
//!
//! The aggregator is paged: a count probe (page 1, size 1) learns the
//! total, then pages of [`PAGE_SIZE`] are fetched sequentially. A
//! failure on any page aborts the whole aggregation; there is no
//! partial-page retry.

use async_trait::async_trait;
use uuid::Uuid;

use crate::EngineError;
use crate::cache::{Cache, TTL_ALL_TRANSACTIONS, all_transactions_key};
use crate::markdown::render_summary;
use crate::summary::{BankTransaction, Summary, summarize};

pub const PAGE_SIZE: u32 = 1000;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Pagination {
    pub total_entries: u64,
    pub current_page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransactionPage {
    pub transactions: Vec<BankTransaction>,
    pub pagination: Pagination,
}

/// Paged transaction feed. Implemented by the aggregator client; tests
/// substitute in-memory fakes.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn list_transactions(
        &self,
        mx_user_guid: &str,
        page: u32,
        per_page: u32,
    ) -> Result<TransactionPage, EngineError>;
}

/// Fetches the complete history for an aggregator user.
pub async fn fetch_all_transactions<S>(
    source: &S,
    mx_user_guid: &str,
) -> Result<Vec<BankTransaction>, EngineError>
where
    S: TransactionSource + ?Sized,
{
    let probe = source.list_transactions(mx_user_guid, 1, 1).await?;
    let total_entries = probe.pagination.total_entries;
    let total_pages = total_entries.div_ceil(u64::from(PAGE_SIZE)) as u32;

    let mut all = Vec::with_capacity(total_entries as usize);
    for page in 1..=total_pages {
        let batch = source
            .list_transactions(mx_user_guid, page, PAGE_SIZE)
            .await?;
        all.extend(batch.transactions);
    }
    Ok(all)
}

/// Aggregation + cache-aside over the rendered markdown summary.
pub struct InsightsService<S, C> {
    source: S,
    cache: C,
}

impl<S, C> InsightsService<S, C>
where
    S: TransactionSource,
    C: Cache,
{
    pub fn new(source: S, cache: C) -> Self {
        Self { source, cache }
    }

    /// Fetches and reduces the full history, bypassing the cache.
    ///
    /// Used by session creation, which always wants fresh numbers.
    pub async fn summary(
        &self,
        mx_user_guid: &str,
    ) -> Result<(Vec<BankTransaction>, Summary), EngineError> {
        let transactions = fetch_all_transactions(&self.source, mx_user_guid).await?;
        if transactions.is_empty() {
            return Err(EngineError::KeyNotFound("transactions".to_string()));
        }
        let summary = summarize(&transactions);
        Ok((transactions, summary))
    }

    /// Whole-history markdown, served from cache inside the TTL window.
    pub async fn summary_markdown_cached(
        &self,
        user_id: Uuid,
        mx_user_guid: &str,
    ) -> Result<String, EngineError> {
        let key = all_transactions_key(user_id);
        if let Some(markdown) = self.cache.get(&key).await? {
            return Ok(markdown);
        }

        tracing::debug!("no cached summary for user {user_id}");
        let (_, summary) = self.summary(mx_user_guid).await?;
        let markdown = render_summary(&summary);
        self.cache
            .set(&key, &markdown, Some(TTL_ALL_TRANSACTIONS))
            .await?;
        Ok(markdown)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    pub(crate) fn feed_tx(i: usize) -> BankTransaction {
        BankTransaction {
            guid: format!("TRN-{i}"),
            transaction_id: format!("{i}"),
            account_guid: "ACT-1".to_string(),
            member_guid: "MBR-1".to_string(),
            user_guid: "USR-1".to_string(),
            date: "2025-03-14".parse().unwrap(),
            amount: 10.0,
            currency_code: "USD".to_string(),
            description: format!("Merchant {i}"),
            original_description: format!("MERCHANT {i}"),
            category: "Groceries".to_string(),
            top_level_category: "Food".to_string(),
            is_income: false,
            is_expense: true,
            status: "POSTED".to_string(),
            memo: None,
        }
    }

    pub(crate) struct FakeSource {
        transactions: Vec<BankTransaction>,
        pub calls: Arc<AtomicU32>,
        fail_on_page: Option<u32>,
    }

    impl FakeSource {
        pub(crate) fn with_count(count: usize) -> Self {
            Self {
                transactions: (0..count).map(feed_tx).collect(),
                calls: Arc::new(AtomicU32::new(0)),
                fail_on_page: None,
            }
        }

        fn failing_on(count: usize, page: u32) -> Self {
            let mut source = Self::with_count(count);
            source.fail_on_page = Some(page);
            source
        }
    }

    #[async_trait]
    impl TransactionSource for FakeSource {
        async fn list_transactions(
            &self,
            _mx_user_guid: &str,
            page: u32,
            per_page: u32,
        ) -> Result<TransactionPage, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_page == Some(page) && per_page > 1 {
                return Err(EngineError::Upstream(
                    "error fetching transactions from MX".to_string(),
                ));
            }

            let total_entries = self.transactions.len() as u64;
            let start = ((page - 1) * per_page) as usize;
            let end = (start + per_page as usize).min(self.transactions.len());
            let transactions = if start < self.transactions.len() {
                self.transactions[start..end].to_vec()
            } else {
                Vec::new()
            };

            Ok(TransactionPage {
                transactions,
                pagination: Pagination {
                    total_entries,
                    current_page: page,
                    per_page,
                    total_pages: total_entries.div_ceil(u64::from(per_page.max(1))) as u32,
                },
            })
        }
    }

    #[tokio::test]
    async fn fetch_all_concatenates_every_page() {
        let source = FakeSource::with_count(2050);
        let all = fetch_all_transactions(&source, "USR-1").await.unwrap();
        assert_eq!(all.len(), 2050);
        // Count probe + three pages of 1000.
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn mid_pagination_failure_aborts() {
        let source = FakeSource::failing_on(2050, 2);
        let err = fetch_all_transactions(&source, "USR-1").await.unwrap_err();
        assert_eq!(
            err,
            EngineError::Upstream("error fetching transactions from MX".to_string())
        );
    }

    #[tokio::test]
    async fn empty_history_is_a_typed_failure() {
        let service = InsightsService::new(FakeSource::with_count(0), MemoryCache::new());
        let err = service.summary("USR-1").await.unwrap_err();
        assert_eq!(err, EngineError::KeyNotFound("transactions".to_string()));
    }

    #[tokio::test]
    async fn second_lookup_inside_ttl_hits_the_cache() {
        let source = FakeSource::with_count(3);
        let calls = source.calls.clone();
        let service = InsightsService::new(source, MemoryCache::new());
        let user_id = Uuid::new_v4();

        let first = service
            .summary_markdown_cached(user_id, "USR-1")
            .await
            .unwrap();
        let after_first = calls.load(Ordering::SeqCst);

        let second = service
            .summary_markdown_cached(user_id, "USR-1")
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), after_first);
    }
}
