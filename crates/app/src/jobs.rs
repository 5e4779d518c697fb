//! Background transaction sync.
//!
//! The sync task walks qualifying users on an interval, fetches their
//! full aggregator history, and enqueues one job per transaction onto a
//! Redis list. The worker consumes with `BLMOVE` into a processing list
//! and only removes the entry after a successful ingest, so delivery is
//! at least once; the guid dedup in the store makes redelivery harmless.

use std::sync::Arc;

use engine::insights::fetch_all_transactions;
use engine::summary::BankTransaction;
use engine::{Engine, EngineError};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use connectors::MxClient;

pub const QUEUE_KEY: &str = "transactions:queue";
pub const PROCESSING_KEY: &str = "transactions:processing";

const WORKER_POLL_TIMEOUT_SECS: f64 = 5.0;

#[derive(Debug, Serialize, Deserialize)]
struct IngestJob {
    user_id: Uuid,
    transaction: BankTransaction,
}

pub async fn sync_task(
    engine: Arc<Engine>,
    mx: MxClient,
    redis: ConnectionManager,
    interval_secs: u64,
) {
    // The first tick fires immediately.
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;
        tracing::info!("Running transaction sync...");

        let users = match engine.qualified_users().await {
            Ok(users) => users,
            Err(err) => {
                tracing::error!("failed to list qualified users: {err}");
                continue;
            }
        };
        tracing::info!("Found {} users to sync", users.len());

        for user in users {
            let Ok(mx_user_guid) = user.mx_user_guid() else {
                continue;
            };

            let transactions = match fetch_all_transactions(&mx, mx_user_guid).await {
                Ok(transactions) => transactions,
                Err(err) => {
                    tracing::error!("sync failed for user {}: {err}", user.id);
                    continue;
                }
            };

            let mut conn = redis.clone();
            for transaction in transactions {
                let job = IngestJob {
                    user_id: user.id,
                    transaction,
                };
                let payload = match serde_json::to_string(&job) {
                    Ok(payload) => payload,
                    Err(err) => {
                        tracing::error!("failed to encode ingest job: {err}");
                        continue;
                    }
                };
                if let Err(err) = conn.lpush::<_, _, ()>(QUEUE_KEY, payload).await {
                    tracing::error!("failed to enqueue ingest job: {err}");
                }
            }
        }

        tracing::info!("Finished transaction sync");
    }
}

pub async fn worker_task(engine: Arc<Engine>, redis: ConnectionManager) {
    loop {
        let mut conn = redis.clone();
        let payload: Option<String> = match redis::cmd("BLMOVE")
            .arg(QUEUE_KEY)
            .arg(PROCESSING_KEY)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(WORKER_POLL_TIMEOUT_SECS)
            .query_async(&mut conn)
            .await
        {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!("worker failed to poll queue: {err}");
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                continue;
            }
        };

        let Some(payload) = payload else { continue };

        match process_job(&engine, &payload).await {
            Ok(inserted) => {
                if inserted {
                    tracing::debug!("ingested one transaction");
                }
                if let Err(err) = conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload).await {
                    tracing::error!("failed to ack ingest job: {err}");
                }
            }
            // A payload that does not decode can never succeed; drop it
            // instead of cycling it through the queue forever.
            Err(EngineError::Validation(err)) => {
                tracing::error!("dropping malformed ingest job: {err}");
                let _ = conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload).await;
            }
            Err(err) => {
                tracing::error!("ingest job failed, requeueing: {err}");
                let _ = conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload).await;
                let _ = conn.rpush::<_, _, ()>(QUEUE_KEY, &payload).await;
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }
}

async fn process_job(engine: &Engine, payload: &str) -> Result<bool, EngineError> {
    let job: IngestJob = serde_json::from_str(payload)
        .map_err(|err| EngineError::Validation(format!("malformed ingest job: {err}")))?;
    engine.store_transaction(job.user_id, &job.transaction).await
}
