//! Transaction ingestion and listing.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::summary::BankTransaction;
use crate::transactions::{self, StoredTransaction};
use crate::{Engine, ResultEngine};

impl Engine {
    /// Inserts feed transactions that are not present yet, keyed by the
    /// external guid. Returns how many rows were actually inserted.
    pub async fn store_transactions(
        &self,
        user_id: Uuid,
        feed: &[BankTransaction],
    ) -> ResultEngine<u64> {
        let mut inserted = 0;
        for tx in feed {
            if self.store_transaction(user_id, tx).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Insert-if-absent for a single feed transaction.
    pub async fn store_transaction(
        &self,
        user_id: Uuid,
        tx: &BankTransaction,
    ) -> ResultEngine<bool> {
        let exists = transactions::Entity::find_by_id(tx.guid.clone())
            .one(&self.database)
            .await?
            .is_some();
        if exists {
            return Ok(false);
        }

        let stored = StoredTransaction::from_feed(user_id, tx, Utc::now());
        transactions::ActiveModel::from(&stored)
            .insert(&self.database)
            .await?;
        Ok(true)
    }

    /// Stored transactions for a user, newest first.
    pub async fn transactions_for_user(
        &self,
        user_id: Uuid,
    ) -> ResultEngine<Vec<StoredTransaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(transactions::Column::Date)
            .all(&self.database)
            .await?;
        models.into_iter().map(StoredTransaction::try_from).collect()
    }

    pub async fn transaction_count(&self, user_id: Uuid) -> ResultEngine<u64> {
        let count = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id.to_string()))
            .count(&self.database)
            .await?;
        Ok(count)
    }
}
