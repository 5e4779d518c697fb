//! Locally persisted aggregator transactions.
//!
//! Rows are an append-only, deduplicated mirror of the aggregator feed,
//! keyed by the external `guid`. They are inserted by the ingestion
//! worker only and never updated.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;
use crate::summary::BankTransaction;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub guid: String,
    pub user_id: Uuid,
    pub transaction_id: String,
    pub account_guid: String,
    pub member_guid: String,
    pub date: chrono::NaiveDate,
    pub amount: f64,
    pub currency_code: String,
    pub description: String,
    pub original_description: String,
    pub category: String,
    pub top_level_category: String,
    pub is_income: bool,
    pub is_expense: bool,
    pub status: String,
    pub memo: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

impl StoredTransaction {
    pub fn from_feed(user_id: Uuid, tx: &BankTransaction, ingested_at: DateTime<Utc>) -> Self {
        Self {
            guid: tx.guid.clone(),
            user_id,
            transaction_id: tx.transaction_id.clone(),
            account_guid: tx.account_guid.clone(),
            member_guid: tx.member_guid.clone(),
            date: tx.date,
            amount: tx.amount,
            currency_code: tx.currency_code.clone(),
            description: tx.description.clone(),
            original_description: tx.original_description.clone(),
            category: tx.category.clone(),
            top_level_category: tx.top_level_category.clone(),
            is_income: tx.is_income,
            is_expense: tx.is_expense,
            status: tx.status.clone(),
            memo: tx.memo.clone(),
            ingested_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub guid: String,
    pub user_id: String,
    pub transaction_id: String,
    pub account_guid: String,
    pub member_guid: String,
    pub date: Date,
    pub amount: f64,
    pub currency_code: String,
    pub description: String,
    pub original_description: String,
    pub category: String,
    pub top_level_category: String,
    pub is_income: bool,
    pub is_expense: bool,
    pub status: String,
    pub memo: Option<String>,
    pub ingested_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&StoredTransaction> for ActiveModel {
    fn from(tx: &StoredTransaction) -> Self {
        Self {
            guid: ActiveValue::Set(tx.guid.clone()),
            user_id: ActiveValue::Set(tx.user_id.to_string()),
            transaction_id: ActiveValue::Set(tx.transaction_id.clone()),
            account_guid: ActiveValue::Set(tx.account_guid.clone()),
            member_guid: ActiveValue::Set(tx.member_guid.clone()),
            date: ActiveValue::Set(tx.date),
            amount: ActiveValue::Set(tx.amount),
            currency_code: ActiveValue::Set(tx.currency_code.clone()),
            description: ActiveValue::Set(tx.description.clone()),
            original_description: ActiveValue::Set(tx.original_description.clone()),
            category: ActiveValue::Set(tx.category.clone()),
            top_level_category: ActiveValue::Set(tx.top_level_category.clone()),
            is_income: ActiveValue::Set(tx.is_income),
            is_expense: ActiveValue::Set(tx.is_expense),
            status: ActiveValue::Set(tx.status.clone()),
            memo: ActiveValue::Set(tx.memo.clone()),
            ingested_at: ActiveValue::Set(tx.ingested_at),
        }
    }
}

impl TryFrom<Model> for StoredTransaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            guid: model.guid,
            user_id: Uuid::parse_str(&model.user_id)
                .map_err(|_| EngineError::KeyNotFound("transaction user".to_string()))?,
            transaction_id: model.transaction_id,
            account_guid: model.account_guid,
            member_guid: model.member_guid,
            date: model.date,
            amount: model.amount,
            currency_code: model.currency_code,
            description: model.description,
            original_description: model.original_description,
            category: model.category,
            top_level_category: model.top_level_category,
            is_income: model.is_income,
            is_expense: model.is_expense,
            status: model.status,
            memo: model.memo,
            ingested_at: model.ingested_at,
        })
    }
}
