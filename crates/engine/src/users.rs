//! User accounts.
//!
//! A user owns at most one aggregator link (`mx_user_guid`); the link is
//! created at signup and survives bank disconnects (members are removed
//! at the aggregator, the aggregator user stays).

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub is_verified: bool,
    pub verification_method: String,
    pub mx_user_guid: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The aggregator user guid, required by every bank-facing operation.
    pub fn mx_user_guid(&self) -> Result<&str, EngineError> {
        self.mx_user_guid
            .as_deref()
            .ok_or_else(|| EngineError::KeyNotFound("linked aggregator user".to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub is_verified: bool,
    pub verification_method: String,
    pub mx_user_guid: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tokens::Entity")]
    Tokens,
}

impl Related<super::tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        Self {
            id: ActiveValue::Set(user.id.to_string()),
            email: ActiveValue::Set(user.email.clone()),
            full_name: ActiveValue::Set(user.full_name.clone()),
            password_hash: ActiveValue::Set(user.password_hash.clone()),
            phone_number: ActiveValue::Set(user.phone_number.clone()),
            is_verified: ActiveValue::Set(user.is_verified),
            verification_method: ActiveValue::Set(user.verification_method.clone()),
            mx_user_guid: ActiveValue::Set(user.mx_user_guid.clone()),
            created_at: ActiveValue::Set(user.created_at),
        }
    }
}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("user".to_string()))?,
            email: model.email,
            full_name: model.full_name,
            password_hash: model.password_hash,
            phone_number: model.phone_number,
            is_verified: model.is_verified,
            verification_method: model.verification_method,
            mx_user_guid: model.mx_user_guid,
            created_at: model.created_at,
        })
    }
}
