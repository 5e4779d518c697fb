//! Credential tokens: refresh tokens and one-time passcodes.
//!
//! Refresh tokens are rotated wholesale: issuing a new one deletes every
//! existing refresh token for the user first, so at most one is valid at
//! a time.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    RefreshToken,
    Otp,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RefreshToken => "refresh_token",
            Self::Otp => "otp",
        }
    }
}

impl TryFrom<&str> for TokenKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "refresh_token" => Ok(Self::RefreshToken),
            "otp" => Ok(Self::Otp),
            other => Err(EngineError::Validation(format!(
                "invalid token kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Token {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    #[sea_orm(unique)]
    pub token: String,
    pub kind: String,
    pub expires_at: DateTimeUtc,
    pub user_agent: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Token> for ActiveModel {
    fn from(token: &Token) -> Self {
        Self {
            id: ActiveValue::Set(token.id.to_string()),
            user_id: ActiveValue::Set(token.user_id.to_string()),
            token: ActiveValue::Set(token.token.clone()),
            kind: ActiveValue::Set(token.kind.as_str().to_string()),
            expires_at: ActiveValue::Set(token.expires_at),
            user_agent: ActiveValue::Set(token.user_agent.clone()),
            created_at: ActiveValue::Set(token.created_at),
        }
    }
}

impl TryFrom<Model> for Token {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("token".to_string()))?,
            user_id: Uuid::parse_str(&model.user_id)
                .map_err(|_| EngineError::KeyNotFound("token user".to_string()))?,
            token: model.token,
            kind: TokenKind::try_from(model.kind.as_str())?,
            expires_at: model.expires_at,
            user_agent: model.user_agent,
            created_at: model.created_at,
        })
    }
}
