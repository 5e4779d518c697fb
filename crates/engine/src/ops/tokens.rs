//! Token persistence.
//!
//! Refresh tokens rotate wholesale and OTPs replace each other, so both
//! issue paths delete the user's previous tokens of that kind first.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter};
use uuid::Uuid;

use crate::tokens::{self, Token, TokenKind};
use crate::{Engine, ResultEngine};

impl Engine {
    pub async fn issue_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
        user_agent: Option<String>,
    ) -> ResultEngine<Token> {
        self.delete_tokens(user_id, TokenKind::RefreshToken).await?;
        self.insert_token(user_id, token, TokenKind::RefreshToken, expires_at, user_agent)
            .await
    }

    pub async fn issue_otp(
        &self,
        user_id: Uuid,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> ResultEngine<Token> {
        self.delete_tokens(user_id, TokenKind::Otp).await?;
        self.insert_token(user_id, otp, TokenKind::Otp, expires_at, None)
            .await
    }

    async fn insert_token(
        &self,
        user_id: Uuid,
        token: &str,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
        user_agent: Option<String>,
    ) -> ResultEngine<Token> {
        let token = Token {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            kind,
            expires_at,
            user_agent,
            created_at: Utc::now(),
        };
        tokens::ActiveModel::from(&token)
            .insert(&self.database)
            .await?;
        Ok(token)
    }

    pub async fn find_token(
        &self,
        value: &str,
        kind: TokenKind,
    ) -> ResultEngine<Option<Token>> {
        let model = tokens::Entity::find()
            .filter(tokens::Column::Token.eq(value))
            .filter(tokens::Column::Kind.eq(kind.as_str()))
            .one(&self.database)
            .await?;
        model.map(Token::try_from).transpose()
    }

    pub async fn delete_tokens(&self, user_id: Uuid, kind: TokenKind) -> ResultEngine<u64> {
        let result = tokens::Entity::delete_many()
            .filter(tokens::Column::UserId.eq(user_id.to_string()))
            .filter(tokens::Column::Kind.eq(kind.as_str()))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected)
    }

    /// Removes a single consumed token (e.g. a verified OTP).
    pub async fn consume_token(&self, id: Uuid) -> ResultEngine<()> {
        if let Some(model) = tokens::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
        {
            model.delete(&self.database).await?;
        }
        Ok(())
    }
}
