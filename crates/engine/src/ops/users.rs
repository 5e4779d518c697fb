//! User account operations.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue, ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::users::{self, User};
use crate::{Engine, EngineError, ResultEngine};

/// Input for account creation. The password arrives already hashed.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub verification_method: String,
}

impl Engine {
    /// Creates an unverified account. Fails with `ExistingKey` when the
    /// email is already registered.
    pub async fn create_user(&self, new: NewUser) -> ResultEngine<User> {
        if self.user_by_email(&new.email).await?.is_some() {
            return Err(EngineError::ExistingKey(new.email));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            full_name: new.full_name,
            password_hash: new.password_hash,
            phone_number: new.phone_number,
            is_verified: false,
            verification_method: new.verification_method,
            mx_user_guid: None,
            created_at: Utc::now(),
        };
        users::ActiveModel::from(&user).insert(&self.database).await?;
        Ok(user)
    }

    pub async fn user_by_email(&self, email: &str) -> ResultEngine<Option<User>> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.database)
            .await?;
        model.map(User::try_from).transpose()
    }

    pub async fn user_by_id(&self, id: Uuid) -> ResultEngine<User> {
        let model = users::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user".to_string()))?;
        User::try_from(model)
    }

    pub async fn mark_user_verified(&self, id: Uuid) -> ResultEngine<()> {
        let user = self.user_by_id(id).await?;
        if user.is_verified {
            return Err(EngineError::Validation(
                "user already verified".to_string(),
            ));
        }

        let model = users::ActiveModel {
            id: ActiveValue::Set(id.to_string()),
            is_verified: ActiveValue::Set(true),
            ..Default::default()
        };
        model.update(&self.database).await?;
        Ok(())
    }

    /// Records the aggregator user created for this account at signup.
    pub async fn link_mx_user(&self, id: Uuid, mx_user_guid: &str) -> ResultEngine<()> {
        self.user_by_id(id).await?;
        let model = users::ActiveModel {
            id: ActiveValue::Set(id.to_string()),
            mx_user_guid: ActiveValue::Set(Some(mx_user_guid.to_string())),
            ..Default::default()
        };
        model.update(&self.database).await?;
        Ok(())
    }

    /// Users eligible for the background sync: verified and linked to
    /// the aggregator.
    pub async fn qualified_users(&self) -> ResultEngine<Vec<User>> {
        let models = users::Entity::find()
            .filter(users::Column::IsVerified.eq(true))
            .filter(users::Column::MxUserGuid.is_not_null())
            .all(&self.database)
            .await?;
        models.into_iter().map(User::try_from).collect()
    }
}
