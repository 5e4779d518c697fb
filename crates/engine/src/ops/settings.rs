//! Per-user settings operations.

use sea_orm::{ActiveModelTrait, ActiveValue, EntityTrait};
use uuid::Uuid;

use crate::user_settings::{self, DEFAULT_VOICE, UserSettings};
use crate::{Engine, ResultEngine};

impl Engine {
    pub async fn settings_for_user(&self, user_id: Uuid) -> ResultEngine<UserSettings> {
        let model = user_settings::Entity::find_by_id(user_id.to_string())
            .one(&self.database)
            .await?;
        match model {
            Some(model) => UserSettings::try_from(model),
            None => Ok(UserSettings {
                user_id,
                voice: DEFAULT_VOICE.to_string(),
            }),
        }
    }

    pub async fn update_voice(&self, user_id: Uuid, voice: String) -> ResultEngine<UserSettings> {
        let existing = user_settings::Entity::find_by_id(user_id.to_string())
            .one(&self.database)
            .await?;

        let settings = UserSettings { user_id, voice };
        let model = user_settings::ActiveModel {
            user_id: ActiveValue::Set(user_id.to_string()),
            voice: ActiveValue::Set(settings.voice.clone()),
        };
        if existing.is_some() {
            model.update(&self.database).await?;
        } else {
            model.insert(&self.database).await?;
        }
        Ok(settings)
    }
}
