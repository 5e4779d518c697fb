//! Conversation operations.
//!
//! Absent conversations surface as `KeyNotFound`; conversations owned by
//! another user surface as `Forbidden`, never as the other user's data.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::conversations::{self, Conversation, Message};
use crate::messages;
use crate::{Engine, EngineError, ResultEngine};

impl Engine {
    pub async fn create_conversation(
        &self,
        user_id: Uuid,
        title: String,
        initial_messages: Vec<Message>,
    ) -> ResultEngine<Conversation> {
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id,
            title,
            is_active: true,
            created_at: Utc::now(),
            messages: initial_messages,
        };

        conversations::ActiveModel::from(&conversation)
            .insert(&self.database)
            .await?;
        for (seq, message) in conversation.messages.iter().enumerate() {
            messages::active_model(Uuid::new_v4(), conversation.id, seq as i32, message)
                .insert(&self.database)
                .await?;
        }
        Ok(conversation)
    }

    /// Active conversations for a user, newest first, without messages.
    pub async fn conversations_for_user(
        &self,
        user_id: Uuid,
    ) -> ResultEngine<Vec<Conversation>> {
        let models = conversations::Entity::find()
            .filter(conversations::Column::UserId.eq(user_id.to_string()))
            .filter(conversations::Column::IsActive.eq(true))
            .order_by_desc(conversations::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Conversation::try_from).collect()
    }

    /// A single conversation with its full transcript.
    pub async fn conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> ResultEngine<Conversation> {
        let model = conversations::Entity::find_by_id(conversation_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("conversation".to_string()))?;

        let mut conversation = Conversation::try_from(model)?;
        if conversation.user_id != user_id {
            return Err(EngineError::Forbidden(
                "conversation belongs to another user".to_string(),
            ));
        }

        let message_models = messages::Entity::find()
            .filter(messages::Column::ConversationId.eq(conversation_id.to_string()))
            .order_by_asc(messages::Column::Seq)
            .all(&self.database)
            .await?;
        conversation.messages = message_models
            .into_iter()
            .map(messages::Model::into_message)
            .collect::<Result<_, _>>()?;
        Ok(conversation)
    }

    pub async fn rename_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        title: String,
    ) -> ResultEngine<()> {
        self.conversation(user_id, conversation_id).await?;
        let model = conversations::ActiveModel {
            id: ActiveValue::Set(conversation_id.to_string()),
            title: ActiveValue::Set(title),
            ..Default::default()
        };
        model.update(&self.database).await?;
        Ok(())
    }

    /// Soft delete: the conversation disappears from listings but the
    /// transcript stays.
    pub async fn deactivate_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> ResultEngine<()> {
        self.conversation(user_id, conversation_id).await?;
        let model = conversations::ActiveModel {
            id: ActiveValue::Set(conversation_id.to_string()),
            is_active: ActiveValue::Set(false),
            ..Default::default()
        };
        model.update(&self.database).await?;
        Ok(())
    }

    pub async fn append_message(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        message: Message,
    ) -> ResultEngine<()> {
        self.conversation(user_id, conversation_id).await?;
        let seq = messages::Entity::find()
            .filter(messages::Column::ConversationId.eq(conversation_id.to_string()))
            .count(&self.database)
            .await? as i32;
        messages::active_model(Uuid::new_v4(), conversation_id, seq, &message)
            .insert(&self.database)
            .await?;
        Ok(())
    }
}
