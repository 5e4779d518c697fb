//! Conversation message rows.

use sea_orm::{ActiveValue, entity::prelude::*};

use crate::EngineError;
use crate::conversations::{Message, MessageRole};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "conversation_messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub conversation_id: String,
    /// Position in the transcript, starting at 0.
    pub seq: i32,
    pub role: String,
    pub content: String,
    pub sent_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::conversations::Entity",
        from = "Column::ConversationId",
        to = "super::conversations::Column::Id"
    )]
    Conversations,
}

impl Related<super::conversations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Conversations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_message(self) -> Result<Message, EngineError> {
        Ok(Message {
            role: MessageRole::try_from(self.role.as_str())?,
            content: self.content,
            sent_at: self.sent_at,
        })
    }
}

pub fn active_model(
    id: uuid::Uuid,
    conversation_id: uuid::Uuid,
    seq: i32,
    message: &Message,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::Set(id.to_string()),
        conversation_id: ActiveValue::Set(conversation_id.to_string()),
        seq: ActiveValue::Set(seq),
        role: ActiveValue::Set(message.role.as_str().to_string()),
        content: ActiveValue::Set(message.content.clone()),
        sent_at: ActiveValue::Set(message.sent_at),
    }
}
