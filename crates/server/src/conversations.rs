//! Conversation endpoints.

use api_types::Envelope;
use api_types::conversation::{
    Completions, CompletionsResponse, ConversationCreated, ConversationEdit,
    ConversationHeaderView, ConversationNew, ConversationView, MessageNew, MessageRole,
    MessageView, SuggestionsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::json;
use uuid::Uuid;

use connectors::{CompletionOutcome, finance_tools, suggestion_schema};
use engine::cache::{TTL_SUGGESTED_QUESTIONS, suggestions_key};
use engine::{Conversation, EngineError, Message, User, prompt};

use crate::ai::{generate_chart, map_chart};
use crate::{ServerError, ServerState, created, ok, ok_message};

fn map_role(role: MessageRole) -> engine::MessageRole {
    match role {
        MessageRole::User => engine::MessageRole::User,
        MessageRole::Ai => engine::MessageRole::Ai,
    }
}

fn map_role_view(role: engine::MessageRole) -> MessageRole {
    match role {
        engine::MessageRole::User => MessageRole::User,
        engine::MessageRole::Ai => MessageRole::Ai,
    }
}

fn map_message(message: MessageNew) -> Message {
    Message {
        role: map_role(message.role),
        content: message.content,
        sent_at: message.timestamp,
    }
}

fn header_view(conversation: &Conversation) -> ConversationHeaderView {
    ConversationHeaderView {
        id: conversation.id,
        title: conversation.title.clone(),
        is_active: conversation.is_active,
        created_at: conversation.created_at,
    }
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<ConversationNew>,
) -> Result<(StatusCode, Json<Envelope<ConversationCreated>>), ServerError> {
    let title = format!("conv_{}", Uuid::new_v4());
    let messages = payload.messages.into_iter().map(map_message).collect();

    let conversation = state
        .engine
        .create_conversation(user.id, title, messages)
        .await?;

    Ok(created(ConversationCreated {
        id: conversation.id,
        title: conversation.title,
    }))
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<(StatusCode, Json<Envelope<Vec<ConversationHeaderView>>>), ServerError> {
    let conversations = state.engine.conversations_for_user(user.id).await?;
    Ok(ok(conversations.iter().map(header_view).collect()))
}

pub async fn get_detail(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Envelope<ConversationView>>), ServerError> {
    let conversation = state.engine.conversation(user.id, id).await?;

    Ok(ok(ConversationView {
        id: conversation.id,
        title: conversation.title,
        is_active: conversation.is_active,
        created_at: conversation.created_at,
        messages: conversation
            .messages
            .into_iter()
            .map(|message| MessageView {
                role: map_role_view(message.role),
                content: message.content,
                timestamp: message.sent_at,
            })
            .collect(),
    }))
}

pub async fn edit(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConversationEdit>,
) -> Result<(StatusCode, Json<Envelope<()>>), ServerError> {
    if payload.title.trim().is_empty() {
        return Err(ServerError::field("title is required", "title"));
    }

    state
        .engine
        .rename_conversation(user.id, id, payload.title)
        .await?;
    Ok(ok_message("Conversation updated"))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Envelope<()>>), ServerError> {
    state.engine.deactivate_conversation(user.id, id).await?;
    Ok(ok_message("Conversation deleted"))
}

pub async fn save_completions(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MessageNew>,
) -> Result<(StatusCode, Json<Envelope<()>>), ServerError> {
    state
        .engine
        .append_message(user.id, id, map_message(payload))
        .await?;
    Ok(ok_message("Message saved"))
}

/// One tool-calling completion round. The tool set is closed; a call to
/// any other name falls through to a plain text response.
pub async fn completions(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<Completions>,
) -> Result<(StatusCode, Json<Envelope<CompletionsResponse>>), ServerError> {
    if payload.message.trim().is_empty() {
        return Err(ServerError::field("message is required", "message"));
    }

    let outcome = state
        .openai
        .chat_completion(
            prompt::finance_agent_prompt(),
            &payload.message,
            Some(finance_tools()),
        )
        .await?;

    let response = match outcome {
        CompletionOutcome::Text(content) => CompletionsResponse {
            content: Some(content),
            function_name: None,
            details: None,
        },
        CompletionOutcome::ToolCall { name, arguments } => {
            let query = arguments["query"].as_str().unwrap_or_default().to_string();
            match name.as_str() {
                "query_transactions" => {
                    let mx_user_guid = user.mx_user_guid()?;
                    let answer = state.semantic.query(user.id, mx_user_guid, &query).await?;
                    CompletionsResponse {
                        content: None,
                        function_name: Some(name),
                        details: Some(json!({
                            "summary": answer.summary,
                            "score": answer.score,
                        })),
                    }
                }
                "create_visualization" => {
                    let chart = generate_chart(&state, &user, &query).await?;
                    let details = serde_json::to_value(map_chart(chart))
                        .map_err(|err| EngineError::Internal(format!("chart encode: {err}")))?;
                    CompletionsResponse {
                        content: None,
                        function_name: Some(name),
                        details: Some(details),
                    }
                }
                other => {
                    tracing::warn!("ignoring unknown tool call: {other}");
                    CompletionsResponse {
                        content: Some(String::new()),
                        function_name: None,
                        details: None,
                    }
                }
            }
        }
    };

    Ok(ok(response))
}

pub async fn suggestions(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Envelope<SuggestionsResponse>>), ServerError> {
    let conversation = state.engine.conversation(user.id, id).await?;

    let cache_key = suggestions_key(conversation.id);
    if let Some(cached) = state.cache.get(&cache_key).await? {
        let suggestions: SuggestionsResponse = serde_json::from_str(&cached)
            .map_err(|err| EngineError::Internal(format!("cached suggestions: {err}")))?;
        return Ok(ok(suggestions));
    }
    tracing::debug!("no cached questions for conversation {id}");

    let transcript: Vec<(String, String)> = conversation
        .messages
        .iter()
        .map(|message| (message.role.as_str().to_string(), message.content.clone()))
        .collect();

    let value = state
        .openai
        .structured_completion(
            &prompt::suggestion_prompt(&transcript),
            "SuggestionParams",
            suggestion_schema(),
        )
        .await?;
    let suggestions: SuggestionsResponse = serde_json::from_value(value)
        .map_err(|err| EngineError::Upstream(format!("suggestion output: {err}")))?;

    let serialized = serde_json::to_string(&suggestions)
        .map_err(|err| EngineError::Internal(format!("suggestions encode: {err}")))?;
    state
        .cache
        .set(&cache_key, &serialized, Some(TTL_SUGGESTED_QUESTIONS))
        .await?;

    Ok(ok(suggestions))
}
