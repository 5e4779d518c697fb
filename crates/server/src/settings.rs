//! User settings endpoints.

use api_types::Envelope;
use api_types::settings::{SettingsUpdate, SettingsView};
use axum::{Extension, Json, extract::State, http::StatusCode};

use engine::User;

use crate::{ServerError, ServerState, ok};

pub async fn get_settings(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<(StatusCode, Json<Envelope<SettingsView>>), ServerError> {
    let settings = state.engine.settings_for_user(user.id).await?;
    Ok(ok(SettingsView {
        voice: settings.voice,
    }))
}

pub async fn update_settings(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<SettingsUpdate>,
) -> Result<(StatusCode, Json<Envelope<SettingsView>>), ServerError> {
    if payload.voice.trim().is_empty() {
        return Err(ServerError::field("voice is required", "voice"));
    }

    let settings = state.engine.update_voice(user.id, payload.voice).await?;
    Ok(ok(SettingsView {
        voice: settings.voice,
    }))
}
