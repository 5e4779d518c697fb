use api_types::{Envelope, ErrorDetail};
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;
use serde::Serialize;

pub use server::{ServerState, router, run_with_listener, spawn_with_listener};

mod ai;
mod auth;
mod bank;
mod conversations;
mod server;
mod settings;

pub enum ServerError {
    Engine(EngineError),
    Validation(Vec<ErrorDetail>),
}

impl ServerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![ErrorDetail {
            message: message.into(),
            field: None,
        }])
    }

    pub fn field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation(vec![ErrorDetail {
            message: message.into(),
            field: Some(field.into()),
        }])
    }
}

fn status_text(code: StatusCode) -> String {
    code.canonical_reason().unwrap_or("Unknown").to_string()
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Upstream(_) | EngineError::Internal(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Upstream/internal details are logged and replaced with a generic
/// message; everything else is safe to show.
fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Internal(detail) => {
            tracing::error!("internal error: {detail}");
            "internal server error".to_string()
        }
        EngineError::Upstream(detail) => {
            tracing::error!("upstream error: {detail}");
            "upstream service failure".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ServerError::Engine(err) => {
                let code = status_for_engine_error(&err);
                let envelope: Envelope<()> = Envelope {
                    code: code.as_u16(),
                    status: status_text(code),
                    success: false,
                    message: message_for_engine_error(err),
                    data: None,
                    errors: None,
                };
                (code, Json(envelope)).into_response()
            }
            ServerError::Validation(errors) => {
                let code = StatusCode::BAD_REQUEST;
                let envelope: Envelope<()> = Envelope {
                    code: code.as_u16(),
                    status: status_text(code),
                    success: false,
                    message: "Validation failed".to_string(),
                    data: None,
                    errors: Some(errors),
                };
                (code, Json(envelope)).into_response()
            }
        }
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<connectors::ConnectorError> for ServerError {
    fn from(value: connectors::ConnectorError) -> Self {
        Self::Engine(EngineError::from(value))
    }
}

pub(crate) fn ok<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    with_status(StatusCode::OK, "Success", Some(data))
}

pub(crate) fn ok_message(message: &str) -> (StatusCode, Json<Envelope<()>>) {
    with_status::<()>(StatusCode::OK, message, None)
}

pub(crate) fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    with_status(StatusCode::CREATED, "Created", Some(data))
}

fn with_status<T: Serialize>(
    code: StatusCode,
    message: &str,
    data: Option<T>,
) -> (StatusCode, Json<Envelope<T>>) {
    (
        code,
        Json(Envelope {
            code: code.as_u16(),
            status: status_text(code),
            success: true,
            message: message.to_string(),
            data,
            errors: None,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_validation_maps_to_400() {
        let res = ServerError::from(EngineError::Validation("bad".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn engine_unauthorized_maps_to_401() {
        let res = ServerError::from(EngineError::Unauthorized("no".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn engine_forbidden_maps_to_403() {
        let res = ServerError::from(EngineError::Forbidden("no".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        let res = ServerError::from(EngineError::ExistingKey("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn upstream_maps_to_500() {
        let res = ServerError::from(EngineError::Upstream("boom".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_errors_map_to_400() {
        let res = ServerError::field("email is required", "email").into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
