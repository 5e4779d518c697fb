use engine::EngineError;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<ConnectorError> for EngineError {
    fn from(err: ConnectorError) -> Self {
        EngineError::Upstream(err.to_string())
    }
}
