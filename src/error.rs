use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid proxy target `{target}`: {reason}")]
    Allowlist { target: String, reason: String },

    #[error("Server error: {0}")]
    Server(String),
}

// Implement alias for Result to simplify usage
pub type AppResult<T> = Result<T, AppError>;

/// Per-request failures surfaced to the caller.
///
/// Only the two caller-visible kinds exist. Everything that goes wrong while
/// building, sending or reading the outbound call is an `UpstreamFailure`; its
/// cause is kept for server-side logging and never rendered into the response.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Invalid proxy target: {0}")]
    InvalidTarget(String),

    #[error("Proxy request failed: {0}")]
    UpstreamFailure(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message placed in the `error` field of the JSON body.
    pub fn public_message(&self) -> String {
        match self {
            ProxyError::InvalidTarget(target) => format!("Invalid proxy target: {}", target),
            ProxyError::UpstreamFailure(_) => "Proxy request failed".to_string(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.public_message() }))).into_response()
    }
}
