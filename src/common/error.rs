//! Error types for minivote

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Input Errors ===
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),

    // === Domain Errors ===
    #[error("Vote session already exists: {0}")]
    DuplicateSession(String),

    #[error("Vote session not found: {0}")]
    SessionNotFound(String),

    #[error("No ballot for {user} in session {session}")]
    UserNotEligible { session: String, user: String },

    #[error("Option {option:?} is not declared in session {session}")]
    UnknownOption { session: String, option: String },

    // === Storage Errors ===
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    // === Mail Errors ===
    #[error("Mail transport error: {0}")]
    Mail(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_)
            | Error::InvalidSessionId(_)
            | Error::UnknownOption { .. }
            | Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Error::DuplicateSession(_) => StatusCode::CONFLICT,
            Error::SessionNotFound(_) | Error::UserNotEligible { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.to_http_status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {self}");
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
