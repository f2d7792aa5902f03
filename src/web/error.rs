//! HTTP error responses.
//!
//! Every failure is reported as `500 Internal Server Error`. JSON routes
//! answer `{"error": "..."}`; the OAuth and upload routes answer plain text.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// How the error body is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFormat {
    /// `{"error": message}`.
    Json,
    /// The message as `text/plain`.
    Text,
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    format: ErrorFormat,
    message: String,
}

impl ApiError {
    /// Error with a JSON body.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            format: ErrorFormat::Json,
            message: message.into(),
        }
    }

    /// Error with a plain-text body.
    pub fn plain(message: impl Into<String>) -> Self {
        Self {
            format: ErrorFormat::Text,
            message: message.into(),
        }
    }

    /// Log `err` and return a JSON error carrying `message`.
    pub fn logged(message: &str, err: impl std::fmt::Display) -> Self {
        tracing::error!(error = %err, "{}", message);
        Self::internal(message)
    }

    /// Log `err` and return a plain-text error carrying `message`.
    pub fn logged_plain(message: &str, err: impl std::fmt::Display) -> Self {
        tracing::error!(error = %err, "{}", message);
        Self::plain(message)
    }

    /// Body format.
    pub fn format(&self) -> ErrorFormat {
        self.format
    }

    /// Error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        match self.format {
            ErrorFormat::Json => (
                status,
                Json(ErrorBody {
                    error: self.message,
                }),
            )
                .into_response(),
            ErrorFormat::Text => (status, self.message).into_response(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
