//! Custom error types for the Device Sentry application
//!
//! This module defines the error enum shared by every component, plus the
//! mapping from errors to HTTP responses used by the API handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the Device Sentry application
#[derive(Debug, Error)]
pub enum SentryError {
    /// Error occurred while parsing address
    #[error("Failed to parse network address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    /// Error occurred while reading or writing a file, or binding a socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error occurred while parsing the JSON5 configuration
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] json5::Error),

    /// Error occurred while encoding or decoding a JSON document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration was readable but semantically invalid
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Device log or settings could not be persisted
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Notification could not be delivered
    #[error("Transport error: {0}")]
    Transport(String),

    /// Caller supplied malformed input
    #[error("{0}")]
    Validation(String),

    /// Generic error with a message
    #[error("Error: {0}")]
    Generic(String),
}

impl IntoResponse for SentryError {
    fn into_response(self) -> Response {
        let status = match self {
            SentryError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Result type alias using our custom error type
pub type Result<T> = std::result::Result<T, SentryError>;
