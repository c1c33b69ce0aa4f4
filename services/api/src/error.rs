//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and the mapping
//! from core errors onto HTTP responses.

use crate::config::ConfigError;
use axum::http::StatusCode;
use lead_tracker_core::ports::PortError;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core services.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Maps a core error onto the status code and message returned to clients.
///
/// Storage and internal failures are logged and answered with a generic message.
pub fn http_error(context: &str, err: PortError) -> (StatusCode, String) {
    match err {
        PortError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::InvalidCredentials => (StatusCode::UNAUTHORIZED, err.to_string()),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, err.to_string()),
        PortError::Corrupted { .. } | PortError::Unexpected(_) => {
            error!("{}: {:?}", context, err);
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}
