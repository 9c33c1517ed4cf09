use axum::{http::StatusCode, response::IntoResponse};
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

use crate::server::render::{self, MessageTemplate};

#[derive(Debug, ThisError)]
pub enum PrefsError {
    /// Configuration unreadable, unparsable, or missing the descriptor key.
    #[error("Config error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(#[source] SqlxError),

    #[error("Query error: {0}")]
    Query(#[source] SqlxError),

    #[error("Database {0} timed out")]
    Timeout(&'static str),

    #[error("missing `email` in request")]
    MissingEmail,
}

impl PrefsError {
    /// True for every failure raised behind the store boundary.
    pub fn is_store_failure(&self) -> bool {
        !matches!(self, PrefsError::MissingEmail)
    }

    /// Short label used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PrefsError::Config(_) => "config",
            PrefsError::Connection(_) => "connection",
            PrefsError::Query(_) => "query",
            PrefsError::Timeout(_) => "timeout",
            PrefsError::MissingEmail => "client",
        }
    }
}

impl From<figment::Error> for PrefsError {
    fn from(e: figment::Error) -> Self {
        PrefsError::Config(e.to_string())
    }
}

impl From<std::io::Error> for PrefsError {
    fn from(e: std::io::Error) -> Self {
        PrefsError::Config(e.to_string())
    }
}

impl IntoResponse for PrefsError {
    fn into_response(self) -> axum::response::Response {
        // Store failures keep a 200 and a generic page; the cause stays in the logs.
        if self.is_store_failure() {
            render::page(StatusCode::OK, &MessageTemplate::error())
        } else {
            render::page(StatusCode::BAD_REQUEST, &MessageTemplate::bad_request())
        }
    }
}
