use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::api::alerts;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Invalid search query: {0}")]
    InvalidQuery(String),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Client error carrying the entity/error-key pair clients use to pick an alert
    #[error("{message}")]
    BadRequestAlert {
        message: String,
        entity_name: String,
        error_key: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn bad_request_alert(
        message: impl Into<String>,
        entity_name: impl Into<String>,
        error_key: impl Into<String>,
    ) -> Self {
        Error::BadRequestAlert {
            message: message.into(),
            entity_name: entity_name.into(),
            error_key: error_key.into(),
        }
    }

    /// Get a sanitized error message safe for logging
    /// Filters out potentially sensitive information
    pub fn log_safe(&self) -> String {
        match self {
            // Database errors might contain sensitive schema information
            Error::Database(_) => "Database operation failed".to_string(),
            Error::Migration(_) => "Database migration failed".to_string(),

            // HTTP errors might contain internal URLs or authentication info
            Error::Http(_) => "External HTTP request failed".to_string(),

            Error::Internal(msg) => {
                let lower = msg.to_lowercase();
                if lower.contains("password")
                    || lower.contains("secret")
                    || lower.contains("token")
                    || lower.contains("key")
                {
                    "Internal error (details redacted)".to_string()
                } else {
                    format!("Internal error: {msg}")
                }
            }

            Error::Search(msg) => format!("Search error: {msg}"),
            Error::InvalidQuery(msg) => format!("Invalid search query: {msg}"),
            Error::Tantivy(_) => "Search index error".to_string(),
            Error::Json(_) => "Document serialization failed".to_string(),
            Error::Io(_) => "File system operation failed".to_string(),
            Error::Config(msg) => format!("Configuration error: {msg}"),
            Error::BadRequestAlert {
                entity_name,
                error_key,
                ..
            } => format!("Bad request: {entity_name}/{error_key}"),
            Error::NotFound(msg) => format!("Not found: {msg}"),
            Error::Validation(msg) => format!("Validation error: {msg}"),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequestAlert { .. } | Error::Validation(_) | Error::InvalidQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Request error: {}", self.log_safe());
        } else {
            tracing::debug!("Request rejected: {}", self.log_safe());
        }

        match self {
            Error::BadRequestAlert {
                message,
                entity_name,
                error_key,
            } => {
                let headers = alerts::failure_alert(&entity_name, &error_key);
                let body = Json(json!({
                    "title": message,
                    "status": status.as_u16(),
                    "entityName": entity_name,
                    "errorKey": error_key,
                }));
                (status, headers, body).into_response()
            }
            other => {
                let error_message = match &other {
                    Error::NotFound(msg) | Error::Validation(msg) | Error::InvalidQuery(msg) => {
                        msg.clone()
                    }
                    Error::Database(_) => "Database error".to_string(),
                    Error::Search(_) | Error::Tantivy(_) => "Search error".to_string(),
                    Error::Http(_) => "External service error".to_string(),
                    _ => "Internal server error".to_string(),
                };

                (status, Json(json!({ "error": error_message }))).into_response()
            }
        }
    }
}
