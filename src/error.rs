use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use serde_json::json;

use crate::models::user::UniqueColumn;

pub type Result<T> = std::result::Result<T, Error>;

pub const NOT_FOUND_MESSAGE: &str = "The requested resource does not exist.";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A write hit a uniqueness constraint that validation did not catch.
    #[error("Duplicate value for {}", .0.column())]
    Duplicate(UniqueColumn),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found() -> Self {
        Error::NotFound(NOT_FOUND_MESSAGE.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct FieldErrorBody {
    pub field: String,
    pub message: String,
}

/// Flattens validator errors into `{field, message}` pairs sorted by field.
pub fn field_errors(errors: &validator::ValidationErrors) -> Vec<FieldErrorBody> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    fields
        .into_iter()
        .flat_map(|(field, list)| {
            list.iter().map(move |err| FieldErrorBody {
                field: field.to_string(),
                message: err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid.", field)),
            })
        })
        .collect()
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Error::Validation(errors) => {
                let body = Json(json!({ "errors": field_errors(&errors) }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Error::Duplicate(column) => (
                StatusCode::CONFLICT,
                format!("The {} is already in use.", column.column()),
            ),
            Error::Unsupported(msg) => (StatusCode::NOT_IMPLEMENTED, msg),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            other => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::not_found(),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                match db.constraint().and_then(UniqueColumn::from_constraint) {
                    Some(column) => Error::Duplicate(column),
                    None => {
                        tracing::warn!(constraint = ?db.constraint(), "unmapped unique violation");
                        Error::Conflict("The record conflicts with existing data.".to_string())
                    }
                }
            }
            other => Error::Database(other),
        }
    }
}
