use std::collections::BTreeMap;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use validator::ValidationErrors;

use crate::repository::RepoError;

/// Field name to human-readable messages, as returned to clients on validation failures.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// AppError
///
/// Every failure a handler can surface. Internal details are logged, never sent.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized(String),

    #[error("You do not have permission to perform this action.")]
    AuthorizationDenied,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid input")]
    Validation(FieldErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Repository(#[source] RepoError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// A validation failure on a single field.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(name.to_string(), vec![message.into()]);
        AppError::Validation(fields)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({}).", e.code))
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }
        AppError::Validation(fields)
    }
}

/// Field that body-level problems (bad syntax, wrong content type) are reported under.
const BODY_FIELD: &str = "body";

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        tracing::debug!(status = %rejection.status(), "request body rejected: {detail}");

        match rejection {
            // "Failed to deserialize ...: <path>: <serde message>"; the path names the field.
            JsonRejection::JsonDataError(_) => {
                let reason = detail
                    .split_once(": ")
                    .map_or(detail.as_str(), |(_, rest)| rest);
                match reason.split_once(": ") {
                    Some((path, message)) if !path.is_empty() && !path.contains(' ') => {
                        AppError::field(path, message)
                    }
                    _ => AppError::field(BODY_FIELD, reason),
                }
            }
            JsonRejection::MissingJsonContentType(_) => {
                AppError::field(BODY_FIELD, "Expected a JSON body with `Content-Type: application/json`.")
            }
            _ => AppError::field(BODY_FIELD, detail),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::UniqueViolation(constraint) => {
                AppError::Conflict(format!("{constraint} already taken"))
            }
            RepoError::MissingReference(_) => AppError::NotFound("Referenced resource"),
            other => AppError::Repository(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::AuthorizationDenied => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Repository(e) => {
                tracing::error!("Repository error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = match &self {
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Repository(_) | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = match self {
            AppError::Validation(fields) => json!({
                "error": { "code": code, "message": message, "fields": fields }
            }),
            _ => json!({
                "error": { "code": code, "message": message }
            }),
        };

        (status, Json(body)).into_response()
    }
}
