use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use huddle_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `huddle_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request body failed field validation (maps to 422).
    #[error("Validation failed")]
    Validation(#[from] validator::ValidationErrors),

    /// A semantic validation failure with a pre-built errors payload
    /// (maps to 422), e.g. a wrong current password.
    #[error("Unprocessable: {0}")]
    Unprocessable(serde_json::Value),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Validation failures carry a structured `errors` payload so the
        // client can surface per-field messages; everything else uses the
        // `{error, code}` envelope.
        let (status, code, message) = match &self {
            AppError::Validation(errors) => {
                let body = json!({ "errors": errors });
                return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response();
            }
            AppError::Unprocessable(errors) => {
                let body = json!({ "errors": errors });
                return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response();
            }

            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} '{id}' not found"),
                ),
                CoreError::Validation(msg) => {
                    // Domain validation is 422 so the client's
                    // validation-failure classification sees it.
                    let body = json!({ "errors": [msg] });
                    return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response();
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Database errors ---
            AppError::Database(err) => return classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP response.
///
/// - `RowNotFound` maps to 404.
/// - A duplicate slug (`uq_retros_slug`) maps to 422 with a field error,
///   matching what the settings form expects.
/// - Other unique constraint violations (constraint name starting with
///   `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> Response {
    match err {
        sqlx::Error::RowNotFound => {
            let body = json!({ "error": "Resource not found", "code": "NOT_FOUND" });
            (StatusCode::NOT_FOUND, axum::Json(body)).into_response()
        }
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint == "uq_retros_slug" {
                    let body = json!({ "errors": { "slug": ["has already been taken"] } });
                    return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response();
                }
                if constraint.starts_with("uq_") {
                    let body = json!({
                        "error": format!("Duplicate value violates unique constraint: {constraint}"),
                        "code": "CONFLICT",
                    });
                    return (StatusCode::CONFLICT, axum::Json(body)).into_response();
                }
            }
            tracing::error!(error = %db_err, "Database error");
            let body = json!({ "error": "An internal error occurred", "code": "INTERNAL_ERROR" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            let body = json!({ "error": "An internal error occurred", "code": "INTERNAL_ERROR" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
        }
    }
}
