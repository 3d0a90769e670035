//! Domain-level error type shared across the workspace.

/// Errors produced by domain logic, independent of any transport.
///
/// The api crate maps each variant to an HTTP status in its `AppError`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A named entity could not be found by its lookup key.
    ///
    /// `id` is a string because retros are addressed by slug as well as by
    /// numeric id.
    #[error("{entity} '{id}' not found")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// Input failed domain validation (maps to HTTP 422).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The operation conflicts with existing state (e.g. duplicate slug).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The caller is not authenticated for this operation.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`] with a string-convertible id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
