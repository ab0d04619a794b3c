use thiserror::Error;

/// Typed failure taxonomy for every engine operation.
///
/// Domain checks surface as one of the client-facing variants before any
/// mutation is attempted. Storage and collaborator failures are caught at the
/// boundary and wrapped as `Internal`; the wrapped detail is for logs only and
/// must never reach a caller verbatim.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("insufficient stock for product {product_id}")]
    InsufficientStock { product_id: i64 },
    #[error("authentication required")]
    Unauthenticated,
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Message that is safe to return to a caller. `Internal` collapses to a
    /// generic sentence; its detail is for logs only.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { entity, .. } => format!("{entity} not found"),
            Self::Forbidden(message) => message.clone(),
            Self::Validation(message) => message.clone(),
            Self::Conflict(message) => message.clone(),
            Self::InsufficientStock { .. } => "insufficient stock for one of the items".to_string(),
            Self::Unauthenticated => "authentication required".to_string(),
            Self::Internal(_) => "an unexpected internal error occurred".to_string(),
        }
    }
}
