use thiserror::Error;

/// Errors raised by a document store backend
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Document does not exist (update precondition failed)
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Document already exists (create precondition failed)
    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    /// Path segment is empty or contains a separator
    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Backend answered with an unexpected status
    #[error("Store error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Backend payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Errors produced while resolving a request against the store
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// Missing or invalid parameter or body field
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Entity missing or business predicate false
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity already exists or a unique field is taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ServiceError::BadRequest(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        ServiceError::Conflict(what.into())
    }
}
