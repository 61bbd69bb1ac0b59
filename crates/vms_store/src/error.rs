use thiserror::Error;

/// Errors returned by a [`crate::CollectionStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Credentials missing or rejected, or the session expired.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The store refused the request.
    #[error("Store rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The store answered with a body we could not decode.
    #[error("Invalid store response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn is_auth(&self) -> bool {
        matches!(self, StoreError::Auth(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Http(e.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e.to_string())
    }
}
