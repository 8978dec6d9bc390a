//! Table error types.

use std::fmt;

use dina_client::ErrorObject;
use thiserror::Error;

/// A failed list fetch, as stored in a table's error slot.
///
/// Transport failures and server-reported validation errors both end up in
/// this shape. `errors` is empty for the former.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub status: Option<u16>,
    pub errors: Vec<ErrorObject>,
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            errors: Vec::new(),
            message: message.into(),
        }
    }

    /// True when the server reported JSON:API errors.
    pub fn is_validation(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FetchError {}

impl From<dina_client::Error> for FetchError {
    fn from(err: dina_client::Error) -> Self {
        Self {
            status: err.status(),
            errors: err.errors(),
            message: err.to_string(),
        }
    }
}

/// Table errors outside the fetch path.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing persisted state failed.
    #[error("state store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted state could not be encoded or decoded.
    #[error("state encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
