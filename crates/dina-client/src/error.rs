//! Client error types.

use thiserror::Error;

use crate::jsonapi::ErrorObject;
use crate::operations::OperationError;

/// Client errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{url}: status {status}{}", prefixed(.message))]
    Api {
        url: String,
        status: u16,
        message: String,
        errors: Vec<ErrorObject>,
    },

    /// At least one entry of an operations batch failed, so none were applied.
    #[error("operations failed: {message}")]
    Operations {
        message: String,
        errors: Vec<OperationError>,
    },

    /// The body could not be read as the expected JSON.
    #[error("malformed JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL is not a URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A configured header cannot be sent.
    #[error("invalid header {0}")]
    InvalidHeader(String),
}

impl Error {
    /// HTTP status of a server-reported failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// JSON:API error objects reported by the server.
    pub fn errors(&self) -> Vec<ErrorObject> {
        match self {
            Error::Api { errors, .. } => errors.clone(),
            Error::Operations { errors, .. } => {
                errors.iter().flat_map(|e| e.errors.iter().cloned()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn prefixed(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = Error::Api {
            url: "http://host/api/person".into(),
            status: 502,
            message: String::new(),
            errors: vec![],
        };
        assert_eq!(err.to_string(), "http://host/api/person: status 502");
        assert_eq!(err.status(), Some(502));

        let err = Error::Api {
            url: "http://host/api/person".into(),
            status: 400,
            message: "Bad Request: unknown field".into(),
            errors: vec![],
        };
        assert_eq!(
            err.to_string(),
            "http://host/api/person: status 400: Bad Request: unknown field"
        );
    }
}
