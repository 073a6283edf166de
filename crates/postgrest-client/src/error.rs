//! Client error types.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint returned a non-success response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code reported by the endpoint (e.g. a SQLSTATE).
        code: String,
        /// Error message reported by the endpoint.
        message: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if the endpoint answered at all.
    pub fn is_transport(&self) -> bool {
        !matches!(self, Error::Api { .. } | Error::Config(_))
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Api { status: 401 | 403, .. })
    }

    /// Check if this is a uniqueness/constraint violation.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Api { status: 409, .. })
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error body returned by PostgREST.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let conflict = Error::Api {
            status: 409,
            code: "23505".to_string(),
            message: "duplicate key".to_string(),
        };
        assert!(conflict.is_conflict());
        assert!(!conflict.is_transport());
        assert!(!conflict.is_server_error());
        assert!(!conflict.is_auth_error());

        for status in [401, 403] {
            let auth = Error::Api {
                status,
                code: "PGRST301".to_string(),
                message: "JWT expired".to_string(),
            };
            assert!(auth.is_auth_error());
            assert!(!auth.is_conflict());
        }

        let config = Error::Config("bad header".to_string());
        assert!(!config.is_transport());

        let json = Error::Json(serde_json::from_str::<u8>("x").unwrap_err());
        assert!(json.is_transport());
    }
}
