//! Error types for session store operations.

/// Error type for session store operations.
///
/// A missing session is never an error: `get` returns `Ok(None)` and
/// `destroy`/`touch` on an unknown sid succeed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The endpoint could not be reached or its answer could not be decoded.
    #[error("Transport error: {0}")]
    Transport(#[source] postgrest_client::Error),

    /// The endpoint answered with a non-success status.
    #[error("Remote error ({status}, {code}): {message}")]
    Remote {
        status: u16,
        code: String,
        message: String,
    },

    /// A stored row's payload cannot be interpreted as a session.
    #[error("Malformed session record {sid}: {reason}")]
    MalformedRecord { sid: String, reason: String },

    /// A session could not be encoded for storage.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid store configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<postgrest_client::Error> for Error {
    fn from(err: postgrest_client::Error) -> Self {
        match err {
            postgrest_client::Error::Api {
                status,
                code,
                message,
            } => Error::Remote {
                status,
                code,
                message,
            },
            postgrest_client::Error::Config(message) => Error::Config(message),
            other => Error::Transport(other),
        }
    }
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
