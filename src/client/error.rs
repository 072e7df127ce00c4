//! Error types for the flags SDK.

use thiserror::Error;

/// Errors surfaced by [`FlagsClient`](super::FlagsClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// A required constructor option was empty.
    #[error("{0} is required")]
    MissingOption(&'static str),

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The first config fetch failed; no client was created.
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    /// `evaluate_flag` was called with an empty flag key.
    #[error("flagKey is required")]
    MissingFlagKey,

    /// `evaluate_flag` was called with an actor that has no id.
    #[error("actor with a non-empty id is required")]
    MissingActor,
}

/// Failure of the initial config fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InitializationError {
    /// Server-reported `error`, or a description of the transport failure.
    pub message: String,
    /// Server-reported `code`, or `NETWORK_ERROR` / `HTTP_ERROR` / `INVALID_RESPONSE`.
    pub code: String,
    /// HTTP status when a response was received.
    pub status_code: Option<u16>,
}

/// Failure of a single config fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No response was received.
    #[error("Failed to reach flag server: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http {
        status: u16,
        code: String,
        message: String,
    },

    /// A 2xx response whose body was not a config list.
    #[error("Invalid config response: {0}")]
    InvalidResponse(String),
}

impl From<FetchError> for InitializationError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Network(_) => InitializationError {
                message: err.to_string(),
                code: "NETWORK_ERROR".to_string(),
                status_code: None,
            },
            FetchError::Http {
                status,
                code,
                message,
            } => InitializationError {
                message,
                code,
                status_code: Some(status),
            },
            FetchError::InvalidResponse(_) => InitializationError {
                message: err.to_string(),
                code: "INVALID_RESPONSE".to_string(),
                status_code: None,
            },
        }
    }
}

impl From<FetchError> for ClientError {
    fn from(err: FetchError) -> Self {
        ClientError::Initialization(err.into())
    }
}
