//! Error types for outbound HTTP calls

use std::fmt;

use reqwest::StatusCode;

/// Result type alias for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while talking to a remote endpoint
#[derive(Debug)]
pub enum FetchError {
    /// The request could not be built (bad URL, invalid header, ...)
    Request(reqwest::Error),

    /// Connection failure or timeout
    Transport(reqwest::Error),

    /// The response body could not be read
    Body(reqwest::Error),

    /// The remote answered with an unexpected status code
    Status { status: StatusCode, body: String },

    /// The response body is not the JSON we expected
    Decode(serde_json::Error),

    /// The outgoing payload could not be serialized
    Encode(serde_json::Error),
}

impl FetchError {
    /// Whether the request ran into its timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Transport(err) | FetchError::Body(err) => err.is_timeout(),
            _ => false,
        }
    }

    /// HTTP status of the response, if one was received
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Request(err) => write!(f, "failed to build request: {}", err),
            FetchError::Transport(err) if err.is_timeout() => {
                write!(f, "request timed out: {}", err)
            }
            FetchError::Transport(err) => write!(f, "request failed: {}", err),
            FetchError::Body(err) => write!(f, "failed to read response body: {}", err),
            FetchError::Status { status, body } if body.is_empty() => {
                write!(f, "unexpected HTTP status {}", status)
            }
            FetchError::Status { status, body } => {
                write!(f, "unexpected HTTP status {}: {}", status, body)
            }
            FetchError::Decode(err) => write!(f, "failed to decode JSON: {}", err),
            FetchError::Encode(err) => write!(f, "failed to encode JSON: {}", err),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Request(err) | FetchError::Transport(err) | FetchError::Body(err) => {
                Some(err)
            }
            FetchError::Decode(err) | FetchError::Encode(err) => Some(err),
            FetchError::Status { .. } => None,
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err)
    }
}
