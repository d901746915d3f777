//! crates/bookbyte_client/src/error.rs

use thiserror::Error;

/// Errors returned by [`crate::BackendClient`] and the feed built on it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {message}")]
    Http { status: u16, message: String },

    /// The backend has no paragraphs to serve.
    #[error("No paragraphs available")]
    NoParagraphs,

    /// The request never produced a usable response (connect, timeout, body decode).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
