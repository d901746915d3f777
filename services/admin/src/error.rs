//! services/admin/src/error.rs
//!
//! Error types for the `bookbyte` tool.

use crate::config::ConfigError;
use bookbyte_client::{ClientError, IdentityError};
use bookbyte_core::gutenberg::SourceUrlError;
use bookbyte_core::ports::PortError;
use uuid::Uuid;

/// Failures of the ingestion flow, in the order the steps run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    SourceUrl(#[from] SourceUrlError),

    #[error("Failed to fetch book: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Failed to fetch book: {status} {reason}")]
    FetchStatus { status: u16, reason: String },

    #[error("Received invalid or empty book content ({0} characters)")]
    TooShort(usize),

    #[error("Book fetched but its metadata could not be extracted")]
    MissingMetadata,

    #[error("This book already exists in the database (ID: {0}). Cannot add duplicate books.")]
    Duplicate(Uuid),

    #[error("Paragraph segmentation is not configured: {0}")]
    SegmenterUnavailable(String),

    #[error("Segmentation failed: {0}")]
    Segmentation(#[from] PortError),

    #[error("Backend request failed: {0}")]
    Backend(#[from] ClientError),
}

/// The top-level error type for the `bookbyte` binary.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Backend error: {0}")]
    Client(#[from] ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
