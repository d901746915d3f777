//! crates/bookbyte_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or LLM APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Book, BookUpdate, Event, NewBook, Paragraph, ParagraphWithBook, ReactionStats, TrackedEvent,
    UpsertOutcome, UserIdentifier,
};
use crate::reactions::{EventType, ReactionPatch};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid data: {0}")]
    InvalidInput(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Identifiers ---
    async fn create_user_identifier(&self, identifier: &str) -> PortResult<UserIdentifier>;

    /// Returns the row for `identifier`, inserting it first when missing.
    async fn ensure_user_identifier(&self, identifier: &str) -> PortResult<UserIdentifier>;

    async fn list_user_identifiers(&self) -> PortResult<Vec<UserIdentifier>>;

    async fn get_user_identifier(&self, id: Uuid) -> PortResult<UserIdentifier>;

    async fn update_user_identifier(&self, id: Uuid, identifier: &str) -> PortResult<UserIdentifier>;

    async fn delete_user_identifier(&self, id: Uuid) -> PortResult<()>;

    // --- Books ---
    async fn list_books(&self) -> PortResult<Vec<Book>>;

    async fn get_book(&self, id: Uuid) -> PortResult<Book>;

    /// Fails with `Conflict` when a book with the same title and author exists.
    async fn create_book(&self, book: NewBook) -> PortResult<Book>;

    async fn update_book(&self, id: Uuid, update: BookUpdate) -> PortResult<Book>;

    /// Deletes the book together with its paragraphs.
    async fn delete_book(&self, id: Uuid) -> PortResult<()>;

    // --- Paragraphs ---
    async fn list_paragraphs(&self) -> PortResult<Vec<Paragraph>>;

    async fn get_paragraph(&self, id: Uuid) -> PortResult<Paragraph>;

    async fn create_paragraph(&self, book_id: Uuid, content: &str) -> PortResult<Paragraph>;

    async fn update_paragraph(&self, id: Uuid, content: &str) -> PortResult<Paragraph>;

    async fn delete_paragraph(&self, id: Uuid) -> PortResult<()>;

    async fn count_paragraphs(&self) -> PortResult<i64>;

    /// Up to `limit` distinct paragraphs picked uniformly at random.
    async fn random_paragraphs(&self, limit: i64) -> PortResult<Vec<ParagraphWithBook>>;

    /// The paragraph at position `offset` in a stable ordering.
    async fn paragraph_at_offset(&self, offset: i64) -> PortResult<Option<ParagraphWithBook>>;

    async fn paragraph_stats(&self, paragraph_id: Uuid) -> PortResult<ReactionStats>;

    // --- Events ---
    /// Creates or updates the event for (identifier, paragraph), writing only
    /// the flags present in `patch`.
    async fn upsert_event(
        &self,
        identifier: &str,
        paragraph_id: Uuid,
        patch: ReactionPatch,
    ) -> PortResult<UpsertOutcome>;

    /// `NotFound` when the user or paragraph is unknown, `Ok(None)` when
    /// both exist but no reaction was recorded yet.
    async fn find_event(&self, identifier: &str, paragraph_id: Uuid) -> PortResult<Option<Event>>;

    async fn list_events(&self) -> PortResult<Vec<Event>>;

    async fn get_event(&self, id: Uuid) -> PortResult<Event>;

    async fn update_event(&self, id: Uuid, patch: ReactionPatch) -> PortResult<Event>;

    async fn delete_event(&self, id: Uuid) -> PortResult<()>;

    // --- Tracked events ---
    async fn record_tracked_event(
        &self,
        identifier: &str,
        paragraph_id: Uuid,
        event_type: EventType,
    ) -> PortResult<TrackedEvent>;
}

#[async_trait]
pub trait ParagraphSegmentationService: Send + Sync {
    /// Splits cleaned book text into reader-sized paragraphs.
    async fn segment(&self, text: &str) -> PortResult<Vec<String>>;
}
