//! crates/bookbyte_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or wire format.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::reactions::{EventType, ReactionFlags};

/// A public-domain book that paragraphs are served from.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub published_date: NaiveDate,
    pub language: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// The fields needed to store a new book.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub published_date: NaiveDate,
    pub language: String,
    pub source: String,
}

/// A partial update of a stored book. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub language: Option<String>,
    pub source: Option<String>,
}

impl BookUpdate {
    /// Applies the update on top of `book`, returning the merged record.
    pub fn merge_into(self, book: &Book) -> Book {
        Book {
            id: book.id,
            title: self.title.unwrap_or_else(|| book.title.clone()),
            author: self.author.unwrap_or_else(|| book.author.clone()),
            published_date: self.published_date.unwrap_or(book.published_date),
            language: self.language.unwrap_or_else(|| book.language.clone()),
            source: self.source.unwrap_or_else(|| book.source.clone()),
            created_at: book.created_at,
        }
    }
}

/// A single paragraph of a book.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub id: Uuid,
    pub book_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A paragraph joined with the book it belongs to.
#[derive(Debug, Clone)]
pub struct ParagraphWithBook {
    pub paragraph: Paragraph,
    pub book: Book,
}

// The server-side row behind a pseudonymous client identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct UserIdentifier {
    pub id: Uuid,
    pub identifier: String,
    pub created_at: DateTime<Utc>,
}

/// The per-user, per-paragraph reaction record.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub user_identifier: String,
    pub paragraph_id: Uuid,
    pub flags: ReactionFlags,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of an event upsert: the stored record and whether it was new.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub event: Event,
    pub created: bool,
}

/// Aggregate reaction counts for one paragraph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactionStats {
    pub likes: i64,
    pub dislikes: i64,
    pub hearts: i64,
    pub bookmarks: i64,
}

/// An append-only reaction log entry recorded by the track-event endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEvent {
    pub id: Uuid,
    pub user_identifier: String,
    pub paragraph_id: Uuid,
    pub event_type: EventType,
    pub created_at: DateTime<Utc>,
}
