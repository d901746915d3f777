//! crates/bookbyte_core/src/protocol.rs
//!
//! JSON payloads exchanged between the REST backend and its clients.
//! Both the `api` service and the client library speak these types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::{Book, Event, Paragraph, ParagraphWithBook, ReactionStats, TrackedEvent, UserIdentifier};
use crate::reactions::{EventType, ReactionFlags, ReactionPatch};

//=========================================================================================
// Generic Bodies
//=========================================================================================

/// Body of every non-success response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Returned by every create endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedResponse {
    pub id: Uuid,
    pub message: String,
}

//=========================================================================================
// Books
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookPayload {
    pub title: String,
    pub author: String,
    pub published_date: NaiveDate,
    pub language: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BookUpdatePayload {
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub language: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub published_date: NaiveDate,
    pub language: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            published_date: book.published_date,
            language: book.language,
            source: book.source,
            created_at: book.created_at,
        }
    }
}

//=========================================================================================
// Paragraphs
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParagraphPayload {
    pub book_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ParagraphUpdatePayload {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParagraphResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Paragraph> for ParagraphResponse {
    fn from(p: Paragraph) -> Self {
        Self {
            id: p.id,
            book_id: p.book_id,
            content: p.content,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct RandomParagraphQuery {
    /// The reader's identifier; when known, their own flags are included.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookSummary {
    pub book_id: Uuid,
    pub title: String,
    pub author: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReactionStatsBody {
    pub likes: i64,
    pub dislikes: i64,
    pub hearts: i64,
    pub bookmarks: i64,
}

impl From<ReactionStats> for ReactionStatsBody {
    fn from(s: ReactionStats) -> Self {
        Self {
            likes: s.likes,
            dislikes: s.dislikes,
            hearts: s.hearts,
            bookmarks: s.bookmarks,
        }
    }
}

/// One entry of the random-paragraph feed response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedParagraph {
    pub paragraph_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub book: BookSummary,
    #[serde(default)]
    pub stats: ReactionStatsBody,
    #[serde(default)]
    pub user_interactions: Option<ReactionFlags>,
}

impl FeedParagraph {
    pub fn new(
        item: ParagraphWithBook,
        stats: ReactionStats,
        user_interactions: Option<ReactionFlags>,
    ) -> Self {
        Self {
            paragraph_id: item.paragraph.id,
            content: item.paragraph.content,
            created_at: item.paragraph.created_at,
            book: BookSummary {
                book_id: item.book.id,
                title: item.book.title,
                author: item.book.author,
            },
            stats: stats.into(),
            user_interactions,
        }
    }
}

//=========================================================================================
// Users
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPayload {
    pub identifier: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserUpdatePayload {
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub identifier: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserIdentifier> for UserResponse {
    fn from(u: UserIdentifier) -> Self {
        Self {
            id: u.id,
            identifier: u.identifier,
            created_at: u.created_at,
        }
    }
}

//=========================================================================================
// Events
//=========================================================================================

/// Create-or-update request for a (user, paragraph) reaction row.
/// `user_id` is the reader's identifier string.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventUpsertPayload {
    pub user_id: String,
    pub paragraph_id: Uuid,
    #[serde(flatten)]
    pub patch: ReactionPatch,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventUpsertResponse {
    pub id: Uuid,
    pub message: String,
    #[serde(flatten)]
    pub flags: ReactionFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    pub user_id: String,
    pub paragraph_id: Uuid,
    #[serde(flatten)]
    pub flags: ReactionFlags,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            user_id: e.user_identifier,
            paragraph_id: e.paragraph_id,
            flags: e.flags,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// A reader's flags for one paragraph. `id` and the timestamps are absent
/// when no reaction has been recorded yet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InteractionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: String,
    pub paragraph_id: Uuid,
    #[serde(flatten)]
    pub flags: ReactionFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl InteractionResponse {
    pub fn empty(user_id: String, paragraph_id: Uuid) -> Self {
        Self {
            id: None,
            user_id,
            paragraph_id,
            flags: ReactionFlags::default(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl From<Event> for InteractionResponse {
    fn from(e: Event) -> Self {
        Self {
            id: Some(e.id),
            user_id: e.user_identifier,
            paragraph_id: e.paragraph_id,
            flags: e.flags,
            created_at: Some(e.created_at),
            updated_at: Some(e.updated_at),
        }
    }
}

//=========================================================================================
// Function Endpoints
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FunctionBook {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub language: String,
}

/// A single paragraph picked by random offset.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FunctionParagraphResponse {
    pub id: Uuid,
    pub text: String,
    pub book: FunctionBook,
}

impl From<ParagraphWithBook> for FunctionParagraphResponse {
    fn from(item: ParagraphWithBook) -> Self {
        Self {
            id: item.paragraph.id,
            text: item.paragraph.content,
            book: FunctionBook {
                id: item.book.id,
                title: item.book.title,
                author: item.book.author,
                language: item.book.language,
            },
        }
    }
}

/// Every field is optional so that missing fields get a descriptive 400.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TrackEventPayload {
    pub user_id: Option<String>,
    pub paragraph_id: Option<String>,
    pub event_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackedEventBody {
    pub id: Uuid,
    pub user_identifier: String,
    pub paragraph_id: Uuid,
    pub event_type: EventType,
    pub created_at: DateTime<Utc>,
}

impl From<TrackedEvent> for TrackedEventBody {
    fn from(e: TrackedEvent) -> Self {
        Self {
            id: e.id,
            user_identifier: e.user_identifier,
            paragraph_id: e.paragraph_id,
            event_type: e.event_type,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackEventResponse {
    pub success: bool,
    pub event: TrackedEventBody,
}
