//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use bookbyte_core::domain::{
    Book, BookUpdate, Event, NewBook, Paragraph, ParagraphWithBook, ReactionStats, TrackedEvent,
    UpsertOutcome, UserIdentifier,
};
use bookbyte_core::ports::{DatabaseService, PortError, PortResult};
use bookbyte_core::reactions::{EventType, ReactionFlags, ReactionPatch};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn user_row_id(&self, identifier: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM user_identifiers WHERE identifier = $1")
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound("UserIdentifier not found".to_string()))
    }

    async fn ensure_paragraph_exists(&self, paragraph_id: Uuid) -> PortResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM paragraphs WHERE id = $1)",
        )
        .bind(paragraph_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        if exists {
            Ok(())
        } else {
            Err(PortError::NotFound("Paragraph not found".to_string()))
        }
    }
}

//=========================================================================================
// Error Mapping Helpers
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found(what: &'static str) -> impl Fn(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("{} not found", what)),
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn conflict(message: &'static str) -> impl Fn(sqlx::Error) -> PortError {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(message.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn ensure_deleted(rows: u64, what: &'static str) -> PortResult<()> {
    if rows == 0 {
        Err(PortError::NotFound(format!("{} not found", what)))
    } else {
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    title: String,
    author: String,
    published_date: NaiveDate,
    language: String,
    source: String,
    created_at: DateTime<Utc>,
}
impl BookRecord {
    fn to_domain(self) -> Book {
        Book {
            id: self.id,
            title: self.title,
            author: self.author,
            published_date: self.published_date,
            language: self.language,
            source: self.source,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ParagraphRecord {
    id: Uuid,
    book_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
}
impl ParagraphRecord {
    fn to_domain(self) -> Paragraph {
        Paragraph {
            id: self.id,
            book_id: self.book_id,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ParagraphWithBookRecord {
    id: Uuid,
    book_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
    title: String,
    author: String,
    published_date: NaiveDate,
    language: String,
    source: String,
    book_created_at: DateTime<Utc>,
}
impl ParagraphWithBookRecord {
    fn to_domain(self) -> ParagraphWithBook {
        ParagraphWithBook {
            paragraph: Paragraph {
                id: self.id,
                book_id: self.book_id,
                content: self.content,
                created_at: self.created_at,
            },
            book: Book {
                id: self.book_id,
                title: self.title,
                author: self.author,
                published_date: self.published_date,
                language: self.language,
                source: self.source,
                created_at: self.book_created_at,
            },
        }
    }
}

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    identifier: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> UserIdentifier {
        UserIdentifier {
            id: self.id,
            identifier: self.identifier,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct EventRecord {
    id: Uuid,
    user_identifier: String,
    paragraph_id: Uuid,
    is_liked: bool,
    is_disliked: bool,
    is_hearted: bool,
    is_bookmarked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl EventRecord {
    fn to_domain(self) -> Event {
        Event {
            id: self.id,
            user_identifier: self.user_identifier,
            paragraph_id: self.paragraph_id,
            flags: ReactionFlags {
                is_liked: self.is_liked,
                is_disliked: self.is_disliked,
                is_hearted: self.is_hearted,
                is_bookmarked: self.is_bookmarked,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct UpsertRecord {
    id: Uuid,
    paragraph_id: Uuid,
    is_liked: bool,
    is_disliked: bool,
    is_hearted: bool,
    is_bookmarked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    inserted: bool,
}

#[derive(FromRow)]
struct StatsRecord {
    likes: i64,
    dislikes: i64,
    hearts: i64,
    bookmarks: i64,
}

#[derive(FromRow)]
struct TrackedEventRecord {
    id: Uuid,
    paragraph_id: Uuid,
    event_type: String,
    created_at: DateTime<Utc>,
}

const BOOK_COLUMNS: &str = "id, title, author, published_date, language, source, created_at";
const PARAGRAPH_COLUMNS: &str = "id, book_id, content, created_at";
const USER_COLUMNS: &str = "id, identifier, created_at";
const EVENT_SELECT: &str = "SELECT e.id, u.identifier AS user_identifier, e.paragraph_id, \
     e.is_liked, e.is_disliked, e.is_hearted, e.is_bookmarked, e.created_at, e.updated_at \
     FROM events e JOIN user_identifiers u ON u.id = e.user_id";
const PARAGRAPH_WITH_BOOK_SELECT: &str = "SELECT p.id, p.book_id, p.content, p.created_at, \
     b.title, b.author, b.published_date, b.language, b.source, b.created_at AS book_created_at \
     FROM paragraphs p JOIN books b ON b.id = p.book_id";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- User Identifiers ---

    async fn create_user_identifier(&self, identifier: &str) -> PortResult<UserIdentifier> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO user_identifiers (id, identifier) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(identifier)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict("UserIdentifier already exists"))?;
        Ok(record.to_domain())
    }

    async fn ensure_user_identifier(&self, identifier: &str) -> PortResult<UserIdentifier> {
        sqlx::query(
            "INSERT INTO user_identifiers (id, identifier) VALUES ($1, $2) \
             ON CONFLICT (identifier) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(identifier)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM user_identifiers WHERE identifier = $1"
        ))
        .bind(identifier)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found("UserIdentifier"))?;
        Ok(record.to_domain())
    }

    async fn list_user_identifiers(&self) -> PortResult<Vec<UserIdentifier>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM user_identifiers ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_user_identifier(&self, id: Uuid) -> PortResult<UserIdentifier> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM user_identifiers WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found("UserIdentifier"))?;
        Ok(record.to_domain())
    }

    async fn update_user_identifier(&self, id: Uuid, identifier: &str) -> PortResult<UserIdentifier> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE user_identifiers SET identifier = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(identifier)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict("Identifier already exists"))?
        .ok_or_else(|| PortError::NotFound("UserIdentifier not found".to_string()))?;
        Ok(record.to_domain())
    }

    async fn delete_user_identifier(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM user_identifiers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_deleted(result.rows_affected(), "UserIdentifier")
    }

    // --- Books ---

    async fn list_books(&self) -> PortResult<Vec<Book>> {
        let records = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_book(&self, id: Uuid) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found("Book"))?;
        Ok(record.to_domain())
    }

    async fn create_book(&self, book: NewBook) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "INSERT INTO books (id, title, author, published_date, language, source) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {BOOK_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.published_date)
        .bind(&book.language)
        .bind(&book.source)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict("Book with same title and author already exists"))?;
        Ok(record.to_domain())
    }

    async fn update_book(&self, id: Uuid, update: BookUpdate) -> PortResult<Book> {
        let current = self.get_book(id).await?;
        let merged = update.merge_into(&current);
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "UPDATE books SET title = $1, author = $2, published_date = $3, language = $4, \
             source = $5 WHERE id = $6 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&merged.title)
        .bind(&merged.author)
        .bind(merged.published_date)
        .bind(&merged.language)
        .bind(&merged.source)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict("Another book with same title and author already exists"))?;
        Ok(record.to_domain())
    }

    async fn delete_book(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_deleted(result.rows_affected(), "Book")
    }

    // --- Paragraphs ---

    async fn list_paragraphs(&self) -> PortResult<Vec<Paragraph>> {
        let records = sqlx::query_as::<_, ParagraphRecord>(&format!(
            "SELECT {PARAGRAPH_COLUMNS} FROM paragraphs ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_paragraph(&self, id: Uuid) -> PortResult<Paragraph> {
        let record = sqlx::query_as::<_, ParagraphRecord>(&format!(
            "SELECT {PARAGRAPH_COLUMNS} FROM paragraphs WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found("Paragraph"))?;
        Ok(record.to_domain())
    }

    async fn create_paragraph(&self, book_id: Uuid, content: &str) -> PortResult<Paragraph> {
        // Confirms the book first so a missing book is a 404 rather than an FK error.
        self.get_book(book_id).await?;
        let record = sqlx::query_as::<_, ParagraphRecord>(&format!(
            "INSERT INTO paragraphs (id, book_id, content) VALUES ($1, $2, $3) \
             RETURNING {PARAGRAPH_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(book_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_paragraph(&self, id: Uuid, content: &str) -> PortResult<Paragraph> {
        let record = sqlx::query_as::<_, ParagraphRecord>(&format!(
            "UPDATE paragraphs SET content = $1 WHERE id = $2 RETURNING {PARAGRAPH_COLUMNS}"
        ))
        .bind(content)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found("Paragraph"))?;
        Ok(record.to_domain())
    }

    async fn delete_paragraph(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM paragraphs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_deleted(result.rows_affected(), "Paragraph")
    }

    async fn count_paragraphs(&self) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM paragraphs")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn random_paragraphs(&self, limit: i64) -> PortResult<Vec<ParagraphWithBook>> {
        let records = sqlx::query_as::<_, ParagraphWithBookRecord>(&format!(
            "{PARAGRAPH_WITH_BOOK_SELECT} ORDER BY RANDOM() LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn paragraph_at_offset(&self, offset: i64) -> PortResult<Option<ParagraphWithBook>> {
        let record = sqlx::query_as::<_, ParagraphWithBookRecord>(&format!(
            "{PARAGRAPH_WITH_BOOK_SELECT} ORDER BY p.created_at, p.id OFFSET $1 LIMIT 1"
        ))
        .bind(offset)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn paragraph_stats(&self, paragraph_id: Uuid) -> PortResult<ReactionStats> {
        let record = sqlx::query_as::<_, StatsRecord>(
            "SELECT \
                COUNT(*) FILTER (WHERE is_liked) AS likes, \
                COUNT(*) FILTER (WHERE is_disliked) AS dislikes, \
                COUNT(*) FILTER (WHERE is_hearted) AS hearts, \
                COUNT(*) FILTER (WHERE is_bookmarked) AS bookmarks \
             FROM events WHERE paragraph_id = $1",
        )
        .bind(paragraph_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(ReactionStats {
            likes: record.likes,
            dislikes: record.dislikes,
            hearts: record.hearts,
            bookmarks: record.bookmarks,
        })
    }

    // --- Events ---

    async fn upsert_event(
        &self,
        identifier: &str,
        paragraph_id: Uuid,
        patch: ReactionPatch,
    ) -> PortResult<UpsertOutcome> {
        let user_id = self.user_row_id(identifier).await?;
        self.ensure_paragraph_exists(paragraph_id).await?;

        // `xmax = 0` is only true for a freshly inserted row.
        let record = sqlx::query_as::<_, UpsertRecord>(
            "INSERT INTO events (id, user_id, paragraph_id, is_liked, is_disliked, is_hearted, is_bookmarked) \
             VALUES ($1, $2, $3, COALESCE($4, FALSE), COALESCE($5, FALSE), COALESCE($6, FALSE), COALESCE($7, FALSE)) \
             ON CONFLICT (user_id, paragraph_id) DO UPDATE SET \
                is_liked = COALESCE($4, events.is_liked), \
                is_disliked = COALESCE($5, events.is_disliked), \
                is_hearted = COALESCE($6, events.is_hearted), \
                is_bookmarked = COALESCE($7, events.is_bookmarked), \
                updated_at = NOW() \
             RETURNING id, paragraph_id, is_liked, is_disliked, is_hearted, is_bookmarked, \
                created_at, updated_at, (xmax = 0) AS inserted",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(paragraph_id)
        .bind(patch.is_liked)
        .bind(patch.is_disliked)
        .bind(patch.is_hearted)
        .bind(patch.is_bookmarked)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(UpsertOutcome {
            event: Event {
                id: record.id,
                user_identifier: identifier.to_string(),
                paragraph_id: record.paragraph_id,
                flags: ReactionFlags {
                    is_liked: record.is_liked,
                    is_disliked: record.is_disliked,
                    is_hearted: record.is_hearted,
                    is_bookmarked: record.is_bookmarked,
                },
                created_at: record.created_at,
                updated_at: record.updated_at,
            },
            created: record.inserted,
        })
    }

    async fn find_event(&self, identifier: &str, paragraph_id: Uuid) -> PortResult<Option<Event>> {
        self.user_row_id(identifier).await?;
        self.ensure_paragraph_exists(paragraph_id).await?;

        let record = sqlx::query_as::<_, EventRecord>(&format!(
            "{EVENT_SELECT} WHERE u.identifier = $1 AND e.paragraph_id = $2"
        ))
        .bind(identifier)
        .bind(paragraph_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn list_events(&self) -> PortResult<Vec<Event>> {
        let records = sqlx::query_as::<_, EventRecord>(&format!(
            "{EVENT_SELECT} ORDER BY e.created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_event(&self, id: Uuid) -> PortResult<Event> {
        let record = sqlx::query_as::<_, EventRecord>(&format!("{EVENT_SELECT} WHERE e.id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("Event"))?;
        Ok(record.to_domain())
    }

    async fn update_event(&self, id: Uuid, patch: ReactionPatch) -> PortResult<Event> {
        let updated = sqlx::query(
            "UPDATE events SET \
                is_liked = COALESCE($1, is_liked), \
                is_disliked = COALESCE($2, is_disliked), \
                is_hearted = COALESCE($3, is_hearted), \
                is_bookmarked = COALESCE($4, is_bookmarked), \
                updated_at = NOW() \
             WHERE id = $5",
        )
        .bind(patch.is_liked)
        .bind(patch.is_disliked)
        .bind(patch.is_hearted)
        .bind(patch.is_bookmarked)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        ensure_deleted(updated.rows_affected(), "Event")?;
        self.get_event(id).await
    }

    async fn delete_event(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_deleted(result.rows_affected(), "Event")
    }

    // --- Tracked events ---

    async fn record_tracked_event(
        &self,
        identifier: &str,
        paragraph_id: Uuid,
        event_type: EventType,
    ) -> PortResult<TrackedEvent> {
        let user = self.ensure_user_identifier(identifier).await?;
        self.ensure_paragraph_exists(paragraph_id).await?;

        let record = sqlx::query_as::<_, TrackedEventRecord>(
            "INSERT INTO tracked_events (id, user_identifier_id, paragraph_id, event_type) \
             VALUES ($1, $2, $3, $4) RETURNING id, paragraph_id, event_type, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(paragraph_id)
        .bind(event_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let event_type = record
            .event_type
            .parse::<EventType>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(TrackedEvent {
            id: record.id,
            user_identifier: user.identifier,
            paragraph_id: record.paragraph_id,
            event_type,
            created_at: record.created_at,
        })
    }
}
