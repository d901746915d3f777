//! services/api/src/adapters/memory.rs
//!
//! A process-local implementation of the `DatabaseService` port. Selected with
//! `DATABASE_URL=memory://` and used by the router tests.

use async_trait::async_trait;
use bookbyte_core::domain::{
    Book, BookUpdate, Event, NewBook, Paragraph, ParagraphWithBook, ReactionStats, TrackedEvent,
    UpsertOutcome, UserIdentifier,
};
use bookbyte_core::ports::{DatabaseService, PortError, PortResult};
use bookbyte_core::reactions::{EventType, ReactionFlags, ReactionPatch};
use chrono::Utc;
use rand::seq::SliceRandom;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Rows are kept in insertion order, which doubles as `created_at` order.
#[derive(Default)]
struct Store {
    books: Vec<Book>,
    paragraphs: Vec<Paragraph>,
    users: Vec<UserIdentifier>,
    events: Vec<Event>,
    tracked: Vec<TrackedEvent>,
}

impl Store {
    fn book(&self, id: Uuid) -> PortResult<&Book> {
        self.books
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| PortError::NotFound("Book not found".to_string()))
    }

    fn paragraph(&self, id: Uuid) -> PortResult<&Paragraph> {
        self.paragraphs
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| PortError::NotFound("Paragraph not found".to_string()))
    }

    fn user_by_identifier(&self, identifier: &str) -> PortResult<&UserIdentifier> {
        self.users
            .iter()
            .find(|u| u.identifier == identifier)
            .ok_or_else(|| PortError::NotFound("UserIdentifier not found".to_string()))
    }

    fn event_mut(&mut self, id: Uuid) -> PortResult<&mut Event> {
        self.events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| PortError::NotFound("Event not found".to_string()))
    }

    fn with_book(&self, paragraph: &Paragraph) -> PortResult<ParagraphWithBook> {
        Ok(ParagraphWithBook {
            paragraph: paragraph.clone(),
            book: self.book(paragraph.book_id)?.clone(),
        })
    }

    fn has_duplicate_book(&self, title: &str, author: &str, except: Option<Uuid>) -> bool {
        self.books
            .iter()
            .any(|b| b.title == title && b.author == author && Some(b.id) != except)
    }
}

/// An in-memory `DatabaseService` guarded by a single `RwLock`.
#[derive(Default)]
pub struct InMemoryDb {
    store: RwLock<Store>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    // --- User Identifiers ---

    async fn create_user_identifier(&self, identifier: &str) -> PortResult<UserIdentifier> {
        let mut store = self.store.write().await;
        if store.users.iter().any(|u| u.identifier == identifier) {
            return Err(PortError::Conflict("UserIdentifier already exists".to_string()));
        }
        let user = UserIdentifier {
            id: Uuid::new_v4(),
            identifier: identifier.to_string(),
            created_at: Utc::now(),
        };
        store.users.push(user.clone());
        Ok(user)
    }

    async fn ensure_user_identifier(&self, identifier: &str) -> PortResult<UserIdentifier> {
        let mut store = self.store.write().await;
        if let Ok(user) = store.user_by_identifier(identifier) {
            return Ok(user.clone());
        }
        let user = UserIdentifier {
            id: Uuid::new_v4(),
            identifier: identifier.to_string(),
            created_at: Utc::now(),
        };
        store.users.push(user.clone());
        Ok(user)
    }

    async fn list_user_identifiers(&self) -> PortResult<Vec<UserIdentifier>> {
        Ok(self.store.read().await.users.clone())
    }

    async fn get_user_identifier(&self, id: Uuid) -> PortResult<UserIdentifier> {
        self.store
            .read()
            .await
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("UserIdentifier not found".to_string()))
    }

    async fn update_user_identifier(&self, id: Uuid, identifier: &str) -> PortResult<UserIdentifier> {
        let mut store = self.store.write().await;
        if !store.users.iter().any(|u| u.id == id) {
            return Err(PortError::NotFound("UserIdentifier not found".to_string()));
        }
        if store
            .users
            .iter()
            .any(|u| u.identifier == identifier && u.id != id)
        {
            return Err(PortError::Conflict("Identifier already exists".to_string()));
        }
        let previous = store
            .users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.identifier.clone())
            .unwrap_or_default();
        // Events reference users by identifier here, so follow the rename.
        for event in store.events.iter_mut().filter(|e| e.user_identifier == previous) {
            event.user_identifier = identifier.to_string();
        }
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| PortError::NotFound("UserIdentifier not found".to_string()))?;
        user.identifier = identifier.to_string();
        Ok(user.clone())
    }

    async fn delete_user_identifier(&self, id: Uuid) -> PortResult<()> {
        let mut store = self.store.write().await;
        let position = store
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| PortError::NotFound("UserIdentifier not found".to_string()))?;
        let removed = store.users.remove(position);
        store.events.retain(|e| e.user_identifier != removed.identifier);
        Ok(())
    }

    // --- Books ---

    async fn list_books(&self) -> PortResult<Vec<Book>> {
        Ok(self.store.read().await.books.clone())
    }

    async fn get_book(&self, id: Uuid) -> PortResult<Book> {
        self.store.read().await.book(id).cloned()
    }

    async fn create_book(&self, book: NewBook) -> PortResult<Book> {
        let mut store = self.store.write().await;
        if store.has_duplicate_book(&book.title, &book.author, None) {
            return Err(PortError::Conflict(
                "Book with same title and author already exists".to_string(),
            ));
        }
        let book = Book {
            id: Uuid::new_v4(),
            title: book.title,
            author: book.author,
            published_date: book.published_date,
            language: book.language,
            source: book.source,
            created_at: Utc::now(),
        };
        store.books.push(book.clone());
        Ok(book)
    }

    async fn update_book(&self, id: Uuid, update: BookUpdate) -> PortResult<Book> {
        let mut store = self.store.write().await;
        let merged = update.merge_into(store.book(id)?);
        if store.has_duplicate_book(&merged.title, &merged.author, Some(id)) {
            return Err(PortError::Conflict(
                "Another book with same title and author already exists".to_string(),
            ));
        }
        if let Some(slot) = store.books.iter_mut().find(|b| b.id == id) {
            *slot = merged.clone();
        }
        Ok(merged)
    }

    async fn delete_book(&self, id: Uuid) -> PortResult<()> {
        let mut store = self.store.write().await;
        store.book(id)?;
        store.books.retain(|b| b.id != id);
        let removed: Vec<Uuid> = store
            .paragraphs
            .iter()
            .filter(|p| p.book_id == id)
            .map(|p| p.id)
            .collect();
        store.paragraphs.retain(|p| p.book_id != id);
        store.events.retain(|e| !removed.contains(&e.paragraph_id));
        store.tracked.retain(|e| !removed.contains(&e.paragraph_id));
        Ok(())
    }

    // --- Paragraphs ---

    async fn list_paragraphs(&self) -> PortResult<Vec<Paragraph>> {
        Ok(self.store.read().await.paragraphs.clone())
    }

    async fn get_paragraph(&self, id: Uuid) -> PortResult<Paragraph> {
        self.store.read().await.paragraph(id).cloned()
    }

    async fn create_paragraph(&self, book_id: Uuid, content: &str) -> PortResult<Paragraph> {
        let mut store = self.store.write().await;
        store.book(book_id)?;
        let paragraph = Paragraph {
            id: Uuid::new_v4(),
            book_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        store.paragraphs.push(paragraph.clone());
        Ok(paragraph)
    }

    async fn update_paragraph(&self, id: Uuid, content: &str) -> PortResult<Paragraph> {
        let mut store = self.store.write().await;
        let paragraph = store
            .paragraphs
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| PortError::NotFound("Paragraph not found".to_string()))?;
        paragraph.content = content.to_string();
        Ok(paragraph.clone())
    }

    async fn delete_paragraph(&self, id: Uuid) -> PortResult<()> {
        let mut store = self.store.write().await;
        store.paragraph(id)?;
        store.paragraphs.retain(|p| p.id != id);
        store.events.retain(|e| e.paragraph_id != id);
        store.tracked.retain(|e| e.paragraph_id != id);
        Ok(())
    }

    async fn count_paragraphs(&self) -> PortResult<i64> {
        Ok(self.store.read().await.paragraphs.len() as i64)
    }

    async fn random_paragraphs(&self, limit: i64) -> PortResult<Vec<ParagraphWithBook>> {
        let store = self.store.read().await;
        let amount = usize::try_from(limit.max(0)).unwrap_or(0);
        let picked: Vec<&Paragraph> = store
            .paragraphs
            .choose_multiple(&mut rand::thread_rng(), amount)
            .collect();
        picked.into_iter().map(|p| store.with_book(p)).collect()
    }

    async fn paragraph_at_offset(&self, offset: i64) -> PortResult<Option<ParagraphWithBook>> {
        let store = self.store.read().await;
        let Ok(index) = usize::try_from(offset) else {
            return Ok(None);
        };
        store
            .paragraphs
            .get(index)
            .map(|p| store.with_book(p))
            .transpose()
    }

    async fn paragraph_stats(&self, paragraph_id: Uuid) -> PortResult<ReactionStats> {
        let store = self.store.read().await;
        let mut stats = ReactionStats::default();
        for event in store.events.iter().filter(|e| e.paragraph_id == paragraph_id) {
            stats.likes += i64::from(event.flags.is_liked);
            stats.dislikes += i64::from(event.flags.is_disliked);
            stats.hearts += i64::from(event.flags.is_hearted);
            stats.bookmarks += i64::from(event.flags.is_bookmarked);
        }
        Ok(stats)
    }

    // --- Events ---

    async fn upsert_event(
        &self,
        identifier: &str,
        paragraph_id: Uuid,
        patch: ReactionPatch,
    ) -> PortResult<UpsertOutcome> {
        let mut store = self.store.write().await;
        store.user_by_identifier(identifier)?;
        store.paragraph(paragraph_id)?;

        let now = Utc::now();
        if let Some(event) = store
            .events
            .iter_mut()
            .find(|e| e.user_identifier == identifier && e.paragraph_id == paragraph_id)
        {
            event.flags.apply(&patch);
            event.updated_at = now;
            return Ok(UpsertOutcome {
                event: event.clone(),
                created: false,
            });
        }

        let event = Event {
            id: Uuid::new_v4(),
            user_identifier: identifier.to_string(),
            paragraph_id,
            flags: ReactionFlags::default().applied(&patch),
            created_at: now,
            updated_at: now,
        };
        store.events.push(event.clone());
        Ok(UpsertOutcome {
            event,
            created: true,
        })
    }

    async fn find_event(&self, identifier: &str, paragraph_id: Uuid) -> PortResult<Option<Event>> {
        let store = self.store.read().await;
        store.user_by_identifier(identifier)?;
        store.paragraph(paragraph_id)?;
        Ok(store
            .events
            .iter()
            .find(|e| e.user_identifier == identifier && e.paragraph_id == paragraph_id)
            .cloned())
    }

    async fn list_events(&self) -> PortResult<Vec<Event>> {
        Ok(self.store.read().await.events.clone())
    }

    async fn get_event(&self, id: Uuid) -> PortResult<Event> {
        self.store
            .read()
            .await
            .events
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Event not found".to_string()))
    }

    async fn update_event(&self, id: Uuid, patch: ReactionPatch) -> PortResult<Event> {
        let mut store = self.store.write().await;
        let event = store.event_mut(id)?;
        event.flags.apply(&patch);
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn delete_event(&self, id: Uuid) -> PortResult<()> {
        let mut store = self.store.write().await;
        store.event_mut(id)?;
        store.events.retain(|e| e.id != id);
        Ok(())
    }

    // --- Tracked events ---

    async fn record_tracked_event(
        &self,
        identifier: &str,
        paragraph_id: Uuid,
        event_type: EventType,
    ) -> PortResult<TrackedEvent> {
        let user = self.ensure_user_identifier(identifier).await?;
        let mut store = self.store.write().await;
        store.paragraph(paragraph_id)?;
        let event = TrackedEvent {
            id: Uuid::new_v4(),
            user_identifier: user.identifier,
            paragraph_id,
            event_type,
            created_at: Utc::now(),
        };
        store.tracked.push(event.clone());
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn moby_dick() -> NewBook {
        NewBook {
            title: "Moby Dick".to_string(),
            author: "Herman Melville".to_string(),
            published_date: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
            language: "English".to_string(),
            source: "https://www.gutenberg.org/ebooks/2701".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_book_is_a_conflict() {
        let db = InMemoryDb::new();
        db.create_book(moby_dick()).await.unwrap();
        let err = db.create_book(moby_dick()).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn upsert_only_touches_provided_flags() {
        let db = InMemoryDb::new();
        let book = db.create_book(moby_dick()).await.unwrap();
        let paragraph = db.create_paragraph(book.id, "Call me Ishmael.").await.unwrap();
        db.create_user_identifier("reader").await.unwrap();

        let first = db
            .upsert_event(
                "reader",
                paragraph.id,
                ReactionPatch {
                    is_hearted: Some(true),
                    ..ReactionPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(first.created);

        let second = db
            .upsert_event(
                "reader",
                paragraph.id,
                ReactionPatch {
                    is_liked: Some(true),
                    ..ReactionPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.event.id, first.event.id);
        assert!(second.event.flags.is_hearted);
        assert!(second.event.flags.is_liked);

        let stats = db.paragraph_stats(paragraph.id).await.unwrap();
        assert_eq!(stats.likes, 1);
        assert_eq!(stats.hearts, 1);
        assert_eq!(stats.dislikes, 0);
    }

    #[tokio::test]
    async fn find_event_distinguishes_unknown_user_from_no_reaction() {
        let db = InMemoryDb::new();
        let book = db.create_book(moby_dick()).await.unwrap();
        let paragraph = db.create_paragraph(book.id, "Call me Ishmael.").await.unwrap();

        let err = db.find_event("ghost", paragraph.id).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));

        db.create_user_identifier("reader").await.unwrap();
        assert!(db.find_event("reader", paragraph.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_book_removes_its_paragraphs() {
        let db = InMemoryDb::new();
        let book = db.create_book(moby_dick()).await.unwrap();
        db.create_paragraph(book.id, "one").await.unwrap();
        db.create_paragraph(book.id, "two").await.unwrap();
        db.delete_book(book.id).await.unwrap();
        assert_eq!(db.count_paragraphs().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn random_paragraphs_are_distinct_and_capped() {
        let db = InMemoryDb::new();
        let book = db.create_book(moby_dick()).await.unwrap();
        for i in 0..3 {
            db.create_paragraph(book.id, &format!("paragraph {i}")).await.unwrap();
        }
        let picked = db.random_paragraphs(5).await.unwrap();
        assert_eq!(picked.len(), 3);
        let mut ids: Vec<Uuid> = picked.iter().map(|p| p.paragraph.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }
}
