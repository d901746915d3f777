//! crates/bookbyte_client/src/backend.rs
//!
//! A thin `reqwest` client for the BookByte REST backend. Each method issues
//! exactly one request; nothing is retried.

use bookbyte_core::protocol::{
    BookPayload, BookResponse, CreatedResponse, ErrorBody, EventResponse, EventUpsertPayload,
    EventUpsertResponse, FeedParagraph, FunctionParagraphResponse, InteractionResponse,
    ParagraphPayload, ParagraphResponse, TrackEventPayload, TrackEventResponse, UserPayload,
};
use bookbyte_core::reactions::{EventType, ReactionFlags, ReactionPatch};
use rand::Rng;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ClientError, Result};

/// Outcome of registering an identifier with the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRegistration {
    Created(Uuid),
    AlreadyExists,
}

/// What the backend knows about one reader's reactions to one paragraph.
#[derive(Debug, Clone)]
pub enum InteractionLookup {
    Recorded(InteractionResponse),
    /// The backend answered, and there is nothing stored for the pair.
    NotRecorded,
    /// The backend could not be reached.
    Unreachable(String),
}

impl InteractionLookup {
    /// The flags to display. Anything but a stored row reads as all-false.
    pub fn flags(&self) -> ReactionFlags {
        match self {
            InteractionLookup::Recorded(found) => found.flags,
            InteractionLookup::NotRecorded | InteractionLookup::Unreachable(_) => {
                ReactionFlags::default()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    //=====================================================================================
    // Users
    //=====================================================================================

    /// Registers `identifier`. An identifier the backend already knows is not an error.
    pub async fn create_user(&self, identifier: &str) -> Result<UserRegistration> {
        let resp = self
            .http
            .post(self.url("/users/"))
            .json(&UserPayload {
                identifier: identifier.to_string(),
            })
            .send()
            .await?;

        if resp.status() == StatusCode::BAD_REQUEST {
            let err = http_error(resp, "Failed to create user").await;
            if let ClientError::Http { message, .. } = &err {
                if message.contains("already exists") {
                    debug!("Identifier already registered");
                    return Ok(UserRegistration::AlreadyExists);
                }
            }
            return Err(err);
        }
        let created: CreatedResponse = read_json(resp, "Failed to create user").await?;
        Ok(UserRegistration::Created(created.id))
    }

    //=====================================================================================
    // Paragraphs & Books
    //=====================================================================================

    /// One paragraph picked at random from a page of the feed.
    pub async fn random_paragraph(&self, user_id: Option<&str>) -> Result<FeedParagraph> {
        let mut request = self.http.get(self.url("/paragraphs/random/"));
        if let Some(user_id) = user_id {
            request = request.query(&[("user_id", user_id)]);
        }
        let resp = request.send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NoParagraphs);
        }

        let mut page: Vec<FeedParagraph> =
            read_json(resp, "Failed to fetch random paragraph").await?;
        if page.is_empty() {
            return Err(ClientError::NoParagraphs);
        }
        let index = rand::thread_rng().gen_range(0..page.len());
        Ok(page.swap_remove(index))
    }

    pub async fn get_paragraph(&self, paragraph_id: Uuid) -> Result<ParagraphResponse> {
        let resp = self
            .http
            .get(self.url(&format!("/paragraphs/{}/", paragraph_id)))
            .send()
            .await?;
        read_json(resp, "Failed to fetch paragraph").await
    }

    pub async fn list_books(&self) -> Result<Vec<BookResponse>> {
        let resp = self.http.get(self.url("/books/")).send().await?;
        read_json(resp, "Failed to fetch books").await
    }

    /// Creates a book and returns its id.
    pub async fn create_book(&self, book: &BookPayload) -> Result<Uuid> {
        let resp = self.http.post(self.url("/books/")).json(book).send().await?;
        let created: CreatedResponse = read_json(resp, "Failed to create book").await?;
        Ok(created.id)
    }

    /// Creates a paragraph and returns its id.
    pub async fn create_paragraph(&self, book_id: Uuid, content: &str) -> Result<Uuid> {
        let resp = self
            .http
            .post(self.url("/paragraphs/"))
            .json(&ParagraphPayload {
                book_id,
                content: content.to_string(),
            })
            .send()
            .await?;
        let created: CreatedResponse = read_json(resp, "Failed to create paragraph").await?;
        Ok(created.id)
    }

    //=====================================================================================
    // Events
    //=====================================================================================

    pub async fn create_or_update_event(
        &self,
        event: &EventUpsertPayload,
    ) -> Result<EventUpsertResponse> {
        let resp = self.http.post(self.url("/events/")).json(event).send().await?;
        read_json(resp, "Failed to create/update event").await
    }

    /// Looks up the reader's flags for a paragraph.
    ///
    /// A 404 or an empty record is `NotRecorded`, and a transport failure is
    /// `Unreachable`; neither is an error. Other non-success statuses are.
    pub async fn interaction_for_paragraph(
        &self,
        user_id: &str,
        paragraph_id: Uuid,
    ) -> Result<InteractionLookup> {
        let url = self.url(&format!(
            "/events/user/{}/paragraph/{}/",
            user_id, paragraph_id
        ));
        let resp = match self.http.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(%paragraph_id, "Interaction lookup failed: {}", e);
                return Ok(InteractionLookup::Unreachable(e.to_string()));
            }
        };
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(InteractionLookup::NotRecorded);
        }

        let found: InteractionResponse = read_json(resp, "Failed to fetch interaction").await?;
        Ok(match found.id {
            Some(_) => InteractionLookup::Recorded(found),
            None => InteractionLookup::NotRecorded,
        })
    }

    pub async fn list_events(&self) -> Result<Vec<EventResponse>> {
        let resp = self.http.get(self.url("/events/")).send().await?;
        read_json(resp, "Failed to fetch events").await
    }

    pub async fn get_event(&self, event_id: Uuid) -> Result<EventResponse> {
        let resp = self
            .http
            .get(self.url(&format!("/events/{}/", event_id)))
            .send()
            .await?;
        read_json(resp, "Failed to fetch event").await
    }

    pub async fn update_event(&self, event_id: Uuid, patch: &ReactionPatch) -> Result<()> {
        let resp = self
            .http
            .put(self.url(&format!("/events/{}/", event_id)))
            .json(patch)
            .send()
            .await?;
        ensure_success(resp, "Failed to update event").await
    }

    pub async fn delete_event(&self, event_id: Uuid) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(&format!("/events/{}/", event_id)))
            .send()
            .await?;
        ensure_success(resp, "Failed to delete event").await
    }

    //=====================================================================================
    // Function Endpoints
    //=====================================================================================

    pub async fn track_event(
        &self,
        user_id: &str,
        paragraph_id: Uuid,
        event_type: EventType,
    ) -> Result<TrackEventResponse> {
        let resp = self
            .http
            .post(self.url("/functions/track-event"))
            .json(&TrackEventPayload {
                user_id: Some(user_id.to_string()),
                paragraph_id: Some(paragraph_id.to_string()),
                event_type: Some(event_type.as_str().to_string()),
            })
            .send()
            .await?;
        read_json(resp, "Failed to track event").await
    }

    pub async fn function_random_paragraph(&self) -> Result<FunctionParagraphResponse> {
        let resp = self
            .http
            .get(self.url("/functions/random-paragraph"))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NoParagraphs);
        }
        read_json(resp, "Failed to fetch random paragraph").await
    }
}

//=========================================================================================
// Response Helpers
//=========================================================================================

async fn read_json<T: DeserializeOwned>(resp: Response, fallback: &str) -> Result<T> {
    if !resp.status().is_success() {
        return Err(http_error(resp, fallback).await);
    }
    Ok(resp.json::<T>().await?)
}

async fn ensure_success(resp: Response, fallback: &str) -> Result<()> {
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(http_error(resp, fallback).await)
    }
}

/// Builds an `Http` error, preferring the backend's `{"error": ...}` message,
/// then the raw body, then `fallback`.
async fn http_error(resp: Response, fallback: &str) -> ClientError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => fallback.to_string(),
    };
    ClientError::Http { status, message }
}
