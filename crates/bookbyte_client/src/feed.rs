//! crates/bookbyte_client/src/feed.rs
//!
//! The reader's feed session: an append-only list of paragraph cards, each
//! with its own reaction panel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bookbyte_core::protocol::{EventUpsertPayload, FeedParagraph};
use bookbyte_core::reactions::{Reaction, ReactionFlags};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::BackendClient;
use crate::error::{ClientError, Result};

/// What one call to [`Feed::load_next`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStep {
    /// A card was appended at this index.
    Loaded(usize),
    /// The backend has nothing left to serve.
    Exhausted,
}

pub struct FeedCard {
    pub paragraph: FeedParagraph,
    pub reactions: ReactionPanel,
}

pub struct Feed {
    client: Arc<BackendClient>,
    user_id: String,
    cards: Vec<FeedCard>,
    has_more: bool,
}

impl Feed {
    /// Starts a session for `user_id`, registering the identifier first.
    /// A failed registration is logged and the session continues.
    pub async fn start(client: Arc<BackendClient>, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        match client.create_user(&user_id).await {
            Ok(registration) => debug!(?registration, "Reader registered"),
            Err(e) => warn!("Could not register reader: {}", e),
        }
        Self {
            client,
            user_id,
            cards: Vec::new(),
            has_more: true,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn cards(&self) -> &[FeedCard] {
        &self.cards
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Fetches one more paragraph and appends it as a card.
    ///
    /// Once the backend reports no paragraphs the feed stays exhausted and no
    /// further requests are made.
    pub async fn load_next(&mut self) -> Result<FeedStep> {
        if !self.has_more {
            return Ok(FeedStep::Exhausted);
        }

        let paragraph = match self.client.random_paragraph(Some(&self.user_id)).await {
            Ok(paragraph) => paragraph,
            Err(ClientError::NoParagraphs) => {
                info!("No more paragraphs to load");
                self.has_more = false;
                return Ok(FeedStep::Exhausted);
            }
            Err(e) => return Err(e),
        };

        let flags = match paragraph.user_interactions {
            Some(flags) => flags,
            None => match self
                .client
                .interaction_for_paragraph(&self.user_id, paragraph.paragraph_id)
                .await
            {
                Ok(lookup) => lookup.flags(),
                Err(e) => {
                    warn!("Could not load reactions, showing none: {}", e);
                    ReactionFlags::default()
                }
            },
        };

        let reactions = ReactionPanel::new(
            self.client.clone(),
            self.user_id.clone(),
            paragraph.paragraph_id,
            paragraph.content.clone(),
            flags,
        );
        self.cards.push(FeedCard {
            paragraph,
            reactions,
        });
        Ok(FeedStep::Loaded(self.cards.len() - 1))
    }
}

//=========================================================================================
// Reaction Panel
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The backend accepted the change; these are the flags now shown.
    Applied(ReactionFlags),
    /// Another toggle on this panel was still in flight.
    Dropped,
}

/// Clears the in-flight flag however the request ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The four reaction toggles for one paragraph.
///
/// Local flags change only after the backend confirms a write, and at most one
/// write is in flight at a time.
pub struct ReactionPanel {
    client: Arc<BackendClient>,
    user_id: String,
    paragraph_id: Uuid,
    content: String,
    flags: Mutex<ReactionFlags>,
    in_flight: AtomicBool,
}

impl ReactionPanel {
    pub fn new(
        client: Arc<BackendClient>,
        user_id: String,
        paragraph_id: Uuid,
        content: String,
        flags: ReactionFlags,
    ) -> Self {
        Self {
            client,
            user_id,
            paragraph_id,
            content,
            flags: Mutex::new(flags),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn paragraph_id(&self) -> Uuid {
        self.paragraph_id
    }

    pub fn flags(&self) -> ReactionFlags {
        self.flags.lock().map(|f| *f).unwrap_or_default()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn toggle(&self, reaction: Reaction) -> Result<ToggleOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(?reaction, "Toggle dropped while another is in flight");
            return Ok(ToggleOutcome::Dropped);
        }
        let _guard = InFlight(&self.in_flight);

        let patch = self.flags().toggle(reaction);
        self.client
            .create_or_update_event(&EventUpsertPayload {
                user_id: self.user_id.clone(),
                paragraph_id: self.paragraph_id,
                patch,
            })
            .await?;

        let mut flags = self.flags.lock().map(|f| *f).unwrap_or_default();
        flags.apply(&patch);
        if let Ok(mut slot) = self.flags.lock() {
            *slot = flags;
        }
        Ok(ToggleOutcome::Applied(flags))
    }

    /// The paragraph text, for the clipboard.
    pub fn copy(&self) -> &str {
        &self.content
    }
}
