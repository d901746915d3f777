//! Client side of BookByte: the reader's local identity, the REST client for
//! the backend, and the feed session built on top of both.

pub mod backend;
pub mod error;
pub mod feed;
pub mod identity;

pub use backend::{BackendClient, InteractionLookup, UserRegistration};
pub use error::ClientError;
pub use feed::{Feed, FeedCard, FeedStep, ReactionPanel, ToggleOutcome};
pub use identity::{FileStorage, IdentityError, IdentityStorage, IdentityStore, MemoryStorage};
