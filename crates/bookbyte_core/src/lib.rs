pub mod domain;
pub mod gutenberg;
pub mod metadata;
pub mod ports;
pub mod protocol;
pub mod reactions;
pub mod segmentation;

pub use domain::{
    Book, BookUpdate, Event, NewBook, Paragraph, ParagraphWithBook, ReactionStats, TrackedEvent,
    UpsertOutcome, UserIdentifier,
};
pub use metadata::{extract_book_metadata, parse_release_date, BookMetadata};
pub use ports::{DatabaseService, ParagraphSegmentationService, PortError, PortResult};
pub use reactions::{EventType, Reaction, ReactionFlags, ReactionPatch};
