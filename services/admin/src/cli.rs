//! services/admin/src/cli.rs
//!
//! The `bookbyte` command line: identity management, book ingestion and a
//! terminal rendition of the reader feed.

use std::path::PathBuf;
use std::sync::Arc;

use async_openai::{config::OpenAIConfig, Client};
use bookbyte_client::{
    BackendClient, Feed, FeedStep, FileStorage, IdentityError, IdentityStore, ReactionPanel,
    ToggleOutcome,
};
use bookbyte_core::reactions::{EventType, Reaction, ReactionFlags};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;
use uuid::Uuid;

use crate::adapters::OpenAiSegmentationAdapter;
use crate::config::AdminConfig;
use crate::error::AdminError;
use crate::ingest::{IngestOutcome, IngestionFlow};

#[derive(Parser, Debug)]
#[command(name = "bookbyte")]
#[command(about = "BookByte reader and admin tool")]
#[command(
    after_help = "Environment:\n  BACKEND_URL             REST backend base URL\n  GUTENBERG_BASE_URL      Where Gutenberg texts are fetched from\n  OPENAI_API_KEY          Needed by `ingest` unless --fetch-only\n  BOOKBYTE_IDENTITY_PATH  Explicit identity file"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show, back up, restore or forget this device's reader identifier.
    Identity {
        #[command(subcommand)]
        command: IdentityCommand,
    },
    /// Fetch a Project Gutenberg book, segment it and store it.
    Ingest {
        /// A gutenberg.org book page or plain-text URL.
        url: String,
        /// Stop after reading the metadata and checking for duplicates.
        #[arg(long, default_value_t = false)]
        fetch_only: bool,
    },
    /// Print random paragraphs with their reactions.
    Feed {
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// Toggle a reaction on a paragraph.
    React {
        paragraph_id: Uuid,
        #[arg(value_enum)]
        reaction: ReactionArg,
    },
}

#[derive(Subcommand, Debug)]
pub enum IdentityCommand {
    Show,
    Export {
        /// Write `bookbyte-user-id-YYYY-MM-DD.txt` into this directory.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    Import {
        value: Option<String>,
        #[arg(long, conflicts_with = "value")]
        file: Option<PathBuf>,
    },
    Clear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReactionArg {
    Like,
    Dislike,
    Heart,
    Bookmark,
}

impl From<ReactionArg> for Reaction {
    fn from(arg: ReactionArg) -> Self {
        match arg {
            ReactionArg::Like => Reaction::Like,
            ReactionArg::Dislike => Reaction::Dislike,
            ReactionArg::Heart => Reaction::Heart,
            ReactionArg::Bookmark => Reaction::Bookmark,
        }
    }
}

impl From<ReactionArg> for EventType {
    fn from(arg: ReactionArg) -> Self {
        match arg {
            ReactionArg::Like => EventType::Like,
            ReactionArg::Dislike => EventType::Dislike,
            ReactionArg::Heart => EventType::Heart,
            ReactionArg::Bookmark => EventType::Bookmark,
        }
    }
}

//=========================================================================================
// Dispatch
//=========================================================================================

pub async fn run(cli: Cli, config: AdminConfig) -> Result<(), AdminError> {
    let backend = Arc::new(BackendClient::new(config.backend_url.clone()));

    // Ingestion never needs the reader identity or its data directory.
    match cli.command {
        Command::Identity { command } => run_identity(&identity_store(&config)?, command),
        Command::Ingest { url, fetch_only } => run_ingest(&config, backend, &url, fetch_only).await,
        Command::Feed { count } => run_feed(backend, identity_store(&config)?.get()?, count).await,
        Command::React {
            paragraph_id,
            reaction,
        } => {
            let user_id = identity_store(&config)?.get()?;
            run_react(backend, user_id, paragraph_id, reaction).await
        }
    }
}

fn identity_store(config: &AdminConfig) -> Result<IdentityStore<FileStorage>, AdminError> {
    let storage = match &config.identity_path {
        Some(path) => FileStorage::at(path),
        None => FileStorage::default_location()?,
    };
    Ok(IdentityStore::new(storage))
}

fn run_identity(
    identity: &IdentityStore<FileStorage>,
    command: IdentityCommand,
) -> Result<(), AdminError> {
    match command {
        IdentityCommand::Show => println!("{}", identity.get()?),
        IdentityCommand::Export { dir: Some(dir) } => {
            let path = identity.export_to_file(&dir)?;
            println!("Identifier saved to {}", path.display());
        }
        IdentityCommand::Export { dir: None } => println!("{}", identity.export()?),
        IdentityCommand::Import { value, file } => {
            let imported = match (value, file) {
                (_, Some(file)) => identity.import_from_file(&file)?,
                (Some(value), None) => identity.import(&value)?,
                (None, None) => return Err(IdentityError::Empty.into()),
            };
            println!("Identifier imported: {}", imported);
        }
        IdentityCommand::Clear => {
            identity.clear()?;
            println!("Identifier cleared; a new one is generated on next use.");
        }
    }
    Ok(())
}

async fn run_ingest(
    config: &AdminConfig,
    backend: Arc<BackendClient>,
    url: &str,
    fetch_only: bool,
) -> Result<(), AdminError> {
    let mut flow = IngestionFlow::new(backend, config.gutenberg_base_url.clone());
    if !fetch_only {
        let api_key = config.require_openai_key()?;
        let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
        flow = flow.with_segmenter(Arc::new(OpenAiSegmentationAdapter::new(
            client,
            config.segmentation_model.clone(),
        )));
    }

    match flow.ingest(url, fetch_only).await? {
        IngestOutcome::Fetched(fetched) => {
            let m = &fetched.metadata;
            println!("Title:        {}", m.title);
            println!("Author:       {}", m.author);
            println!("Release date: {}", m.release_date);
            println!("Language:     {}", m.language);
            println!("Source:       {}", m.source_url);
            if let Some(existing) = fetched.existing {
                println!("Already stored as book {}", existing.id);
            }
        }
        IngestOutcome::Stored(stored) => {
            println!(
                "Book \"{}\" by {} saved as {}",
                stored.metadata.title, stored.metadata.author, stored.book_id
            );
            let report = &stored.report;
            println!(
                "Paragraphs: {} attempted, {} saved, {} failed",
                report.attempted,
                report.saved,
                report.failed.len()
            );
            for failure in &report.failed {
                println!("  #{}: {}", failure.index, failure.reason);
            }
        }
    }
    Ok(())
}

async fn run_feed(
    backend: Arc<BackendClient>,
    user_id: String,
    count: usize,
) -> Result<(), AdminError> {
    let mut feed = Feed::start(backend, user_id).await;
    for _ in 0..count {
        match feed.load_next().await? {
            FeedStep::Loaded(index) => {
                let card = &feed.cards()[index];
                let p = &card.paragraph;
                println!("── {} by {}", p.book.title, p.book.author);
                println!("{}", p.content);
                println!(
                    "   {} likes · {} dislikes · {} hearts · {} bookmarks   [{}]",
                    p.stats.likes,
                    p.stats.dislikes,
                    p.stats.hearts,
                    p.stats.bookmarks,
                    describe(card.reactions.flags())
                );
                println!("   id: {}\n", p.paragraph_id);
            }
            FeedStep::Exhausted => {
                println!("You've reached the end!");
                break;
            }
        }
    }
    Ok(())
}

async fn run_react(
    backend: Arc<BackendClient>,
    user_id: String,
    paragraph_id: Uuid,
    reaction: ReactionArg,
) -> Result<(), AdminError> {
    backend.create_user(&user_id).await?;
    let current = backend
        .interaction_for_paragraph(&user_id, paragraph_id)
        .await?
        .flags();
    let paragraph = backend.get_paragraph(paragraph_id).await?;

    let panel = ReactionPanel::new(
        backend.clone(),
        user_id.clone(),
        paragraph_id,
        paragraph.content,
        current,
    );
    match panel.toggle(reaction.into()).await? {
        ToggleOutcome::Applied(flags) => {
            println!("{}", describe(flags));
            if let Some(event_type) = tracked_event(reaction, flags) {
                if let Err(e) = backend.track_event(&user_id, paragraph_id, event_type).await {
                    warn!("Could not append to the reaction log: {}", e);
                }
            }
        }
        ToggleOutcome::Dropped => println!("Another reaction is still being saved."),
    }
    Ok(())
}

/// The log entry for a toggle. Removing a reaction is not logged.
fn tracked_event(reaction: ReactionArg, flags: ReactionFlags) -> Option<EventType> {
    flags
        .is_set(reaction.into())
        .then(|| reaction.into())
}

fn describe(flags: ReactionFlags) -> String {
    let mut shown = Vec::new();
    if flags.is_liked {
        shown.push("liked");
    }
    if flags.is_disliked {
        shown.push("disliked");
    }
    if flags.is_hearted {
        shown.push("hearted");
    }
    if flags.is_bookmarked {
        shown.push("bookmarked");
    }
    if shown.is_empty() {
        "no reactions".to_string()
    } else {
        shown.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_identity_import_from_file() {
        let cli = Cli::try_parse_from(["bookbyte", "identity", "import", "--file", "id.txt"]).unwrap();
        match cli.command {
            Command::Identity {
                command: IdentityCommand::Import { value, file },
            } => {
                assert!(value.is_none());
                assert_eq!(file, Some(PathBuf::from("id.txt")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_react_with_uuid() {
        let cli = Cli::try_parse_from([
            "bookbyte",
            "react",
            "123e4567-e89b-12d3-a456-426614174000",
            "heart",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::React {
                reaction: ReactionArg::Heart,
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_reaction() {
        assert!(Cli::try_parse_from([
            "bookbyte",
            "react",
            "123e4567-e89b-12d3-a456-426614174000",
            "share",
        ])
        .is_err());
    }

    #[test]
    fn only_a_reaction_that_ends_up_set_is_logged() {
        let liked = ReactionFlags {
            is_liked: true,
            ..ReactionFlags::default()
        };
        assert_eq!(tracked_event(ReactionArg::Like, liked), Some(EventType::Like));
        assert_eq!(tracked_event(ReactionArg::Like, ReactionFlags::default()), None);
        assert_eq!(tracked_event(ReactionArg::Dislike, liked), None);
    }

    #[tokio::test]
    async fn ingest_does_not_touch_the_identity_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the identity file should be makes every identity read fail.
        let config = AdminConfig {
            backend_url: "http://127.0.0.1:9".to_string(),
            gutenberg_base_url: "http://127.0.0.1:9".to_string(),
            openai_api_key: None,
            segmentation_model: "o1".to_string(),
            identity_path: Some(dir.path().to_path_buf()),
            log_level: tracing::Level::INFO,
        };

        let ingest = Cli::try_parse_from(["bookbyte", "ingest", "https://example.com/1", "--fetch-only"])
            .unwrap();
        let err = run(ingest, config.clone()).await.unwrap_err();
        assert!(matches!(err, AdminError::Ingest(_)));

        let show = Cli::try_parse_from(["bookbyte", "identity", "show"]).unwrap();
        let err = run(show, config).await.unwrap_err();
        assert!(matches!(err, AdminError::Identity(_)));
    }

    #[test]
    fn describes_flags() {
        assert_eq!(describe(ReactionFlags::default()), "no reactions");
        let flags = ReactionFlags {
            is_liked: true,
            is_bookmarked: true,
            ..ReactionFlags::default()
        };
        assert_eq!(describe(flags), "liked, bookmarked");
    }
}
