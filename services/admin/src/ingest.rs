//! services/admin/src/ingest.rs
//!
//! The admin ingestion flow: download a Project Gutenberg text, read its
//! header, refuse duplicates, segment the body into paragraphs and store the
//! book and its paragraphs through the backend.
//!
//! Steps run strictly one after another. The only fan-out is the paragraph
//! insert, which sends batches of [`PARAGRAPH_BATCH_SIZE`] concurrent requests.
//! Nothing is retried or rolled back: the book row stays even when some of its
//! paragraphs fail, and the [`BulkInsertReport`] says which ones.

use std::sync::Arc;

use bookbyte_client::BackendClient;
use bookbyte_core::gutenberg::{proxied_url, resolve_text_url, strip_boilerplate, MIN_BOOK_LENGTH};
use bookbyte_core::metadata::{extract_book_metadata, parse_release_date, BookMetadata};
use bookbyte_core::ports::ParagraphSegmentationService;
use bookbyte_core::protocol::{BookPayload, BookResponse};
use futures::future::join_all;
use reqwest::header::ACCEPT;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::IngestError;

pub const PARAGRAPH_BATCH_SIZE: usize = 10;

//=========================================================================================
// Results
//=========================================================================================

/// A downloaded book with its header metadata and any stored match.
#[derive(Debug, Clone)]
pub struct FetchedBook {
    pub text_url: String,
    pub text: String,
    pub metadata: BookMetadata,
    pub existing: Option<BookResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedParagraph {
    /// Position in the segmented paragraph list.
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkInsertReport {
    pub attempted: usize,
    pub saved: usize,
    pub failed: Vec<FailedParagraph>,
}

#[derive(Debug, Clone)]
pub struct StoredBook {
    pub book_id: Uuid,
    pub metadata: BookMetadata,
    pub report: BulkInsertReport,
}

#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// `fetch_only` was requested; nothing was written.
    Fetched(FetchedBook),
    Stored(StoredBook),
}

//=========================================================================================
// The Flow
//=========================================================================================

pub struct IngestionFlow {
    backend: Arc<BackendClient>,
    http: reqwest::Client,
    gutenberg_base_url: String,
    segmenter: Option<Arc<dyn ParagraphSegmentationService>>,
}

impl IngestionFlow {
    pub fn new(backend: Arc<BackendClient>, gutenberg_base_url: impl Into<String>) -> Self {
        Self {
            backend,
            http: reqwest::Client::new(),
            gutenberg_base_url: gutenberg_base_url.into(),
            segmenter: None,
        }
    }

    pub fn with_segmenter(mut self, segmenter: Arc<dyn ParagraphSegmentationService>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    /// Runs the whole flow for `url`. With `fetch_only` it stops after the
    /// metadata and duplicate check.
    pub async fn ingest(&self, url: &str, fetch_only: bool) -> Result<IngestOutcome, IngestError> {
        let fetched = self.fetch(url).await?;
        if fetch_only {
            return Ok(IngestOutcome::Fetched(fetched));
        }
        Ok(IngestOutcome::Stored(self.process(fetched).await?))
    }

    /// Downloads the book, extracts its metadata and looks for a stored match.
    pub async fn fetch(&self, url: &str) -> Result<FetchedBook, IngestError> {
        let text_url = resolve_text_url(url)?;
        let fetch_url = proxied_url(&text_url, &self.gutenberg_base_url);
        info!(%fetch_url, "Fetching book");

        let resp = self
            .http
            .get(&fetch_url)
            .header(ACCEPT, "text/plain")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(IngestError::FetchStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }
        let text = resp.text().await?;
        let length = text.chars().count();
        info!(characters = length, "Book text received");
        if length < MIN_BOOK_LENGTH {
            return Err(IngestError::TooShort(length));
        }

        let Some(metadata) = extract_book_metadata(&text, &text_url) else {
            warn!("Book fetched but could not extract all metadata");
            return Err(IngestError::MissingMetadata);
        };

        let books = self.backend.list_books().await?;
        info!(count = books.len(), "Loaded existing books");
        let existing = find_existing(&books, &text_url, &metadata);
        match &existing {
            Some(book) => warn!(book_id = %book.id, "Book already exists in the database"),
            None => info!(title = %metadata.title, author = %metadata.author, "Book fetched"),
        }

        Ok(FetchedBook {
            text_url,
            text,
            metadata,
            existing,
        })
    }

    /// Segments a fetched book and stores it with its paragraphs.
    pub async fn process(&self, fetched: FetchedBook) -> Result<StoredBook, IngestError> {
        if let Some(existing) = &fetched.existing {
            return Err(IngestError::Duplicate(existing.id));
        }
        let segmenter = self.segmenter.as_ref().ok_or_else(|| {
            IngestError::SegmenterUnavailable("no OpenAI API key configured".to_string())
        })?;

        let body = strip_boilerplate(&fetched.text);
        let paragraphs = segmenter.segment(body).await?;
        info!(count = paragraphs.len(), "Extracted paragraphs");

        let metadata = fetched.metadata;
        let book_id = self
            .backend
            .create_book(&BookPayload {
                title: metadata.title.clone(),
                author: metadata.author.clone(),
                published_date: parse_release_date(&metadata.release_date),
                language: metadata.language.clone(),
                source: metadata.source_url.clone(),
            })
            .await?;
        info!(%book_id, "Book saved");

        let report = self.bulk_insert_paragraphs(book_id, &paragraphs).await;
        info!(
            attempted = report.attempted,
            saved = report.saved,
            failed = report.failed.len(),
            "Paragraph insert finished"
        );

        Ok(StoredBook {
            book_id,
            metadata,
            report,
        })
    }

    /// Inserts `paragraphs` in concurrent batches and reports every failure.
    pub async fn bulk_insert_paragraphs(
        &self,
        book_id: Uuid,
        paragraphs: &[String],
    ) -> BulkInsertReport {
        let mut report = BulkInsertReport {
            attempted: paragraphs.len(),
            ..BulkInsertReport::default()
        };

        for (batch_no, batch) in paragraphs.chunks(PARAGRAPH_BATCH_SIZE).enumerate() {
            let offset = batch_no * PARAGRAPH_BATCH_SIZE;
            let results = join_all(
                batch
                    .iter()
                    .map(|content| self.backend.create_paragraph(book_id, content)),
            )
            .await;

            for (i, result) in results.into_iter().enumerate() {
                match result {
                    Ok(_) => report.saved += 1,
                    Err(e) => {
                        error!(index = offset + i, "Failed to save paragraph: {}", e);
                        report.failed.push(FailedParagraph {
                            index: offset + i,
                            reason: e.to_string(),
                        });
                    }
                }
            }
            info!(
                saved = report.saved,
                total = report.attempted,
                "Saving paragraphs to database"
            );
        }
        report
    }
}

/// A stored book with the same text URL, or the same title and author ignoring case.
fn find_existing(
    books: &[BookResponse],
    text_url: &str,
    metadata: &BookMetadata,
) -> Option<BookResponse> {
    books
        .iter()
        .find(|book| {
            book.source == text_url
                || (book.title.to_lowercase() == metadata.title.to_lowercase()
                    && book.author.to_lowercase() == metadata.author.to_lowercase())
        })
        .cloned()
}
