//! End-to-end ingestion against a fake backend and a fake Gutenberg mirror.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookbyte_admin::error::IngestError;
use bookbyte_admin::ingest::{IngestOutcome, IngestionFlow};
use bookbyte_client::BackendClient;
use bookbyte_core::ports::{ParagraphSegmentationService, PortResult};
use serde_json::{json, Value};
use uuid::Uuid;

const BOOK_TEXT: &str = "The Project Gutenberg eBook of Moby Dick\n\n\
Title: Moby Dick\n\n\
Author: Herman Melville\n\n\
Release date: January 1, 2001 [EBook #2701]\n\n\
Language: English\n\n\
*** START OF THE PROJECT GUTENBERG EBOOK MOBY DICK ***\n\
Call me Ishmael. Some years ago, never mind how long precisely, having little money in my purse.\n\
*** END OF THE PROJECT GUTENBERG EBOOK MOBY DICK ***\n";

#[derive(Default)]
struct Fake {
    books: Vec<Value>,
    paragraphs: Vec<(String, String)>,
    book_posts: usize,
}

type Shared = Arc<Mutex<Fake>>;

async fn list_books(State(fake): State<Shared>) -> Json<Value> {
    Json(Value::Array(fake.lock().unwrap().books.clone()))
}

async fn create_book(State(fake): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let id = Uuid::new_v4();
    let mut fake = fake.lock().unwrap();
    fake.book_posts += 1;
    let mut stored = body.clone();
    stored["id"] = json!(id);
    stored["created_at"] = json!("2025-01-01T00:00:00Z");
    fake.books.push(stored);
    (
        StatusCode::CREATED,
        Json(json!({ "id": id, "message": "Book created successfully" })),
    )
}

async fn create_paragraph(
    State(fake): State<Shared>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let content = body["content"].as_str().unwrap_or_default().to_string();
    if content.contains("FAIL") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "disk full" })),
        );
    }
    let book_id = body["book_id"].as_str().unwrap_or_default().to_string();
    fake.lock().unwrap().paragraphs.push((book_id, content));
    (
        StatusCode::CREATED,
        Json(json!({ "id": Uuid::new_v4(), "message": "Paragraph created successfully" })),
    )
}

async fn spawn(fake: Shared) -> String {
    let app = Router::new()
        .route("/books/", get(list_books).post(create_book))
        .route("/paragraphs/", axum::routing::post(create_paragraph))
        .route("/cache/epub/2701/pg2701.txt", get(|| async { BOOK_TEXT }))
        .route("/cache/epub/1/pg1.txt", get(|| async { "too short" }))
        .route("/cache/epub/3/pg3.txt", get(|| async { "Plain words without any header. ".repeat(5) }))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Returns 25 paragraphs; entries 3, 11 and 19 are rejected by the fake backend.
struct FixedSegmenter;

#[async_trait]
impl ParagraphSegmentationService for FixedSegmenter {
    async fn segment(&self, text: &str) -> PortResult<Vec<String>> {
        assert!(!text.contains("*** START OF"));
        Ok((0..25)
            .map(|i| {
                if [3, 11, 19].contains(&i) {
                    format!("Paragraph {i} FAIL")
                } else {
                    format!("Paragraph {i}")
                }
            })
            .collect())
    }
}

fn flow(base: &str) -> IngestionFlow {
    IngestionFlow::new(Arc::new(BackendClient::new(base)), base)
        .with_segmenter(Arc::new(FixedSegmenter))
}

#[tokio::test]
async fn partial_paragraph_failures_are_reported_and_book_is_kept() {
    let fake: Shared = Arc::default();
    let base = spawn(fake.clone()).await;

    let outcome = flow(&base)
        .ingest("https://www.gutenberg.org/ebooks/2701", false)
        .await
        .unwrap();
    let IngestOutcome::Stored(stored) = outcome else {
        panic!("expected the book to be stored");
    };

    assert_eq!(stored.metadata.title, "Moby Dick");
    assert_eq!(stored.report.attempted, 25);
    assert_eq!(stored.report.saved, 22);
    let failed: Vec<usize> = stored.report.failed.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![3, 11, 19]);
    assert!(stored.report.failed[0].reason.contains("disk full"));

    let fake = fake.lock().unwrap();
    assert_eq!(fake.books.len(), 1);
    assert_eq!(fake.books[0]["published_date"], "2001-01-01");
    assert_eq!(
        fake.books[0]["source"],
        "https://www.gutenberg.org/cache/epub/2701/pg2701.txt"
    );
    assert_eq!(fake.paragraphs.len(), 22);
    assert!(fake
        .paragraphs
        .iter()
        .all(|(book_id, _)| *book_id == stored.book_id.to_string()));
}

#[tokio::test]
async fn fetch_only_writes_nothing() {
    let fake: Shared = Arc::default();
    let base = spawn(fake.clone()).await;

    let outcome = flow(&base)
        .ingest("https://www.gutenberg.org/cache/epub/2701/pg2701.txt", true)
        .await
        .unwrap();
    let IngestOutcome::Fetched(fetched) = outcome else {
        panic!("expected fetch-only outcome");
    };
    assert_eq!(fetched.metadata.author, "Herman Melville");
    assert_eq!(fetched.metadata.release_date, "January 1, 2001");
    assert!(fetched.existing.is_none());
    assert_eq!(fake.lock().unwrap().book_posts, 0);
}

#[tokio::test]
async fn duplicate_book_is_refused_before_any_write() {
    let fake: Shared = Arc::default();
    fake.lock().unwrap().books.push(json!({
        "id": Uuid::new_v4(),
        "title": "MOBY DICK",
        "author": "herman melville",
        "published_date": "2001-01-01",
        "language": "English",
        "source": "somewhere else",
        "created_at": "2025-01-01T00:00:00Z"
    }));
    let base = spawn(fake.clone()).await;

    let err = flow(&base)
        .ingest("https://www.gutenberg.org/ebooks/2701", false)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Duplicate(_)));
    assert_eq!(fake.lock().unwrap().book_posts, 0);
}

#[tokio::test]
async fn short_download_is_rejected() {
    let fake: Shared = Arc::default();
    let base = spawn(fake).await;

    let err = flow(&base)
        .ingest("https://www.gutenberg.org/ebooks/1", true)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::TooShort(9)));
}

#[tokio::test]
async fn non_gutenberg_url_is_rejected() {
    let fake: Shared = Arc::default();
    let base = spawn(fake).await;

    let err = flow(&base)
        .ingest("https://example.com/ebooks/2701", true)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::SourceUrl(_)));
}

#[tokio::test]
async fn text_without_header_sentinel_has_no_metadata() {
    let fake: Shared = Arc::default();
    let base = spawn(fake.clone()).await;

    let err = flow(&base)
        .ingest("https://www.gutenberg.org/ebooks/3", false)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::MissingMetadata));
    assert_eq!(fake.lock().unwrap().book_posts, 0);
}
