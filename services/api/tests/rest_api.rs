//! Router-level tests over the in-memory store.

use api_lib::{
    adapters::InMemoryDb,
    config::Config,
    web::{build_router, state::AppState},
};
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use tracing::Level;

const READER: &str = "123e4567-e89b-12d3-a456-426614174000";

fn app() -> Router {
    let config = Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "memory://".to_string(),
        log_level: Level::INFO,
        cors_origin: "http://localhost:8080".to_string(),
        max_db_connections: 1,
    };
    build_router(Arc::new(AppState {
        db: Arc::new(InMemoryDb::new()),
        config: Arc::new(config),
    }))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn moby_dick() -> Value {
    json!({
        "title": "Moby Dick",
        "author": "Herman Melville",
        "published_date": "2001-01-01",
        "language": "English",
        "source": "https://www.gutenberg.org/ebooks/2701"
    })
}

/// Seeds one book with `count` paragraphs and returns (book_id, paragraph_ids).
async fn seed(app: &Router, count: usize) -> (String, Vec<String>) {
    let (status, body) = send(app, Method::POST, "/books/", Some(moby_dick())).await;
    assert_eq!(status, StatusCode::CREATED);
    let book_id = body["id"].as_str().unwrap().to_string();

    let mut paragraph_ids = Vec::new();
    for i in 0..count {
        let (status, body) = send(
            app,
            Method::POST,
            "/paragraphs/",
            Some(json!({ "book_id": book_id, "content": format!("Paragraph number {i}.") })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        paragraph_ids.push(body["id"].as_str().unwrap().to_string());
    }
    (book_id, paragraph_ids)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn duplicate_book_is_rejected_with_400() {
    let app = app();
    seed(&app, 0).await;
    let (status, body) = send(&app, Method::POST, "/books/", Some(moby_dick())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Book with same title and author already exists");

    let (_, books) = send(&app, Method::GET, "/books/", None).await;
    assert_eq!(books.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn book_update_is_partial_and_delete_cascades() {
    let app = app();
    let (book_id, _) = seed(&app, 2).await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/books/{book_id}/"),
        Some(json!({ "language": "en" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, book) = send(&app, Method::GET, &format!("/books/{book_id}/"), None).await;
    assert_eq!(book["language"], "en");
    assert_eq!(book["title"], "Moby Dick");

    let (status, _) = send(&app, Method::DELETE, &format!("/books/{book_id}/"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, paragraphs) = send(&app, Method::GET, "/paragraphs/", None).await;
    assert!(paragraphs.as_array().unwrap().is_empty());

    let (status, body) = send(&app, Method::GET, &format!("/books/{book_id}/"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Book not found");
}

#[tokio::test]
async fn paragraph_for_missing_book_is_404() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/paragraphs/",
        Some(json!({ "book_id": uuid::Uuid::new_v4(), "content": "orphan" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Book not found");
}

#[tokio::test]
async fn user_identifiers_are_unique() {
    let app = app();
    let (status, first) = send(&app, Method::POST, "/users/", Some(json!({ "identifier": READER }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, Method::POST, "/users/", Some(json!({ "identifier": READER }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, second) = send(&app, Method::POST, "/users/", Some(json!({ "identifier": "other" }))).await;
    let second_id = second["id"].as_str().unwrap();
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/users/{second_id}/"),
        Some(json!({ "identifier": READER })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Identifier already exists");

    let first_id = first["id"].as_str().unwrap();
    let (status, user) = send(&app, Method::GET, &format!("/users/{first_id}/"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["identifier"], READER);
}

#[tokio::test]
async fn event_upsert_creates_then_updates_only_given_flags() {
    let app = app();
    let (_, paragraphs) = seed(&app, 1).await;
    send(&app, Method::POST, "/users/", Some(json!({ "identifier": READER }))).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/events/",
        Some(json!({ "user_id": READER, "paragraph_id": paragraphs[0], "is_hearted": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Event created successfully");
    assert_eq!(body["is_hearted"], true);
    assert_eq!(body["is_liked"], false);

    let (status, body) = send(
        &app,
        Method::POST,
        "/events/",
        Some(json!({ "user_id": READER, "paragraph_id": paragraphs[0], "is_liked": true, "is_disliked": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event updated successfully");
    assert_eq!(body["is_hearted"], true);
    assert_eq!(body["is_liked"], true);

    let (_, events) = send(&app, Method::GET, "/events/", None).await;
    assert_eq!(events.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn event_upsert_for_unknown_reader_is_404() {
    let app = app();
    let (_, paragraphs) = seed(&app, 1).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/events/",
        Some(json!({ "user_id": "ghost", "paragraph_id": paragraphs[0], "is_liked": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "UserIdentifier not found");
}

#[tokio::test]
async fn interaction_lookup_defaults_to_all_false_without_id() {
    let app = app();
    let (_, paragraphs) = seed(&app, 1).await;
    send(&app, Method::POST, "/users/", Some(json!({ "identifier": READER }))).await;

    let simple_id = paragraphs[0].replace('-', "");
    let uri = format!("/events/user/{READER}/paragraph/{simple_id}/");
    let (status, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("id").is_none());
    for flag in ["is_liked", "is_disliked", "is_hearted", "is_bookmarked"] {
        assert_eq!(body[flag], false);
    }

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/events/user/ghost/paragraph/{simple_id}/"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn random_feed_includes_stats_and_reader_flags() {
    let app = app();
    let (_, paragraphs) = seed(&app, 7).await;
    send(&app, Method::POST, "/users/", Some(json!({ "identifier": READER }))).await;
    for id in &paragraphs {
        send(
            &app,
            Method::POST,
            "/events/",
            Some(json!({ "user_id": READER, "paragraph_id": id, "is_bookmarked": true })),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/paragraphs/random/?user_id={READER}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let feed = body.as_array().unwrap();
    assert_eq!(feed.len(), 5);
    for item in feed {
        assert_eq!(item["stats"]["bookmarks"], 1);
        assert_eq!(item["user_interactions"]["is_bookmarked"], true);
        assert_eq!(item["book"]["title"], "Moby Dick");
    }
}

#[tokio::test]
async fn random_feed_is_404_when_empty() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/paragraphs/random/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No paragraphs available");
}

#[tokio::test]
async fn random_paragraph_function_returns_text_and_book() {
    let app = app();
    let (status, _) = send(&app, Method::GET, "/functions/random-paragraph", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (book_id, _) = seed(&app, 3).await;
    let (status, body) = send(&app, Method::GET, "/functions/random-paragraph", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["text"].as_str().unwrap().starts_with("Paragraph number"));
    assert_eq!(body["book"]["id"], book_id.as_str());
    assert_eq!(body["book"]["language"], "English");
}

#[tokio::test]
async fn track_event_validates_and_registers_reader() {
    let app = app();
    let (_, paragraphs) = seed(&app, 1).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/functions/track-event",
        Some(json!({ "user_id": READER, "paragraph_id": paragraphs[0] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields: user_id, paragraph_id, event_type");

    let (status, body) = send(
        &app,
        Method::POST,
        "/functions/track-event",
        Some(json!({ "user_id": READER, "paragraph_id": paragraphs[0], "event_type": "share" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid event_type. Must be one of: heart, like, dislike, bookmark, copy"
    );

    let (status, body) = send(
        &app,
        Method::POST,
        "/functions/track-event",
        Some(json!({ "user_id": READER, "paragraph_id": paragraphs[0], "event_type": "copy" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["event"]["event_type"], "copy");

    let (_, users) = send(&app, Method::GET, "/users/", None).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_json_gets_error_body() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/books/")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Invalid data"));
}
