//! services/api/src/web/books.rs

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use bookbyte_core::domain::{BookUpdate, NewBook};
use bookbyte_core::protocol::{
    BookPayload, BookResponse, BookUpdatePayload, CreatedResponse, ErrorBody, MessageResponse,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::web::rest::{json_body, message, path_id, port_error, HandlerResult};
use crate::web::state::AppState;

#[utoipa::path(
    get,
    path = "/books/",
    responses((status = 200, description = "All books", body = [BookResponse]))
)]
pub async fn list_books_handler(
    State(app_state): State<Arc<AppState>>,
) -> HandlerResult<impl IntoResponse> {
    let books = app_state.db.list_books().await.map_err(port_error)?;
    Ok(Json(
        books.into_iter().map(BookResponse::from).collect::<Vec<_>>(),
    ))
}

/// Create a book. Title and author together must be unique.
#[utoipa::path(
    post,
    path = "/books/",
    request_body = BookPayload,
    responses(
        (status = 201, description = "Book created", body = CreatedResponse),
        (status = 400, description = "Duplicate or malformed book", body = ErrorBody)
    )
)]
pub async fn create_book_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let payload = json_body(payload)?;
    let book = app_state
        .db
        .create_book(NewBook {
            title: payload.title,
            author: payload.author,
            published_date: payload.published_date,
            language: payload.language,
            source: payload.source,
        })
        .await
        .map_err(port_error)?;
    info!(book_id = %book.id, title = %book.title, "Book created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: book.id,
            message: "Book created successfully".to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/books/{id}/",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "The book", body = BookResponse),
        (status = 404, description = "Book not found", body = ErrorBody)
    )
)]
pub async fn get_book_handler(
    State(app_state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> HandlerResult<impl IntoResponse> {
    let id = path_id(id, "Book")?;
    let book = app_state.db.get_book(id).await.map_err(port_error)?;
    Ok(Json(BookResponse::from(book)))
}

/// Partially update a book; absent fields keep their stored value.
#[utoipa::path(
    put,
    path = "/books/{id}/",
    params(("id" = Uuid, Path, description = "Book id")),
    request_body = BookUpdatePayload,
    responses(
        (status = 200, description = "Book updated", body = MessageResponse),
        (status = 400, description = "Another book has the same title and author", body = ErrorBody),
        (status = 404, description = "Book not found", body = ErrorBody)
    )
)]
pub async fn update_book_handler(
    State(app_state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<BookUpdatePayload>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let id = path_id(id, "Book")?;
    let payload = json_body(payload)?;
    app_state
        .db
        .update_book(
            id,
            BookUpdate {
                title: payload.title,
                author: payload.author,
                published_date: payload.published_date,
                language: payload.language,
                source: payload.source,
            },
        )
        .await
        .map_err(port_error)?;
    Ok(message("Book updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/books/{id}/",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book and its paragraphs deleted", body = MessageResponse),
        (status = 404, description = "Book not found", body = ErrorBody)
    )
)]
pub async fn delete_book_handler(
    State(app_state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> HandlerResult<impl IntoResponse> {
    let id = path_id(id, "Book")?;
    app_state.db.delete_book(id).await.map_err(port_error)?;
    info!(book_id = %id, "Book deleted");
    Ok(message("Book deleted successfully"))
}
