//! services/api/src/web/paragraphs.rs
//!
//! Paragraph CRUD plus the random feed endpoint the reader app pages through.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use bookbyte_core::ports::PortError;
use bookbyte_core::protocol::{
    CreatedResponse, ErrorBody, FeedParagraph, MessageResponse, ParagraphPayload,
    ParagraphResponse, ParagraphUpdatePayload, RandomParagraphQuery,
};
use bookbyte_core::reactions::ReactionFlags;
use std::sync::Arc;
use uuid::Uuid;

use crate::web::rest::{error_response, json_body, message, path_id, port_error, HandlerResult};
use crate::web::state::AppState;

/// How many paragraphs one feed request returns at most.
pub const FEED_PAGE_SIZE: i64 = 5;

#[utoipa::path(
    get,
    path = "/paragraphs/",
    responses((status = 200, description = "All paragraphs", body = [ParagraphResponse]))
)]
pub async fn list_paragraphs_handler(
    State(app_state): State<Arc<AppState>>,
) -> HandlerResult<impl IntoResponse> {
    let paragraphs = app_state.db.list_paragraphs().await.map_err(port_error)?;
    Ok(Json(
        paragraphs
            .into_iter()
            .map(ParagraphResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/paragraphs/",
    request_body = ParagraphPayload,
    responses(
        (status = 201, description = "Paragraph created", body = CreatedResponse),
        (status = 404, description = "Book not found", body = ErrorBody)
    )
)]
pub async fn create_paragraph_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ParagraphPayload>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let payload = json_body(payload)?;
    let paragraph = app_state
        .db
        .create_paragraph(payload.book_id, &payload.content)
        .await
        .map_err(port_error)?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: paragraph.id,
            message: "Paragraph created successfully".to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/paragraphs/{id}/",
    params(("id" = Uuid, Path, description = "Paragraph id")),
    responses(
        (status = 200, description = "The paragraph", body = ParagraphResponse),
        (status = 404, description = "Paragraph not found", body = ErrorBody)
    )
)]
pub async fn get_paragraph_handler(
    State(app_state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> HandlerResult<impl IntoResponse> {
    let id = path_id(id, "Paragraph")?;
    let paragraph = app_state.db.get_paragraph(id).await.map_err(port_error)?;
    Ok(Json(ParagraphResponse::from(paragraph)))
}

#[utoipa::path(
    put,
    path = "/paragraphs/{id}/",
    params(("id" = Uuid, Path, description = "Paragraph id")),
    request_body = ParagraphUpdatePayload,
    responses(
        (status = 200, description = "Paragraph updated", body = MessageResponse),
        (status = 404, description = "Paragraph not found", body = ErrorBody)
    )
)]
pub async fn update_paragraph_handler(
    State(app_state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ParagraphUpdatePayload>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let id = path_id(id, "Paragraph")?;
    let payload = json_body(payload)?;
    match payload.content {
        Some(content) => {
            app_state
                .db
                .update_paragraph(id, &content)
                .await
                .map_err(port_error)?;
        }
        None => {
            app_state.db.get_paragraph(id).await.map_err(port_error)?;
        }
    }
    Ok(message("Paragraph updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/paragraphs/{id}/",
    params(("id" = Uuid, Path, description = "Paragraph id")),
    responses(
        (status = 200, description = "Paragraph deleted", body = MessageResponse),
        (status = 404, description = "Paragraph not found", body = ErrorBody)
    )
)]
pub async fn delete_paragraph_handler(
    State(app_state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> HandlerResult<impl IntoResponse> {
    let id = path_id(id, "Paragraph")?;
    app_state.db.delete_paragraph(id).await.map_err(port_error)?;
    Ok(message("Paragraph deleted successfully"))
}

/// Up to five random paragraphs, each with its book, aggregate reaction
/// counts and the requesting reader's own flags.
///
/// An unknown or absent `user_id` yields all-false `user_interactions`.
#[utoipa::path(
    get,
    path = "/paragraphs/random/",
    params(RandomParagraphQuery),
    responses(
        (status = 200, description = "A page of the feed", body = [FeedParagraph]),
        (status = 404, description = "No paragraphs stored", body = ErrorBody)
    )
)]
pub async fn random_paragraphs_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<RandomParagraphQuery>,
) -> HandlerResult<impl IntoResponse> {
    let db = &app_state.db;
    let picked = db
        .random_paragraphs(FEED_PAGE_SIZE)
        .await
        .map_err(port_error)?;
    if picked.is_empty() {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            "No paragraphs available",
        ));
    }

    let reader = query.user_id.filter(|u| !u.trim().is_empty());
    let mut feed = Vec::with_capacity(picked.len());
    for item in picked {
        let paragraph_id = item.paragraph.id;
        let stats = db.paragraph_stats(paragraph_id).await.map_err(port_error)?;
        let flags = match &reader {
            Some(identifier) => match db.find_event(identifier, paragraph_id).await {
                Ok(Some(event)) => event.flags,
                Ok(None) | Err(PortError::NotFound(_)) => ReactionFlags::default(),
                Err(e) => return Err(port_error(e)),
            },
            None => ReactionFlags::default(),
        };
        feed.push(FeedParagraph::new(item, stats, Some(flags)));
    }
    Ok(Json(feed))
}
