//! services/api/src/web/events.rs
//!
//! Reaction events. One row per (reader, paragraph); every write touches only
//! the flags present in the request.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use bookbyte_core::protocol::{
    ErrorBody, EventResponse, EventUpsertPayload, EventUpsertResponse, InteractionResponse,
    MessageResponse,
};
use bookbyte_core::reactions::ReactionPatch;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::web::rest::{json_body, message, parse_uuid, path_id, port_error, HandlerResult};
use crate::web::state::AppState;

#[utoipa::path(
    get,
    path = "/events/",
    responses((status = 200, description = "All reaction events", body = [EventResponse]))
)]
pub async fn list_events_handler(
    State(app_state): State<Arc<AppState>>,
) -> HandlerResult<impl IntoResponse> {
    let events = app_state.db.list_events().await.map_err(port_error)?;
    Ok(Json(
        events.into_iter().map(EventResponse::from).collect::<Vec<_>>(),
    ))
}

/// Create or update the event for a (reader, paragraph) pair.
///
/// Returns 201 when the row was created and 200 when it already existed.
#[utoipa::path(
    post,
    path = "/events/",
    request_body = EventUpsertPayload,
    responses(
        (status = 201, description = "Event created", body = EventUpsertResponse),
        (status = 200, description = "Event updated", body = EventUpsertResponse),
        (status = 400, description = "Malformed payload", body = ErrorBody),
        (status = 404, description = "Unknown reader or paragraph", body = ErrorBody)
    )
)]
pub async fn upsert_event_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<EventUpsertPayload>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let payload = json_body(payload)?;
    let outcome = app_state
        .db
        .upsert_event(&payload.user_id, payload.paragraph_id, payload.patch)
        .await
        .map_err(port_error)?;
    debug!(
        event_id = %outcome.event.id,
        created = outcome.created,
        "Reaction event stored"
    );

    let (status, text) = if outcome.created {
        (StatusCode::CREATED, "Event created successfully")
    } else {
        (StatusCode::OK, "Event updated successfully")
    };
    Ok((
        status,
        Json(EventUpsertResponse {
            id: outcome.event.id,
            message: text.to_string(),
            flags: outcome.event.flags,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/events/{id}/",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "The event", body = EventResponse),
        (status = 404, description = "Event not found", body = ErrorBody)
    )
)]
pub async fn get_event_handler(
    State(app_state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> HandlerResult<impl IntoResponse> {
    let id = path_id(id, "Event")?;
    let event = app_state.db.get_event(id).await.map_err(port_error)?;
    Ok(Json(EventResponse::from(event)))
}

#[utoipa::path(
    put,
    path = "/events/{id}/",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body = ReactionPatch,
    responses(
        (status = 200, description = "Event updated", body = MessageResponse),
        (status = 404, description = "Event not found", body = ErrorBody)
    )
)]
pub async fn update_event_handler(
    State(app_state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReactionPatch>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let id = path_id(id, "Event")?;
    let patch = json_body(payload)?;
    app_state
        .db
        .update_event(id, patch)
        .await
        .map_err(port_error)?;
    Ok(message("Event updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/events/{id}/",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event deleted", body = MessageResponse),
        (status = 404, description = "Event not found", body = ErrorBody)
    )
)]
pub async fn delete_event_handler(
    State(app_state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> HandlerResult<impl IntoResponse> {
    let id = path_id(id, "Event")?;
    app_state.db.delete_event(id).await.map_err(port_error)?;
    Ok(message("Event deleted successfully"))
}

/// A reader's flags for one paragraph.
///
/// When both exist but nothing was recorded yet, all flags are false and the
/// response has no `id`.
#[utoipa::path(
    get,
    path = "/events/user/{user_id}/paragraph/{paragraph_id}/",
    params(
        ("user_id" = String, Path, description = "The reader's identifier"),
        ("paragraph_id" = String, Path, description = "Paragraph id, with or without dashes")
    ),
    responses(
        (status = 200, description = "The reader's flags", body = InteractionResponse),
        (status = 400, description = "Malformed paragraph id", body = ErrorBody),
        (status = 404, description = "Unknown reader or paragraph", body = ErrorBody)
    )
)]
pub async fn user_paragraph_event_handler(
    State(app_state): State<Arc<AppState>>,
    Path((user_id, paragraph_id)): Path<(String, String)>,
) -> HandlerResult<impl IntoResponse> {
    let paragraph_uuid = parse_uuid(&paragraph_id)?;
    let event = app_state
        .db
        .find_event(&user_id, paragraph_uuid)
        .await
        .map_err(port_error)?;
    let response = match event {
        Some(event) => InteractionResponse::from(event),
        None => InteractionResponse::empty(user_id, paragraph_uuid),
    };
    Ok(Json(response))
}
