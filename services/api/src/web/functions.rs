//! services/api/src/web/functions.rs
//!
//! The two lightweight function endpoints. They share the main store with the
//! REST surface.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use bookbyte_core::protocol::{
    ErrorBody, FunctionParagraphResponse, TrackEventPayload, TrackEventResponse,
};
use bookbyte_core::reactions::EventType;
use rand::Rng;
use std::sync::Arc;
use tracing::info;

use crate::web::rest::{error_response, json_body, parse_uuid, port_error, HandlerResult};
use crate::web::state::AppState;

/// One paragraph picked by counting the table and reading at a random offset.
#[utoipa::path(
    get,
    path = "/functions/random-paragraph",
    responses(
        (status = 200, description = "A random paragraph", body = FunctionParagraphResponse),
        (status = 404, description = "No paragraphs stored", body = ErrorBody)
    )
)]
pub async fn random_paragraph_function(
    State(app_state): State<Arc<AppState>>,
) -> HandlerResult<impl IntoResponse> {
    let count = app_state.db.count_paragraphs().await.map_err(port_error)?;
    if count <= 0 {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            "No paragraphs available. Please add some books to the database.",
        ));
    }

    let offset = rand::thread_rng().gen_range(0..count);
    let item = app_state
        .db
        .paragraph_at_offset(offset)
        .await
        .map_err(port_error)?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "No paragraph found"))?;

    Ok(Json(FunctionParagraphResponse::from(item)))
}

/// Append one entry to the reaction log, registering the reader if needed.
#[utoipa::path(
    post,
    path = "/functions/track-event",
    request_body = TrackEventPayload,
    responses(
        (status = 200, description = "Event recorded", body = TrackEventResponse),
        (status = 400, description = "Missing fields or unknown event type", body = ErrorBody),
        (status = 404, description = "Paragraph not found", body = ErrorBody)
    )
)]
pub async fn track_event_function(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<TrackEventPayload>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let payload = json_body(payload)?;
    let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let (Some(user_id), Some(paragraph_id), Some(event_type)) = (
        present(&payload.user_id),
        present(&payload.paragraph_id),
        present(&payload.event_type),
    ) else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Missing required fields: user_id, paragraph_id, event_type",
        ));
    };

    let event_type = event_type
        .parse::<EventType>()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;
    let paragraph_id = parse_uuid(&paragraph_id)?;

    let event = app_state
        .db
        .record_tracked_event(&user_id, paragraph_id, event_type)
        .await
        .map_err(port_error)?;
    info!(
        event_id = %event.id,
        event_type = %event.event_type,
        "Tracked event recorded"
    );

    Ok(Json(TrackEventResponse {
        success: true,
        event: event.into(),
    }))
}
