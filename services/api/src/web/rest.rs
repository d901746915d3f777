//! services/api/src/web/rest.rs
//!
//! Shared plumbing for the REST handlers: the master OpenAPI definition, the
//! mapping from port errors to HTTP responses, and request extraction helpers.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use bookbyte_core::ports::PortError;
use bookbyte_core::protocol::{
    BookPayload, BookResponse, BookSummary, BookUpdatePayload, CreatedResponse, ErrorBody,
    EventResponse, EventUpsertPayload, EventUpsertResponse, FeedParagraph, FunctionBook,
    FunctionParagraphResponse, InteractionResponse, MessageResponse, ParagraphPayload,
    ParagraphResponse, ParagraphUpdatePayload, ReactionStatsBody, TrackEventPayload,
    TrackEventResponse, TrackedEventBody, UserPayload, UserResponse, UserUpdatePayload,
};
use bookbyte_core::reactions::{EventType, ReactionFlags, ReactionPatch};
use serde::Serialize;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::web::{books, events, functions, paragraphs, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        books::list_books_handler,
        books::create_book_handler,
        books::get_book_handler,
        books::update_book_handler,
        books::delete_book_handler,
        paragraphs::list_paragraphs_handler,
        paragraphs::create_paragraph_handler,
        paragraphs::get_paragraph_handler,
        paragraphs::update_paragraph_handler,
        paragraphs::delete_paragraph_handler,
        paragraphs::random_paragraphs_handler,
        users::list_users_handler,
        users::create_user_handler,
        users::get_user_handler,
        users::update_user_handler,
        users::delete_user_handler,
        events::list_events_handler,
        events::upsert_event_handler,
        events::get_event_handler,
        events::update_event_handler,
        events::delete_event_handler,
        events::user_paragraph_event_handler,
        functions::random_paragraph_function,
        functions::track_event_function,
    ),
    components(
        schemas(
            HealthResponse, ErrorBody, MessageResponse, CreatedResponse,
            BookPayload, BookUpdatePayload, BookResponse,
            ParagraphPayload, ParagraphUpdatePayload, ParagraphResponse,
            FeedParagraph, BookSummary, ReactionStatsBody,
            UserPayload, UserUpdatePayload, UserResponse,
            EventUpsertPayload, EventUpsertResponse, EventResponse, InteractionResponse,
            ReactionFlags, ReactionPatch, EventType,
            FunctionParagraphResponse, FunctionBook,
            TrackEventPayload, TrackEventResponse, TrackedEventBody,
        )
    ),
    tags(
        (name = "BookByte API", description = "Books, paragraphs, readers and their reactions.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// The error half of every handler result: a status code plus `{"error": ...}`.
pub type HandlerError = (StatusCode, Json<ErrorBody>);

pub type HandlerResult<T> = Result<T, HandlerError>;

pub fn error_response(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// Maps a port failure onto the status code the REST surface promises.
pub fn port_error(e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, msg),
        PortError::Conflict(msg) => error_response(StatusCode::BAD_REQUEST, msg),
        e @ PortError::InvalidInput(_) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        PortError::Unexpected(msg) => {
            error!("Unexpected storage failure: {}", msg);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, msg)
        }
    }
}

//=========================================================================================
// Extraction Helpers
//=========================================================================================

/// Unwraps a JSON body, turning a rejection into a 400 with the usual error body.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> HandlerResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Invalid data: {}", e.body_text())))
}

/// Unwraps a UUID path segment. A malformed id cannot name a row, so it is a 404.
pub fn path_id(id: Result<Path<Uuid>, PathRejection>, what: &str) -> HandlerResult<Uuid> {
    id.map(|Path(id)| id)
        .map_err(|_| error_response(StatusCode::NOT_FOUND, format!("{} not found", what)))
}

pub fn parse_uuid(raw: &str) -> HandlerResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Invalid data: {}", e)))
}

pub fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The server is up", body = HealthResponse))
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
