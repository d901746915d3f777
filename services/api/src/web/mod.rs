pub mod books;
pub mod events;
pub mod functions;
pub mod paragraphs;
pub mod rest;
pub mod state;
pub mod users;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::web::rest::ApiDoc;
use crate::web::state::AppState;

pub use rest::health_handler;

/// Builds the complete application: REST routes, function endpoints, Swagger UI.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = cors_layer(&app_state.config.cors_origin);

    let api_router = Router::new()
        .route("/health", get(health_handler))
        // --- Books ---
        .route(
            "/books/",
            get(books::list_books_handler).post(books::create_book_handler),
        )
        .route(
            "/books/{id}/",
            get(books::get_book_handler)
                .put(books::update_book_handler)
                .delete(books::delete_book_handler),
        )
        // --- Paragraphs ---
        .route(
            "/paragraphs/",
            get(paragraphs::list_paragraphs_handler).post(paragraphs::create_paragraph_handler),
        )
        .route(
            "/paragraphs/random/",
            get(paragraphs::random_paragraphs_handler),
        )
        .route(
            "/paragraphs/{id}/",
            get(paragraphs::get_paragraph_handler)
                .put(paragraphs::update_paragraph_handler)
                .delete(paragraphs::delete_paragraph_handler),
        )
        // --- Users ---
        .route(
            "/users/",
            get(users::list_users_handler).post(users::create_user_handler),
        )
        .route(
            "/users/{id}/",
            get(users::get_user_handler)
                .put(users::update_user_handler)
                .delete(users::delete_user_handler),
        )
        // --- Events ---
        .route(
            "/events/",
            get(events::list_events_handler).post(events::upsert_event_handler),
        )
        .route(
            "/events/{id}/",
            get(events::get_event_handler)
                .put(events::update_event_handler)
                .delete(events::delete_event_handler),
        )
        .route(
            "/events/user/{user_id}/paragraph/{paragraph_id}/",
            get(events::user_paragraph_event_handler),
        )
        // --- Functions ---
        .route(
            "/functions/random-paragraph",
            get(functions::random_paragraph_function),
        )
        .route(
            "/functions/track-event",
            post(functions::track_event_function),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::from(Any)
    } else {
        match origin.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!(origin, "CORS_ORIGIN is not a valid header value; allowing any origin");
                AllowOrigin::from(Any)
            }
        }
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
}
