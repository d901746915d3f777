//! services/api/src/web/users.rs

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use bookbyte_core::protocol::{
    CreatedResponse, ErrorBody, MessageResponse, UserPayload, UserResponse, UserUpdatePayload,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::web::rest::{error_response, json_body, message, path_id, port_error, HandlerResult};
use crate::web::state::AppState;

#[utoipa::path(
    get,
    path = "/users/",
    responses((status = 200, description = "All registered identifiers", body = [UserResponse]))
)]
pub async fn list_users_handler(
    State(app_state): State<Arc<AppState>>,
) -> HandlerResult<impl IntoResponse> {
    let users = app_state
        .db
        .list_user_identifiers()
        .await
        .map_err(port_error)?;
    Ok(Json(
        users.into_iter().map(UserResponse::from).collect::<Vec<_>>(),
    ))
}

/// Register a pseudonymous identifier.
#[utoipa::path(
    post,
    path = "/users/",
    request_body = UserPayload,
    responses(
        (status = 201, description = "Identifier registered", body = CreatedResponse),
        (status = 400, description = "Identifier already exists", body = ErrorBody)
    )
)]
pub async fn create_user_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let payload = json_body(payload)?;
    if payload.identifier.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Invalid data: identifier must not be empty",
        ));
    }
    let user = app_state
        .db
        .create_user_identifier(&payload.identifier)
        .await
        .map_err(port_error)?;
    info!(user_id = %user.id, "UserIdentifier registered");
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: user.id,
            message: "UserIdentifier created successfully".to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/users/{id}/",
    params(("id" = Uuid, Path, description = "Row id of the identifier")),
    responses(
        (status = 200, description = "The identifier", body = UserResponse),
        (status = 404, description = "UserIdentifier not found", body = ErrorBody)
    )
)]
pub async fn get_user_handler(
    State(app_state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> HandlerResult<impl IntoResponse> {
    let id = path_id(id, "UserIdentifier")?;
    let user = app_state
        .db
        .get_user_identifier(id)
        .await
        .map_err(port_error)?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/users/{id}/",
    params(("id" = Uuid, Path, description = "Row id of the identifier")),
    request_body = UserUpdatePayload,
    responses(
        (status = 200, description = "Identifier updated", body = MessageResponse),
        (status = 400, description = "Identifier taken by another user", body = ErrorBody),
        (status = 404, description = "UserIdentifier not found", body = ErrorBody)
    )
)]
pub async fn update_user_handler(
    State(app_state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UserUpdatePayload>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let id = path_id(id, "UserIdentifier")?;
    let payload = json_body(payload)?;
    match payload.identifier {
        Some(identifier) => {
            app_state
                .db
                .update_user_identifier(id, &identifier)
                .await
                .map_err(port_error)?;
        }
        None => {
            app_state
                .db
                .get_user_identifier(id)
                .await
                .map_err(port_error)?;
        }
    }
    Ok(message("UserIdentifier updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/",
    params(("id" = Uuid, Path, description = "Row id of the identifier")),
    responses(
        (status = 200, description = "Identifier deleted", body = MessageResponse),
        (status = 404, description = "UserIdentifier not found", body = ErrorBody)
    )
)]
pub async fn delete_user_handler(
    State(app_state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> HandlerResult<impl IntoResponse> {
    let id = path_id(id, "UserIdentifier")?;
    app_state
        .db
        .delete_user_identifier(id)
        .await
        .map_err(port_error)?;
    Ok(message("UserIdentifier deleted successfully"))
}
