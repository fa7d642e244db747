use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{Map, Value as JsonValue};

use crate::{
    dto::user_dto::{IdQuery, SearchQuery, SignupPayload},
    error::{Error, Result},
    AppState,
};

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All active users", body = [UserResponse])
    )
)]
#[axum::debug_handler]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let users = state.user_service.list_users().await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/users/search",
    params(
        ("search" = Option<String>, Query, description = "Substring of name or surname")
    ),
    responses(
        (status = 200, description = "Matching active users", body = [UserResponse])
    )
)]
#[axum::debug_handler]
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let users = state.user_service.search(&query.search).await?;
    Ok(Json(users))
}

#[utoipa::path(
    put,
    path = "/users/update",
    params(
        ("id" = i64, Query, description = "User ID")
    ),
    request_body = Object,
    responses(
        (status = 204, description = "User updated"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Validation failed")
    )
)]
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let id = query.id.ok_or_else(Error::not_found)?;
    let fields = parse_field_values(&body)?;
    state.user_service.update_user(id, &fields).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/users/create",
    request_body = SignupPayload,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 422, description = "Validation failed")
    )
)]
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    delete,
    path = "/users/delete",
    params(
        ("id" = i64, Query, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse> {
    let id = query.id.ok_or_else(Error::not_found)?;
    state.user_service.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// An empty body is an empty update.
fn parse_field_values(body: &[u8]) -> Result<Map<String, JsonValue>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice(body)? {
        JsonValue::Object(map) => Ok(map),
        _ => Err(Error::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
    }
}
