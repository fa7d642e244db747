pub mod health;
pub mod users;

use axum::{
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::dto::user_dto::{SignupPayload, UserResponse};
use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::list_users,
        users::search_users,
        users::update_user,
        users::create_user,
        users::delete_user,
    ),
    components(schemas(UserResponse, SignupPayload)),
    tags((name = "users", description = "User management"))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/users", get(users::list_users))
        .route("/users/search", get(users::search_users))
        .route(
            "/users/update",
            put(users::update_user).post(users::update_user),
        )
        .route("/users/create", post(users::create_user))
        .route("/users/delete", delete(users::delete_user))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
