pub mod auth;
pub mod favorites;
pub mod pets;
pub mod shelters;

use axum::http::StatusCode;
use axum::{Json, Router};

use crate::AppState;

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ApiError {
    error: String,
}

pub(crate) fn err(status: StatusCode, msg: &str) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: msg.to_string(),
        }),
    )
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/pets", pets::router())
        .nest("/shelters", shelters::router())
        .nest("/favorites", favorites::router())
        .with_state(state)
}
