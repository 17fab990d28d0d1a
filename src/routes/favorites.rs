use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::models::pet::{Pet, PetResponse};
use crate::routes::{err, ApiError};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_favorites))
        .route("/{pet_id}", post(add_favorite))
        .route("/{pet_id}", delete(remove_favorite))
}

#[utoipa::path(
    get,
    path = "/favorites",
    responses(
        (status = 200, description = "The caller's favorited pets", body = Vec<PetResponse>),
    ),
    security(("bearer" = [])),
    tag = "Favorites"
)]
pub(crate) async fn list_favorites(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<PetResponse>>, (StatusCode, Json<ApiError>)> {
    let pets = sqlx::query_as::<_, Pet>(
        "SELECT p.id, p.shelter_id, p.name, p.age, p.description, p.personality,
                p.medical_info, p.species, p.size, p.gender, p.status, p.image_urls,
                p.latitude, p.longitude, p.created_at
         FROM pets p
         JOIN favorites f ON f.pet_id = p.id
         WHERE f.user_id = $1
         ORDER BY f.created_at DESC",
    )
    .bind(auth.user.id)
    .fetch_all(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    Ok(Json(pets.into_iter().map(PetResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/favorites/{pet_id}",
    params(("pet_id" = Uuid, Path, description = "Pet UUID")),
    responses(
        (status = 201, description = "Favorited (idempotent)"),
        (status = 404, description = "Pet not found", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Favorites"
)]
pub(crate) async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(pet_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pets WHERE id = $1)")
        .bind(pet_id)
        .fetch_one(&state.db)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;
    if !exists {
        return Err(err(StatusCode::NOT_FOUND, "Pet not found"));
    }

    sqlx::query(
        "INSERT INTO favorites (user_id, pet_id) VALUES ($1, $2)
         ON CONFLICT (user_id, pet_id) DO NOTHING",
    )
    .bind(auth.user.id)
    .bind(pet_id)
    .execute(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    Ok(StatusCode::CREATED)
}

#[utoipa::path(
    delete,
    path = "/favorites/{pet_id}",
    params(("pet_id" = Uuid, Path, description = "Pet UUID")),
    responses(
        (status = 204, description = "Favorite removed"),
        (status = 404, description = "Not favorited", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Favorites"
)]
pub(crate) async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(pet_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND pet_id = $2")
        .bind(auth.user.id)
        .bind(pet_id)
        .execute(&state.db)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    if result.rows_affected() == 0 {
        return Err(err(StatusCode::NOT_FOUND, "Favorite not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
