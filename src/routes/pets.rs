use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::geo::{self, DistanceQuery, Page};
use crate::middleware::auth::AuthUser;
use crate::models::pet::{
    AdoptionStatus, CreatePetRequest, ListQuery, Pet, PetDistanceResponse, PetFilterQuery,
    PetResponse, PET_COLUMNS,
};
use crate::models::user::UserRole;
use crate::routes::{err, ApiError};
use crate::AppState;

/// Route-level cap on image upload bodies.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pets))
        .route("/", post(create_pet))
        .route("/byDistance", get(pets_by_distance))
        .route("/byFilters", get(pets_by_filters))
        .route("/shelter", get(shelter_pets))
        .route("/{id}", get(get_pet))
        .route("/{id}", delete(delete_pet))
        .route(
            "/{id}/images",
            post(upload_pet_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
}

/// The shelter the authenticated user owns, or 403.
fn require_owned_shelter(auth: &AuthUser) -> Result<Uuid, (StatusCode, Json<ApiError>)> {
    match (auth.user.role, auth.user.shelter_id) {
        (UserRole::Shelter, Some(id)) => Ok(id),
        _ => Err(err(
            StatusCode::FORBIDDEN,
            "Only shelter accounts with a shelter profile can manage pets",
        )),
    }
}

#[utoipa::path(
    get,
    path = "/pets",
    params(ListQuery),
    responses(
        (status = 200, description = "Pet listings, newest first", body = Vec<PetResponse>),
    ),
    tag = "Pets"
)]
pub(crate) async fn list_pets(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PetResponse>>, (StatusCode, Json<ApiError>)> {
    let per_page = i64::from(query.per_page.unwrap_or(20).clamp(1, 100));
    let offset = (i64::from(query.page.unwrap_or(1).max(1)) - 1) * per_page;

    let pets = sqlx::query_as::<_, Pet>(&format!(
        "SELECT {PET_COLUMNS} FROM pets ORDER BY created_at DESC LIMIT $1 OFFSET $2"
    ))
    .bind(per_page)
    .bind(offset)
    .fetch_all(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    Ok(Json(pets.into_iter().map(PetResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/pets/{id}",
    params(("id" = Uuid, Path, description = "Pet UUID")),
    responses(
        (status = 200, description = "The pet", body = PetResponse),
        (status = 404, description = "Pet not found", body = ApiError),
    ),
    tag = "Pets"
)]
pub(crate) async fn get_pet(
    State(state): State<AppState>,
    Path(pet_id): Path<Uuid>,
) -> Result<Json<PetResponse>, (StatusCode, Json<ApiError>)> {
    let pet = sqlx::query_as::<_, Pet>(&format!(
        "SELECT {PET_COLUMNS} FROM pets WHERE id = $1"
    ))
    .bind(pet_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?
    .ok_or_else(|| err(StatusCode::NOT_FOUND, "Pet not found"))?;

    Ok(Json(pet.into()))
}

#[utoipa::path(
    post,
    path = "/pets",
    request_body = CreatePetRequest,
    responses(
        (status = 201, description = "Listing created", body = PetResponse),
        (status = 403, description = "Caller owns no shelter", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Pets"
)]
pub(crate) async fn create_pet(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreatePetRequest>,
) -> Result<(StatusCode, Json<PetResponse>), (StatusCode, Json<ApiError>)> {
    let shelter_id = require_owned_shelter(&auth)?;

    // Listings inherit the shelter's coordinates at creation time.
    let (latitude, longitude): (f64, f64) =
        sqlx::query_as("SELECT latitude, longitude FROM shelters WHERE id = $1")
            .bind(shelter_id)
            .fetch_optional(&state.db)
            .await
            .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?
            .ok_or_else(|| err(StatusCode::NOT_FOUND, "Shelter not found"))?;

    let pet = sqlx::query_as::<_, Pet>(&format!(
        "INSERT INTO pets (shelter_id, name, age, description, personality, medical_info,
                           species, size, gender, status, latitude, longitude)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING {PET_COLUMNS}",
    ))
    .bind(shelter_id)
    .bind(req.name.trim())
    .bind(req.age)
    .bind(&req.description)
    .bind(&req.personality)
    .bind(&req.medical_info)
    .bind(req.species)
    .bind(req.size)
    .bind(req.gender)
    .bind(req.status.unwrap_or(AdoptionStatus::Available))
    .bind(latitude)
    .bind(longitude)
    .fetch_one(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create pet"))?;

    Ok((StatusCode::CREATED, Json(pet.into())))
}

#[utoipa::path(
    delete,
    path = "/pets/{id}",
    params(("id" = Uuid, Path, description = "Pet UUID")),
    responses(
        (status = 204, description = "Listing deleted"),
        (status = 403, description = "Pet belongs to another shelter", body = ApiError),
        (status = 404, description = "Pet not found", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Pets"
)]
pub(crate) async fn delete_pet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(pet_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let shelter_id = require_owned_shelter(&auth)?;

    let owner: Uuid = sqlx::query_scalar("SELECT shelter_id FROM pets WHERE id = $1")
        .bind(pet_id)
        .fetch_optional(&state.db)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "Pet not found"))?;

    if owner != shelter_id {
        return Err(err(StatusCode::FORBIDDEN, "Pet belongs to another shelter"));
    }

    sqlx::query("DELETE FROM pets WHERE id = $1")
        .bind(pet_id)
        .execute(&state.db)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/pets/shelter",
    responses(
        (status = 200, description = "The caller's own listings", body = Vec<PetResponse>),
        (status = 403, description = "Caller owns no shelter", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Pets"
)]
pub(crate) async fn shelter_pets(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<PetResponse>>, (StatusCode, Json<ApiError>)> {
    let shelter_id = require_owned_shelter(&auth)?;

    let pets = sqlx::query_as::<_, Pet>(&format!(
        "SELECT {PET_COLUMNS} FROM pets WHERE shelter_id = $1 ORDER BY created_at DESC"
    ))
    .bind(shelter_id)
    .fetch_all(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    Ok(Json(pets.into_iter().map(PetResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/pets/byFilters",
    params(PetFilterQuery),
    responses(
        (status = 200, description = "Pets matching every supplied filter", body = Vec<PetResponse>),
        (status = 400, description = "Unknown enum value in a filter", body = ApiError),
    ),
    tag = "Pets"
)]
pub(crate) async fn pets_by_filters(
    State(state): State<AppState>,
    Query(filter): Query<PetFilterQuery>,
) -> Result<Json<Vec<PetResponse>>, (StatusCode, Json<ApiError>)> {
    let pets = sqlx::query_as::<_, Pet>(&format!(
        "SELECT {PET_COLUMNS} FROM pets
         WHERE ($1 IS NULL OR species = $1)
           AND ($2 IS NULL OR size = $2)
           AND ($3 IS NULL OR gender = $3)
           AND ($4 IS NULL OR status = $4)
           AND ($5 IS NULL OR age = $5)
         ORDER BY created_at DESC",
    ))
    .bind(filter.species)
    .bind(filter.size)
    .bind(filter.gender)
    .bind(filter.status)
    .bind(filter.age)
    .fetch_all(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    Ok(Json(pets.into_iter().map(PetResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/pets/byDistance",
    params(DistanceQuery),
    responses(
        (status = 200, description = "Pets within the radius, closest first",
         body = Page<PetDistanceResponse>),
    ),
    tag = "Pets"
)]
pub(crate) async fn pets_by_distance(
    State(state): State<AppState>,
    Query(query): Query<DistanceQuery>,
) -> Result<Json<Page<PetDistanceResponse>>, (StatusCode, Json<ApiError>)> {
    let pets = sqlx::query_as::<_, Pet>(&format!("SELECT {PET_COLUMNS} FROM pets"))
        .fetch_all(&state.db)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    let (ranked, total) = geo::within_radius(pets, &query, |p| (p.id, p.latitude, p.longitude));
    let items = ranked
        .into_iter()
        .map(|(pet, distance_meters)| PetDistanceResponse {
            pet: pet.into(),
            distance_meters,
        })
        .collect();

    Ok(Json(Page::new(items, total, &query)))
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[utoipa::path(
    post,
    path = "/pets/{id}/images",
    params(("id" = Uuid, Path, description = "Pet UUID")),
    request_body(content = Vec<u8>, content_type = "multipart/form-data",
                 description = "Image file (jpeg, png or webp), at most 10 MiB"),
    responses(
        (status = 201, description = "Image stored, listing updated", body = PetResponse),
        (status = 400, description = "Missing or unsupported image", body = ApiError),
        (status = 403, description = "Pet belongs to another shelter", body = ApiError),
        (status = 404, description = "Pet not found", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Pets"
)]
pub(crate) async fn upload_pet_image(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(pet_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PetResponse>), (StatusCode, Json<ApiError>)> {
    let shelter_id = require_owned_shelter(&auth)?;

    let owner: Uuid = sqlx::query_scalar("SELECT shelter_id FROM pets WHERE id = $1")
        .bind(pet_id)
        .fetch_optional(&state.db)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "Pet not found"))?;

    if owner != shelter_id {
        return Err(err(StatusCode::FORBIDDEN, "Pet belongs to another shelter"));
    }

    let field = multipart
        .next_field()
        .await
        .map_err(|_| err(StatusCode::BAD_REQUEST, "Malformed multipart body"))?
        .ok_or_else(|| err(StatusCode::BAD_REQUEST, "Missing image field"))?;

    let ext = field
        .content_type()
        .and_then(image_extension)
        .ok_or_else(|| err(StatusCode::BAD_REQUEST, "Unsupported image type"))?;

    let data = field
        .bytes()
        .await
        .map_err(|_| err(StatusCode::BAD_REQUEST, "Failed to read upload"))?;
    if data.is_empty() {
        return Err(err(StatusCode::BAD_REQUEST, "Empty image upload"));
    }

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store image"))?;

    let filename = format!("{}.{ext}", Uuid::new_v4());
    let path = std::path::Path::new(&state.upload_dir).join(&filename);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store image"))?;

    let url = format!("{}/uploads/{}", state.public_url, filename);
    let pet = sqlx::query_as::<_, Pet>(&format!(
        "UPDATE pets SET image_urls = array_append(image_urls, $1), updated_at = NOW()
         WHERE id = $2
         RETURNING {PET_COLUMNS}",
    ))
    .bind(&url)
    .bind(pet_id)
    .fetch_one(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    Ok((StatusCode::CREATED, Json(pet.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_common_image_types_are_accepted() {
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("image/webp"), Some("webp"));
        assert_eq!(image_extension("image/gif"), None);
        assert_eq!(image_extension("application/pdf"), None);
    }
}
