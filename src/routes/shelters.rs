use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use crate::geo::{self, DistanceQuery, Page};
use crate::middleware::auth::AuthUser;
use crate::models::shelter::{
    CreateShelterRequest, Shelter, ShelterDistanceResponse, ShelterResponse,
    UpdateShelterRequest, SHELTER_COLUMNS,
};
use crate::models::user::UserRole;
use crate::routes::{err, ApiError};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_shelters))
        .route("/", post(create_shelter))
        .route("/", patch(update_shelter))
        .route("/byDistance", get(shelters_by_distance))
        .route("/{id}", get(get_shelter))
        .route("/{id}", delete(delete_shelter))
}

#[utoipa::path(
    get,
    path = "/shelters",
    responses(
        (status = 200, description = "All shelters", body = Vec<ShelterResponse>),
    ),
    tag = "Shelters"
)]
pub(crate) async fn list_shelters(
    State(state): State<AppState>,
) -> Result<Json<Vec<ShelterResponse>>, (StatusCode, Json<ApiError>)> {
    let shelters = sqlx::query_as::<_, Shelter>(&format!(
        "SELECT {SHELTER_COLUMNS} FROM shelters ORDER BY created_at DESC"
    ))
    .fetch_all(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    Ok(Json(shelters.into_iter().map(ShelterResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/shelters/{id}",
    params(("id" = Uuid, Path, description = "Shelter UUID")),
    responses(
        (status = 200, description = "The shelter", body = ShelterResponse),
        (status = 404, description = "Shelter not found", body = ApiError),
    ),
    tag = "Shelters"
)]
pub(crate) async fn get_shelter(
    State(state): State<AppState>,
    Path(shelter_id): Path<Uuid>,
) -> Result<Json<ShelterResponse>, (StatusCode, Json<ApiError>)> {
    let shelter = sqlx::query_as::<_, Shelter>(&format!(
        "SELECT {SHELTER_COLUMNS} FROM shelters WHERE id = $1"
    ))
    .bind(shelter_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?
    .ok_or_else(|| err(StatusCode::NOT_FOUND, "Shelter not found"))?;

    Ok(Json(shelter.into()))
}

#[utoipa::path(
    post,
    path = "/shelters",
    request_body = CreateShelterRequest,
    responses(
        (status = 201, description = "Shelter created", body = ShelterResponse),
        (status = 403, description = "Not a shelter account, or invalid code", body = ApiError),
        (status = 409, description = "User already owns a shelter", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Shelters"
)]
pub(crate) async fn create_shelter(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateShelterRequest>,
) -> Result<(StatusCode, Json<ShelterResponse>), (StatusCode, Json<ApiError>)> {
    if auth.user.role != UserRole::Shelter {
        return Err(err(
            StatusCode::FORBIDDEN,
            "Only shelter accounts can create a shelter",
        ));
    }
    if auth.user.shelter_id.is_some() {
        return Err(err(StatusCode::CONFLICT, "User already owns a shelter"));
    }

    if let Some(code) = &req.code {
        let known: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM shelter_codes WHERE code = $1)")
                .bind(code)
                .fetch_one(&state.db)
                .await
                .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;
        if !known {
            return Err(err(StatusCode::FORBIDDEN, "Invalid shelter code"));
        }
    }

    let shelter = sqlx::query_as::<_, Shelter>(&format!(
        "INSERT INTO shelters (owner_id, name, contact_email, phone, address,
                               website_url, image_url, description, latitude, longitude)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING {SHELTER_COLUMNS}",
    ))
    .bind(auth.user.id)
    .bind(req.name.trim())
    .bind(req.contact_email.trim())
    .bind(&req.phone)
    .bind(&req.address)
    .bind(&req.website_url)
    .bind(&req.image_url)
    .bind(&req.description)
    .bind(req.latitude)
    .bind(req.longitude)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique") || e.to_string().contains("duplicate") {
            err(
                StatusCode::CONFLICT,
                "A shelter with this owner or contact email already exists",
            )
        } else {
            err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create shelter")
        }
    })?;

    sqlx::query("UPDATE users SET shelter_id = $1, updated_at = NOW() WHERE id = $2")
        .bind(shelter.id)
        .bind(auth.user.id)
        .execute(&state.db)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    Ok((StatusCode::CREATED, Json(shelter.into())))
}

#[utoipa::path(
    patch,
    path = "/shelters",
    request_body = UpdateShelterRequest,
    responses(
        (status = 200, description = "Updated shelter profile", body = ShelterResponse),
        (status = 403, description = "Caller owns no shelter", body = ApiError),
        (status = 404, description = "Shelter not found", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Shelters"
)]
pub(crate) async fn update_shelter(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateShelterRequest>,
) -> Result<Json<ShelterResponse>, (StatusCode, Json<ApiError>)> {
    let shelter_id = match (auth.user.role, auth.user.shelter_id) {
        (UserRole::Shelter, Some(id)) => id,
        _ => {
            return Err(err(
                StatusCode::FORBIDDEN,
                "Only shelters can update their profile",
            ))
        }
    };

    let shelter = sqlx::query_as::<_, Shelter>(&format!(
        "UPDATE shelters SET
             name = COALESCE($1, name),
             contact_email = COALESCE($2, contact_email),
             phone = COALESCE($3, phone),
             address = COALESCE($4, address),
             latitude = COALESCE($5, latitude),
             longitude = COALESCE($6, longitude),
             website_url = COALESCE($7, website_url),
             image_url = COALESCE($8, image_url),
             description = COALESCE($9, description),
             updated_at = NOW()
         WHERE id = $10
         RETURNING {SHELTER_COLUMNS}",
    ))
    .bind(&req.name)
    .bind(&req.contact_email)
    .bind(&req.phone)
    .bind(&req.address)
    .bind(req.latitude)
    .bind(req.longitude)
    .bind(&req.website_url)
    .bind(&req.image_url)
    .bind(&req.description)
    .bind(shelter_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?
    .ok_or_else(|| err(StatusCode::NOT_FOUND, "Shelter not found"))?;

    Ok(Json(shelter.into()))
}

#[utoipa::path(
    delete,
    path = "/shelters/{id}",
    params(("id" = Uuid, Path, description = "Shelter UUID")),
    responses(
        (status = 204, description = "Shelter deleted"),
        (status = 403, description = "Not the owner", body = ApiError),
        (status = 404, description = "Shelter not found", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Shelters"
)]
pub(crate) async fn delete_shelter(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(shelter_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let owner_id: Uuid = sqlx::query_scalar("SELECT owner_id FROM shelters WHERE id = $1")
        .bind(shelter_id)
        .fetch_optional(&state.db)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "Shelter not found"))?;

    if owner_id != auth.user.id {
        return Err(err(StatusCode::FORBIDDEN, "Not the owner of this shelter"));
    }

    sqlx::query("DELETE FROM shelters WHERE id = $1")
        .bind(shelter_id)
        .execute(&state.db)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/shelters/byDistance",
    params(DistanceQuery),
    responses(
        (status = 200, description = "Shelters within the radius, closest first",
         body = Page<ShelterDistanceResponse>),
    ),
    tag = "Shelters"
)]
pub(crate) async fn shelters_by_distance(
    State(state): State<AppState>,
    Query(query): Query<DistanceQuery>,
) -> Result<Json<Page<ShelterDistanceResponse>>, (StatusCode, Json<ApiError>)> {
    let shelters = sqlx::query_as::<_, Shelter>(&format!(
        "SELECT {SHELTER_COLUMNS} FROM shelters"
    ))
    .fetch_all(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    let (ranked, total) =
        geo::within_radius(shelters, &query, |s| (s.id, s.latitude, s.longitude));
    let items = ranked
        .into_iter()
        .map(|(shelter, distance_meters)| ShelterDistanceResponse {
            shelter: shelter.into(),
            distance_meters,
        })
        .collect();

    Ok(Json(Page::new(items, total, &query)))
}
