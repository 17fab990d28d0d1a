use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Shelter {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub contact_email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website_url: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

/// Column list matching [`Shelter`].
pub const SHELTER_COLUMNS: &str = "id, owner_id, name, contact_email, phone, address, \
     website_url, image_url, description, latitude, longitude, created_at";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateShelterRequest {
    pub name: String,
    pub contact_email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub website_url: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    /// Pre-provisioned invitation code; validated when supplied.
    pub code: Option<String>,
}

/// Partial update; omitted fields keep their stored value.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateShelterRequest {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub website_url: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShelterResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub contact_email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website_url: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

impl From<Shelter> for ShelterResponse {
    fn from(s: Shelter) -> Self {
        Self {
            id: s.id,
            owner_id: s.owner_id,
            name: s.name,
            contact_email: s.contact_email,
            phone: s.phone,
            address: s.address,
            website_url: s.website_url,
            image_url: s.image_url,
            description: s.description,
            latitude: s.latitude,
            longitude: s.longitude,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShelterDistanceResponse {
    pub shelter: ShelterResponse,
    /// Great-circle distance from the query point, in meters.
    pub distance_meters: f64,
}
