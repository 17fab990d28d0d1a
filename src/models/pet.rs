use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "pet_species", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Dog,
    Cat,
    Rabbit,
    Bird,
    Reptile,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "pet_size", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PetSize {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "pet_gender", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PetGender {
    Male,
    Female,
    Unknown,
}

/// Age bracket rather than an exact age; listings rarely know a birth date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "pet_age", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PetAge {
    Baby,
    Young,
    Adult,
    Senior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "adoption_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AdoptionStatus {
    Available,
    Pending,
    Adopted,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Pet {
    pub id: Uuid,
    pub shelter_id: Uuid,
    pub name: String,
    pub age: Option<PetAge>,
    pub description: Option<String>,
    pub personality: Option<String>,
    pub medical_info: Option<String>,
    pub species: Species,
    pub size: PetSize,
    pub gender: PetGender,
    pub status: AdoptionStatus,
    pub image_urls: Vec<String>,
    /// Copied from the owning shelter when the listing is created.
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

/// Column list matching [`Pet`].
pub const PET_COLUMNS: &str = "id, shelter_id, name, age, description, personality, \
     medical_info, species, size, gender, status, image_urls, latitude, longitude, created_at";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePetRequest {
    pub name: String,
    pub age: Option<PetAge>,
    pub description: Option<String>,
    pub personality: Option<String>,
    pub medical_info: Option<String>,
    pub species: Species,
    pub size: PetSize,
    pub gender: PetGender,
    /// Defaults to `available`.
    pub status: Option<AdoptionStatus>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PetFilterQuery {
    pub species: Option<Species>,
    pub size: Option<PetSize>,
    pub gender: Option<PetGender>,
    pub status: Option<AdoptionStatus>,
    pub age: Option<PetAge>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Results per page (default 20, capped at 100).
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PetResponse {
    pub id: Uuid,
    pub shelter_id: Uuid,
    pub name: String,
    pub age: Option<PetAge>,
    pub description: Option<String>,
    pub personality: Option<String>,
    pub medical_info: Option<String>,
    pub species: Species,
    pub size: PetSize,
    pub gender: PetGender,
    pub status: AdoptionStatus,
    pub image_urls: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

impl From<Pet> for PetResponse {
    fn from(p: Pet) -> Self {
        Self {
            id: p.id,
            shelter_id: p.shelter_id,
            name: p.name,
            age: p.age,
            description: p.description,
            personality: p.personality,
            medical_info: p.medical_info,
            species: p.species,
            size: p.size,
            gender: p.gender,
            status: p.status,
            image_urls: p.image_urls,
            latitude: p.latitude,
            longitude: p.longitude,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PetDistanceResponse {
    pub pet: PetResponse,
    /// Great-circle distance from the query point, in meters.
    pub distance_meters: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&Species::Dog).unwrap(), "\"dog\"");
        assert_eq!(serde_json::to_string(&PetSize::Large).unwrap(), "\"large\"");
        assert_eq!(serde_json::to_string(&PetGender::Unknown).unwrap(), "\"unknown\"");
        assert_eq!(serde_json::to_string(&PetAge::Senior).unwrap(), "\"senior\"");
        assert_eq!(
            serde_json::to_string(&AdoptionStatus::Available).unwrap(),
            "\"available\""
        );
    }

    #[test]
    fn unknown_enum_values_are_rejected() {
        assert!(serde_json::from_str::<Species>("\"dragon\"").is_err());
        assert!(serde_json::from_str::<AdoptionStatus>("\"sold\"").is_err());
    }

    #[test]
    fn create_request_defaults_status_to_none() {
        let req: CreatePetRequest = serde_json::from_str(
            r#"{"name":"Luna","species":"cat","size":"small","gender":"female"}"#,
        )
        .unwrap();
        assert!(req.status.is_none());
        assert!(req.age.is_none());
        assert_eq!(req.species, Species::Cat);
    }
}
