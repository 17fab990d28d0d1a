mod config;
mod geo;
mod middleware;
mod models;
mod routes;
mod services;

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use services::apple::AppleVerifier;
use services::email::EmailService;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub jwt_secret: String,
    /// Verifier for Apple identity tokens, with an in-process JWK cache.
    pub apple: Arc<AppleVerifier>,
    /// SMTP transport for reset mail; None when SMTP is not configured.
    pub mailer: Option<EmailService>,
    pub upload_dir: String,
    pub public_url: String,
    pub reset_url: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::auth::create_account,
        routes::auth::login,
        routes::auth::apple_sign_in,
        routes::auth::current_user,
        routes::auth::forgot_password,
        routes::auth::reset_password,
        routes::pets::list_pets,
        routes::pets::get_pet,
        routes::pets::create_pet,
        routes::pets::delete_pet,
        routes::pets::shelter_pets,
        routes::pets::pets_by_filters,
        routes::pets::pets_by_distance,
        routes::pets::upload_pet_image,
        routes::shelters::list_shelters,
        routes::shelters::get_shelter,
        routes::shelters::create_shelter,
        routes::shelters::update_shelter,
        routes::shelters::delete_shelter,
        routes::shelters::shelters_by_distance,
        routes::favorites::list_favorites,
        routes::favorites::add_favorite,
        routes::favorites::remove_favorite,
    ),
    components(schemas(
        routes::ApiError,
        models::user::SignupRequest,
        models::user::LoginRequest,
        models::user::AppleSignInRequest,
        models::user::ForgotPasswordRequest,
        models::user::ResetPasswordRequest,
        models::user::UserResponse,
        models::user::AuthResponse,
        models::user::UserRole,
        models::shelter::CreateShelterRequest,
        models::shelter::UpdateShelterRequest,
        models::shelter::ShelterResponse,
        models::shelter::ShelterDistanceResponse,
        models::pet::CreatePetRequest,
        models::pet::PetResponse,
        models::pet::PetDistanceResponse,
        models::pet::Species,
        models::pet::PetSize,
        models::pet::PetGender,
        models::pet::PetAge,
        models::pet::AdoptionStatus,
        geo::DistanceQuery,
        geo::Page<models::pet::PetDistanceResponse>,
        geo::Page<models::shelter::ShelterDistanceResponse>,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Accounts, sign-in & password recovery"),
        (name = "Pets", description = "Adoption listings, filters & proximity search"),
        (name = "Shelters", description = "Shelter profiles & proximity search"),
        (name = "Favorites", description = "Per-user bookmarked pets")
    ),
    security(("bearer" = []))
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                ),
            ),
        );
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("pawhaven_server=debug,tower_http=debug")
        .init();

    let config = config::Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./src/db/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let cors = if config.cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(tower_http::cors::Any)
            .allow_credentials(true)
    };

    let mailer = config.smtp.as_ref().map(|smtp| {
        EmailService::new(smtp).expect("Failed to build SMTP transport")
    });
    if mailer.is_none() {
        tracing::warn!("SMTP not configured; password-reset mail is disabled");
    }

    let state = AppState {
        db: pool,
        jwt_secret: config.jwt_secret,
        apple: Arc::new(AppleVerifier::new(config.apple_client_id)),
        mailer,
        upload_dir: config.upload_dir.clone(),
        public_url: config.public_url,
        reset_url: config.reset_url,
    };

    let app = routes::api_router(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .unwrap();
    tracing::info!("Listening on {}", config.listen_addr);
    tracing::info!("Swagger UI at http://{}/docs/", config.listen_addr);
    axum::serve(listener, app).await.unwrap();
}
