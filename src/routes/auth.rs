use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rand::{distributions::Alphanumeric, Rng};
use uuid::Uuid;

use crate::middleware::auth::{create_token, AuthUser};
use crate::models::user::{
    AppleSignInRequest, AuthResponse, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest,
    SignupRequest, User, UserResponse, UserRole, USER_COLUMNS,
};
use crate::models::password_reset::PasswordResetToken;
use crate::routes::{err, ApiError};
use crate::services::apple::AppleError;
use crate::AppState;

use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(current_user))
        .route("/create", post(create_account))
        .route("/login", post(login))
        .route("/apple", post(apple_sign_in))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

pub(crate) fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn generate_reset_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

#[utoipa::path(
    post,
    path = "/auth/create",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError),
    ),
    tag = "Auth"
)]
pub(crate) async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, Json<ApiError>)> {
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') || email.len() < 5 {
        return Err(err(StatusCode::BAD_REQUEST, "Invalid email"));
    }
    if req.password.len() < 8 {
        return Err(err(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
        ));
    }

    let hash = hash_password(&req.password)
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password"))?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4)
         RETURNING {USER_COLUMNS}",
    ))
    .bind(req.name.trim())
    .bind(&email)
    .bind(&hash)
    .bind(req.role)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique") || e.to_string().contains("duplicate") {
            err(StatusCode::CONFLICT, "Email already registered")
        } else {
            err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user")
        }
    })?;

    let token = create_token(user.id, &state.jwt_secret)
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create token"))?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ApiError),
    ),
    tag = "Auth"
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, Json<ApiError>)> {
    let email = req.email.trim().to_lowercase();

    // Same reason string whether the user is missing, Apple-only, or the
    // password is wrong: no account enumeration signal.
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(&email)
    .fetch_optional(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?
    .ok_or_else(|| err(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;

    if user.password_hash.is_empty() || !verify_password(&req.password, &user.password_hash) {
        return Err(err(StatusCode::UNAUTHORIZED, "Invalid credentials"));
    }

    let token = create_token(user.id, &state.jwt_secret)
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create token"))?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/apple",
    request_body = AppleSignInRequest,
    responses(
        (status = 200, description = "Signed in, account created on first use", body = AuthResponse),
        (status = 401, description = "Identity token rejected", body = ApiError),
        (status = 500, description = "Apple sign-in not configured", body = ApiError),
    ),
    tag = "Auth"
)]
pub(crate) async fn apple_sign_in(
    State(state): State<AppState>,
    Json(req): Json<AppleSignInRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, Json<ApiError>)> {
    let identity = state
        .apple
        .verify(&req.identity_token)
        .await
        .map_err(|e| match e {
            AppleError::NotConfigured => {
                err(StatusCode::INTERNAL_SERVER_ERROR, "Apple sign-in is not configured")
            }
            AppleError::Keys(_) => {
                err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch Apple public keys")
            }
            AppleError::UnknownKeyId | AppleError::Verification(_) => {
                err(StatusCode::UNAUTHORIZED, "Invalid identity token")
            }
        })?;

    let existing = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE apple_user_id = $1"
    ))
    .bind(&identity.sub)
    .fetch_optional(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    let user = match existing {
        Some(user) => user,
        None => {
            // First sign-in: local account with no usable password.
            let name = req.name.unwrap_or_else(|| "Adopter".to_string());
            sqlx::query_as::<_, User>(&format!(
                "INSERT INTO users (apple_user_id, name, email, password_hash, role)
                 VALUES ($1, $2, $3, '', $4)
                 RETURNING {USER_COLUMNS}",
            ))
            .bind(&identity.sub)
            .bind(name.trim())
            .bind(&identity.email)
            .bind(UserRole::Adopter)
            .fetch_one(&state.db)
            .await
            .map_err(|e| {
                if e.to_string().contains("unique") || e.to_string().contains("duplicate") {
                    err(StatusCode::CONFLICT, "Email already registered")
                } else {
                    err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user")
                }
            })?
        }
    };

    let token = create_token(user.id, &state.jwt_secret)
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create token"))?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/auth",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Auth"
)]
pub(crate) async fn current_user(auth: AuthUser) -> Json<UserResponse> {
    Json(auth.user.into())
}

#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Accepted whether or not the email is registered"),
        (status = 500, description = "Mail transport not configured", body = ApiError),
    ),
    tag = "Auth"
)]
pub(crate) async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiError>)> {
    let Some(mailer) = state.mailer.as_ref() else {
        return Err(err(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Mail transport is not configured",
        ));
    };

    let email = req.email.trim().to_lowercase();

    let user_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    if let Some(user_id) = user_id {
        let token = generate_reset_token();
        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token, expires_at)
             VALUES ($1, $2, NOW() + INTERVAL '1 hour')",
        )
        .bind(user_id)
        .bind(&token)
        .execute(&state.db)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

        let link = format!("{}?token={}", state.reset_url, token);
        if let Err(e) = mailer.send_password_reset(&email, &link).await {
            // Still report success to the caller; existence must not leak.
            tracing::error!("failed to send password reset email: {e}");
        }
    }

    Ok(Json(serde_json::json!({
        "message": "If that email is registered, a reset link has been sent",
    })))
}

#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Invalid, used or expired token", body = ApiError),
    ),
    tag = "Auth"
)]
pub(crate) async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiError>)> {
    if req.new_password.len() < 8 {
        return Err(err(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
        ));
    }

    let reset = sqlx::query_as::<_, PasswordResetToken>(
        "SELECT id, user_id, token, expires_at, used, created_at
         FROM password_reset_tokens WHERE token = $1",
    )
    .bind(&req.token)
    .fetch_optional(&state.db)
    .await
    .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?
    .filter(|r| r.is_usable(chrono::Utc::now()))
    .ok_or_else(|| err(StatusCode::BAD_REQUEST, "Invalid or expired reset token"))?;

    let hash = hash_password(&req.new_password)
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password"))?;

    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&hash)
        .bind(reset.user_id)
        .execute(&state.db)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE id = $1")
        .bind(reset.id)
        .execute(&state.db)
        .await
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

    Ok(Json(serde_json::json!({ "message": "Password updated" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    use crate::services::apple::AppleVerifier;

    fn test_state(apple_audience: Option<&str>) -> AppState {
        AppState {
            db: sqlx::PgPool::connect_lazy("postgres://postgres@localhost/pawhaven_test")
                .expect("lazy pool"),
            jwt_secret: "test-secret".to_string(),
            apple: Arc::new(AppleVerifier::new(apple_audience.map(str::to_string))),
            mailer: None,
            upload_dir: "./uploads".to_string(),
            public_url: "http://localhost:3000".to_string(),
            reset_url: "http://localhost:3000/reset-password".to_string(),
        }
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn hashed_passwords_verify() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn empty_stored_hash_never_verifies() {
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn reset_tokens_are_long_and_alphanumeric() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_reset_token());
    }

    #[tokio::test]
    async fn current_user_without_token_is_unauthorized() {
        let app = router().with_state(test_state(None));
        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_authorization_is_unauthorized() {
        let app = router().with_state(test_state(None));
        let res = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("Authorization", "Basic dXNlcjpwYXNz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_bearer_token_is_unauthorized() {
        let app = router().with_state(test_state(None));
        let res = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("Authorization", "Bearer garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signup_rejects_invalid_email() {
        let app = router().with_state(test_state(None));
        let res = app
            .oneshot(post_json(
                "/create",
                r#"{"name":"A","email":"nope","password":"longenough","role":"adopter"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signup_rejects_short_password() {
        let app = router().with_state(test_state(None));
        let res = app
            .oneshot(post_json(
                "/create",
                r#"{"name":"A","email":"a@b.com","password":"short","role":"shelter"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn apple_sign_in_without_configuration_is_a_server_error() {
        let app = router().with_state(test_state(None));
        let res = app
            .oneshot(post_json("/apple", r#"{"identity_token":"abc"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn apple_sign_in_rejects_malformed_identity_tokens() {
        let app = router().with_state(test_state(Some("com.example.app")));
        let res = app
            .oneshot(post_json("/apple", r#"{"identity_token":"abc"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn forgot_password_without_mail_transport_is_a_server_error() {
        let app = router().with_state(test_state(None));
        let res = app
            .oneshot(post_json("/forgot-password", r#"{"email":"a@b.com"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn reset_password_rejects_short_replacements() {
        let app = router().with_state(test_state(None));
        let res = app
            .oneshot(post_json(
                "/reset-password",
                r#"{"token":"sometoken","new_password":"short"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
