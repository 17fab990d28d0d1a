pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub listen_addr: String,
    /// Comma-separated allowed CORS origins. If empty or "*", allows all origins (dev mode).
    pub cors_origins: String,
    /// Audience (app bundle / services id) expected in Apple identity tokens.
    pub apple_client_id: Option<String>,
    /// Directory pet images are written to; served under /uploads.
    pub upload_dir: String,
    /// Base URL clients reach this server on, used to build image URLs.
    pub public_url: String,
    /// Base URL embedded in password-reset mails; the token is appended as a query param.
    pub reset_url: String,
    pub smtp: Option<SmtpConfig>,
}

pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let public_url =
            std::env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            cors_origins: std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            apple_client_id: std::env::var("APPLE_CLIENT_ID").ok(),
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            reset_url: std::env::var("RESET_URL")
                .unwrap_or_else(|_| format!("{public_url}/reset-password")),
            public_url,
            smtp: SmtpConfig::from_env(),
        }
    }
}

impl SmtpConfig {
    /// Mail is optional: configured only when both SMTP_HOST and SMTP_FROM are set.
    fn from_env() -> Option<Self> {
        let host = std::env::var("SMTP_HOST").ok()?;
        let from_address = std::env::var("SMTP_FROM").ok()?;
        Some(Self {
            host,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_address,
        })
    }
}
