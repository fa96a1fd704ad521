use actix_web::http::header::HeaderValue;
use serde::Deserialize;

use crate::error::{AppError, ConfigError};

/// Environment variable holding the access token signing secret
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub storage: StorageSettings,
}

/// Browser origin allowed to call the API when none is configured
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Single origin answered with CORS headers; credentials are allowed, so never `*`
    pub allowed_origin: String,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Access token signing settings
///
/// Loaded once at startup and passed by value to whoever signs or verifies.
/// Changing the secret invalidates every outstanding access token; refresh
/// tokens are unaffected.
#[derive(Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Deserialize, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
}

/// Read `configuration.yaml` (optional), then `APP__*` environment variables,
/// then `JWT_SECRET`.
pub fn get_configuration() -> Result<Settings, AppError> {
    let invalid = |e: config::ConfigError| AppError::Config(ConfigError::InvalidValue(e.to_string()));

    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")
        .map_err(invalid)?
        .set_default("application.port", 8080)
        .map_err(invalid)?
        .set_default("application.allowed_origin", DEFAULT_ALLOWED_ORIGIN)
        .map_err(invalid)?
        .set_default("storage.backend", "postgres")
        .map_err(invalid)?
        .set_default("jwt.secret", "")
        .map_err(invalid)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .set_override_option("jwt.secret", std::env::var(JWT_SECRET_ENV).ok())
        .map_err(invalid)?
        .build()
        .map_err(invalid)?;

    let settings = settings.try_deserialize::<Settings>().map_err(invalid)?;

    if settings.jwt.secret.trim().is_empty() {
        return Err(AppError::Config(ConfigError::MissingRequired(format!(
            "jwt.secret (set {})",
            JWT_SECRET_ENV
        ))));
    }

    validate_allowed_origin(&settings.application.allowed_origin)?;

    Ok(settings)
}

/// The origin is echoed verbatim in `Access-Control-Allow-Origin`
fn validate_allowed_origin(origin: &str) -> Result<(), AppError> {
    let is_http = origin.starts_with("http://") || origin.starts_with("https://");
    if !is_http || origin.ends_with('/') || HeaderValue::from_str(origin).is_err() {
        return Err(AppError::Config(ConfigError::InvalidValue(format!(
            "application.allowed_origin must be a scheme://host[:port] origin, got {:?}",
            origin
        ))));
    }
    Ok(())
}
