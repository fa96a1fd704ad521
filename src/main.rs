use std::net::TcpListener;
use std::sync::Arc;

use session_auth::configuration::{get_configuration, StorageBackend};
use session_auth::session::SessionService;
use session_auth::startup::run;
use session_auth::store::{InMemoryStore, PgStore};
use session_auth::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let jwt_config = configuration.jwt.clone();

    let sessions = match configuration.storage.backend {
        StorageBackend::Postgres => {
            tracing::info!("Attempting to connect to database");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&configuration.database.connection_string())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create connection pool: {}", e);
                    std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "Database connection error",
                    )
                })?;
            tracing::info!("Database connection pool created successfully");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to run database migrations: {}", e);
                    std::io::Error::new(std::io::ErrorKind::Other, "Database migration error")
                })?;
            tracing::info!("Database migrations applied");
            SessionService::with_store(Arc::new(PgStore::new(pool)), jwt_config)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; accounts and sessions are lost on restart");
            SessionService::with_store(Arc::new(InMemoryStore::new()), jwt_config)
        }
    };

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, sessions, configuration.application.allowed_origin)?.await
}
