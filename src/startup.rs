use actix_cors::Cors;
use actix_files as fs;
use actix_web::dev::Server;
use actix_web::http::{header, Method};
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::path::Path;

use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{account, health_check, login, logout, refresh, register};
use crate::session::SessionService;

/// Directory of the bundled web client, served under `/app` when present
const STATIC_DIR: &str = "./public";

/// Browser access from the configured web client origin, including preflight
fn cors(allowed_origin: &str) -> Cors {
    Cors::default()
        .allowed_origin(allowed_origin)
        .allowed_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allowed_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .supports_credentials()
        .max_age(3600)
}

pub fn run(
    listener: TcpListener,
    sessions: SessionService,
    allowed_origin: String,
) -> Result<Server, std::io::Error> {
    let jwt_config = sessions.jwt_settings().clone();
    let sessions = web::Data::new(sessions);

    let server = HttpServer::new(move || {
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            tracing::debug!("Rejected request body: {}", err);
            AppError::Validation(ValidationError::InvalidFormat("request body")).into()
        });

        App::new()
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)
            .wrap(cors(&allowed_origin))
            .app_data(sessions.clone())
            .app_data(json_config)
            .route("/api/v1/health", web::get().to(health_check))
            .service(
                web::scope("/api/v1/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/logout", web::post().to(logout))
                    .service(
                        web::resource("/account")
                            .wrap(JwtMiddleware::new(jwt_config.clone()))
                            .route(web::get().to(account)),
                    ),
            )
            .configure(|cfg| {
                if Path::new(STATIC_DIR).is_dir() {
                    cfg.service(fs::Files::new("/app", STATIC_DIR).index_file("index.html"));
                }
            })
    })
    .listen(listener)?
    .run();

    Ok(server)
}
