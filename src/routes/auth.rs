/// Authentication Routes
///
/// Thin HTTP adapters over `SessionService`: they unpack JSON bodies and
/// the Authorization header, and shape successful responses. Errors are
/// rendered by `AppError`'s `ResponseError` impl.

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::ACCESS_TOKEN_TTL_SECONDS;
use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::session::SessionService;
use crate::store::User;

const TOKEN_TYPE: &str = "Bearer";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

/// Login response: the account plus both tokens
#[derive(Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

fn authorization_header(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}

/// POST /api/v1/auth/register
///
/// # Errors
/// - 400: missing or invalid email, name or password
/// - 409: email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let user = sessions
        .register(&form.email, &form.name, &form.password)
        .await?;

    Ok(HttpResponse::Created().json(UserResponse::from(&user)))
}

/// POST /api/v1/auth/login
///
/// # Errors
/// - 400: empty email or password
/// - 401: unknown email or wrong password (same response for both)
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let session = sessions.login(&form.email, &form.password).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        user: UserResponse::from(&session.user),
        access_token: session.access_token,
        refresh_token: session.refresh_token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in: ACCESS_TOKEN_TTL_SECONDS,
    }))
}

/// POST /api/v1/auth/refresh
///
/// Requires `Authorization: Bearer <refresh_token>`.
///
/// # Errors
/// - 401: malformed header, or a refresh token that is unknown, expired or revoked
pub async fn refresh(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let access_token = sessions.refresh(authorization_header(&req)).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        access_token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in: ACCESS_TOKEN_TTL_SECONDS,
    }))
}

/// POST /api/v1/auth/logout
///
/// Requires `Authorization: Bearer <refresh_token>`.
///
/// # Errors
/// - 401: malformed header
/// - 400: token is not an active refresh token
pub async fn logout(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    sessions.logout(authorization_header(&req)).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/auth/account
///
/// Protected by `JwtMiddleware`, which supplies the caller's identity.
pub async fn account(
    caller: web::ReqData<AuthenticatedUser>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let user = sessions.account(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}
