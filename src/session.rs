/// Session orchestration
///
/// Glues the credential hasher, the access token issuer and the refresh
/// token manager into the register, login, refresh, logout and account flows.
/// This is the only layer that decides which internal failure becomes which
/// caller-facing error.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{
    extract_bearer, generate_access_token, generate_refresh_token, hash_password,
    refresh_token_expiry, verify_password, RefreshTokenManager, ACCESS_TOKEN_TTL_SECONDS,
};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ValidationError};
use crate::store::{RefreshTokenStore, User, UserStore};
use crate::validators::{is_valid_email, is_valid_name, is_valid_password};

/// Tokens handed out by a successful login
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct SessionService {
    users: Arc<dyn UserStore>,
    refresh_tokens: RefreshTokenManager,
    jwt: JwtSettings,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        jwt: JwtSettings,
    ) -> Self {
        Self {
            users,
            refresh_tokens: RefreshTokenManager::new(refresh_tokens),
            jwt,
        }
    }

    /// Build the service over one store that holds both tables
    pub fn with_store<S>(store: Arc<S>, jwt: JwtSettings) -> Self
    where
        S: UserStore + RefreshTokenStore + 'static,
    {
        Self::new(store.clone(), store, jwt)
    }

    pub fn jwt_settings(&self) -> &JwtSettings {
        &self.jwt
    }

    fn access_token_ttl() -> Duration {
        Duration::seconds(ACCESS_TOKEN_TTL_SECONDS)
    }

    /// Create an account. Does not log the user in.
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let email = is_valid_email(email)?;
        let name = is_valid_name(name)?;
        is_valid_password(password)?;

        let password_hash = spawn_blocking_crypto({
            let password = password.to_string();
            move || hash_password(&password)
        })
        .await?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            name,
            password_hash,
            created_at: now,
            updated_at: now,
        };
        self.users.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check credentials and hand out an access token plus the user's refresh token.
    ///
    /// An existing active refresh token is returned as-is; a new one is minted
    /// only when none is found. Two logins racing for the same user can both
    /// miss and both mint, leaving the user with two active tokens.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, AppError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(ValidationError::EmptyField("email").into());
        }
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password").into());
        }

        // Unknown email and wrong password must look the same to the caller
        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

        let matched = spawn_blocking_crypto({
            let password = password.to_string();
            let hash = user.password_hash.clone();
            move || verify_password(&password, &hash)
        })
        .await?;
        if !matched {
            return Err(AuthError::InvalidCredentials.into());
        }

        let access_token = generate_access_token(&user.id, &self.jwt, Self::access_token_ttl())?;

        let refresh_token = match self.refresh_tokens.get_active(user.id).await? {
            Some(token) => token,
            None => {
                let token = generate_refresh_token()?;
                self.refresh_tokens
                    .create(user.id, &token, refresh_token_expiry(Utc::now()))
                    .await?;
                token
            }
        };

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginSession {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Exchange the refresh token in an `Authorization: Bearer` header for a
    /// new access token. The refresh token itself stays valid.
    pub async fn refresh(&self, authorization: Option<&str>) -> Result<String, AppError> {
        let refresh_token = extract_bearer(authorization)?;
        let user_id = self.refresh_tokens.resolve_owner(refresh_token).await?;
        let access_token = generate_access_token(&user_id, &self.jwt, Self::access_token_ttl())?;

        tracing::info!(user_id = %user_id, "Access token refreshed");
        Ok(access_token)
    }

    /// Revoke the refresh token in an `Authorization: Bearer` header
    pub async fn logout(&self, authorization: Option<&str>) -> Result<(), AppError> {
        let refresh_token = extract_bearer(authorization)?;
        let affected = self.refresh_tokens.revoke(refresh_token).await?;
        if affected == 0 {
            return Err(ValidationError::UnknownRefreshToken.into());
        }

        tracing::info!("Refresh token revoked on logout");
        Ok(())
    }

    /// The account behind an already validated access token
    pub async fn account(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::Auth(AuthError::UnknownSubject))
    }
}

/// bcrypt is deliberately slow; keep it off the async workers
async fn spawn_blocking_crypto<T, E, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
        .map_err(Into::into)
}
