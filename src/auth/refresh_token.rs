/// Refresh Token Management
///
/// Refresh tokens are opaque: 32 bytes from the OS CSPRNG, hex encoded.
/// They are stored as-is and keyed by their value, because login hands the
/// same token back to the client for as long as it stays active.
/// They are not rotated on refresh; they die on logout or after 60 days.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use uuid::Uuid;

use crate::error::{AppError, AuthError, CryptoError};
use crate::store::{RefreshTokenRecord, RefreshTokenStore};

pub const REFRESH_TOKEN_BYTES: usize = 32;
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

/// Generate a new refresh token from the operating system's random source
///
/// # Errors
/// `CryptoError::InsufficientEntropy` if the source cannot fill the buffer.
/// There is no fallback to a weaker generator.
pub fn generate_refresh_token() -> Result<String, CryptoError> {
    generate_refresh_token_with(&mut OsRng)
}

/// Same as [`generate_refresh_token`] with an explicit generator
pub fn generate_refresh_token_with<R>(rng: &mut R) -> Result<String, CryptoError>
where
    R: RngCore + CryptoRng,
{
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rng.try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::InsufficientEntropy(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Expiry for a refresh token issued at `issued_at`
pub fn refresh_token_expiry(issued_at: DateTime<Utc>) -> DateTime<Utc> {
    issued_at + Duration::days(REFRESH_TOKEN_TTL_DAYS)
}

/// Persistence-facing half of the refresh token lifecycle
#[derive(Clone)]
pub struct RefreshTokenManager {
    store: Arc<dyn RefreshTokenStore>,
}

impl RefreshTokenManager {
    pub fn new(store: Arc<dyn RefreshTokenStore>) -> Self {
        Self { store }
    }

    /// The user's non-revoked, non-expired token, if there is one
    ///
    /// `None` is the normal signal for login to mint a new token.
    pub async fn get_active(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        self.store
            .find_active_token_for_user(user_id, Utc::now())
            .await
    }

    /// Persist a freshly generated token for `user_id`
    pub async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, AppError> {
        let now = Utc::now();
        let record = RefreshTokenRecord {
            token: token.to_string(),
            user_id,
            expires_at,
            revoked_at: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_refresh_token(&record).await?;

        tracing::info!(user_id = %user_id, expires_at = %expires_at, "Refresh token stored");
        Ok(record)
    }

    /// Resolve the user that owns a currently valid token
    ///
    /// # Errors
    /// `AuthError::RefreshTokenNotFound` whether the token is unknown, expired
    /// or revoked. The three cases are deliberately indistinguishable.
    pub async fn resolve_owner(&self, token: &str) -> Result<Uuid, AppError> {
        self.store
            .find_token_owner(token, Utc::now())
            .await?
            .ok_or_else(|| {
                tracing::warn!("Refresh token absent, expired or revoked");
                AppError::Auth(AuthError::RefreshTokenNotFound)
            })
    }

    /// Mark a token unusable
    ///
    /// Returns the number of rows the store changed. Zero (already revoked or
    /// never issued) is not an error here; the caller decides what it means.
    pub async fn revoke(&self, token: &str) -> Result<u64, AppError> {
        let affected = self.store.revoke_refresh_token(token, Utc::now()).await?;
        tracing::info!(rows_affected = affected, "Refresh token revocation applied");
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::collections::HashSet;

    struct ExhaustedRng;

    impl RngCore for ExhaustedRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            panic!("fill_bytes must not be used for token generation");
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("entropy source exhausted"))
        }
    }

    impl CryptoRng for ExhaustedRng {}

    fn manager() -> RefreshTokenManager {
        RefreshTokenManager::new(Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token().expect("Failed to generate token");

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let tokens: HashSet<String> = (0..10_000)
            .map(|_| generate_refresh_token().expect("Failed to generate token"))
            .collect();

        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn test_exhausted_source_is_fatal() {
        let result = generate_refresh_token_with(&mut ExhaustedRng);
        assert!(matches!(result, Err(CryptoError::InsufficientEntropy(_))));
    }

    #[test]
    fn test_expiry_is_sixty_days() {
        let now = Utc::now();
        assert_eq!(refresh_token_expiry(now) - now, Duration::days(60));
    }

    #[tokio::test]
    async fn test_create_then_resolve() {
        let manager = manager();
        let user_id = Uuid::new_v4();
        let token = generate_refresh_token().unwrap();

        let record = manager
            .create(user_id, &token, refresh_token_expiry(Utc::now()))
            .await
            .expect("Failed to create token");

        assert_eq!(record.token, token);
        assert_eq!(manager.resolve_owner(&token).await.unwrap(), user_id);
        assert_eq!(manager.get_active(user_id).await.unwrap(), Some(token));
    }

    #[tokio::test]
    async fn test_get_active_none_for_new_user() {
        let manager = manager();
        assert_eq!(manager.get_active(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_revoked_token_does_not_resolve() {
        let manager = manager();
        let user_id = Uuid::new_v4();
        let token = generate_refresh_token().unwrap();
        manager
            .create(user_id, &token, refresh_token_expiry(Utc::now()))
            .await
            .unwrap();

        assert_eq!(manager.revoke(&token).await.unwrap(), 1);

        let result = manager.resolve_owner(&token).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::RefreshTokenNotFound))));
        assert_eq!(manager.get_active(user_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_token_does_not_resolve() {
        let manager = manager();
        let user_id = Uuid::new_v4();
        let token = generate_refresh_token().unwrap();
        manager
            .create(user_id, &token, Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        let result = manager.resolve_owner(&token).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::RefreshTokenNotFound))));
        assert_eq!(manager.get_active(user_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_token_does_not_resolve() {
        let result = manager().resolve_owner("deadbeef").await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::RefreshTokenNotFound))));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let manager = manager();
        let token = generate_refresh_token().unwrap();
        manager
            .create(Uuid::new_v4(), &token, refresh_token_expiry(Utc::now()))
            .await
            .unwrap();

        assert_eq!(manager.revoke(&token).await.unwrap(), 1);
        assert_eq!(manager.revoke(&token).await.unwrap(), 0);
        assert_eq!(manager.revoke("never-issued").await.unwrap(), 0);
    }
}
