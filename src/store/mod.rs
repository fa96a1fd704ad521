/// Storage collaborator
///
/// The service reaches users and refresh tokens only through these traits.
/// Implementations are expected to make each call an atomic single-row
/// read or write; nothing above this layer takes locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;

mod memory;
mod models;
mod postgres;

pub use memory::InMemoryStore;
pub use models::{RefreshTokenRecord, User};
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. A taken email is `DatabaseError::UniqueConstraintViolation`.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError>;

    /// Latest-expiring token of `user_id` that is neither revoked nor expired at `now`
    async fn find_active_token_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, AppError>;

    /// Owner of `token` if it is neither revoked nor expired at `now`
    async fn find_token_owner(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>, AppError>;

    /// Set the revoked marker on a not-yet-revoked token; returns rows affected
    async fn revoke_refresh_token(&self, token: &str, now: DateTime<Utc>)
        -> Result<u64, AppError>;
}
