use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{RefreshTokenRecord, RefreshTokenStore, User, UserStore};
use crate::error::{AppError, DatabaseError, USERS_EMAIL_CONSTRAINT};

/// Process-local store for tests and `storage.backend = "memory"`
///
/// Each trait call takes the lock once, which gives the same single-row
/// atomicity the Postgres store gets from the database.
#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
    refresh_tokens: Mutex<HashMap<String, RefreshTokenRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> Result<MutexGuard<'_, HashMap<Uuid, User>>, AppError> {
        self.users.lock().map_err(|_| {
            AppError::Database(DatabaseError::ConnectionPool(
                "user table lock poisoned".to_string(),
            ))
        })
    }

    fn refresh_tokens(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, RefreshTokenRecord>>, AppError> {
        self.refresh_tokens.lock().map_err(|_| {
            AppError::Database(DatabaseError::ConnectionPool(
                "refresh token table lock poisoned".to_string(),
            ))
        })
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users()?;
        if users.contains_key(&user.id) || users.values().any(|u| u.email == user.email) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                USERS_EMAIL_CONSTRAINT.to_string(),
            )));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users()?.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users()?.get(&user_id).cloned())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn insert_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        let mut tokens = self.refresh_tokens()?;
        if tokens.contains_key(&record.token) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "refresh_tokens_pkey".to_string(),
            )));
        }
        tokens.insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn find_active_token_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, AppError> {
        Ok(self
            .refresh_tokens()?
            .values()
            .filter(|r| r.user_id == user_id && r.is_active_at(now))
            .max_by_key(|r| r.expires_at)
            .map(|r| r.token.clone()))
    }

    async fn find_token_owner(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>, AppError> {
        Ok(self
            .refresh_tokens()?
            .get(token)
            .filter(|r| r.is_active_at(now))
            .map(|r| r.user_id))
    }

    async fn revoke_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        match self.refresh_tokens()?.get_mut(token) {
            Some(record) if record.revoked_at.is_none() => {
                record.revoked_at = Some(now);
                record.updated_at = now;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}
