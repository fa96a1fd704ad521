/// JWT Claims structure
///
/// Payload of an access token: the subject identity and the registered
/// time claims (RFC 7519), both as seconds since the epoch.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Claims for `user_id` valid from now for `ttl`
    pub fn new(user_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Parse the subject back into a user ID
    ///
    /// # Errors
    /// `InvalidTokenClaims` for an empty subject, `MalformedSubjectIdentity`
    /// when it is not a UUID
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        if self.sub.is_empty() {
            return Err(AuthError::InvalidTokenClaims);
        }
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::MalformedSubjectIdentity)
    }
}
