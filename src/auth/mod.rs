/// Authentication module
///
/// Password hashing, bearer header parsing, access token issuance and
/// validation, and refresh token management.

mod bearer;
mod claims;
mod jwt;
mod password;
mod refresh_token;

pub use bearer::extract_bearer;
pub use claims::Claims;
pub use jwt::{generate_access_token, validate_access_token, ACCESS_TOKEN_TTL_SECONDS};
pub use password::{hash_password, verify_password, BCRYPT_MAX_INPUT_BYTES};
pub use refresh_token::{
    generate_refresh_token, generate_refresh_token_with, refresh_token_expiry,
    RefreshTokenManager, REFRESH_TOKEN_BYTES, REFRESH_TOKEN_TTL_DAYS,
};
