/// JWT Token Generation and Validation
///
/// Access tokens are HMAC-signed compact JWTs carrying `sub`, `iat` and `exp`.
/// They are never stored; validation is a pure function of the token, the
/// signing secret and the clock.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AuthError, CryptoError};

/// Lifetime of every access token handed out by the service
pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Generate a new access token for a user
///
/// # Errors
/// Returns `CryptoError::Signing` if the signer fails
pub fn generate_access_token(
    user_id: &Uuid,
    config: &JwtSettings,
    ttl: Duration,
) -> Result<String, CryptoError> {
    let claims = Claims::new(*user_id, ttl);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| CryptoError::Signing(e.to_string()))
}

/// Validate an access token and return the user it was issued to
///
/// Checks run in order: algorithm family, signature and expiry, claim shape,
/// subject format.
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Uuid, AuthError> {
    ensure_hmac_algorithm(token)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = HMAC_ALGORITHMS.to_vec();
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("JWT validation error: {}", e);
        match e.kind() {
            ErrorKind::InvalidAlgorithm => AuthError::UnexpectedSigningMethod,
            ErrorKind::MissingRequiredClaim(_) | ErrorKind::Json(_) => {
                AuthError::InvalidTokenClaims
            }
            _ => AuthError::TokenExpiredOrInvalidSignature,
        }
    })?;

    claims.user_id()
}

/// Read the `alg` tag from the token header without trusting anything else in it.
///
/// `jsonwebtoken` cannot even parse `"alg": "none"`, so the tag is inspected
/// here to report it as an unexpected signing method rather than a parse error.
fn ensure_hmac_algorithm(token: &str) -> Result<(), AuthError> {
    let header_segment = token
        .split('.')
        .next()
        .ok_or(AuthError::TokenExpiredOrInvalidSignature)?;
    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_segment)
        .map_err(|_| AuthError::TokenExpiredOrInvalidSignature)?;
    let header: serde_json::Value = serde_json::from_slice(&header_bytes)
        .map_err(|_| AuthError::TokenExpiredOrInvalidSignature)?;

    match header.get("alg").and_then(|alg| alg.as_str()) {
        Some("HS256") | Some("HS384") | Some("HS512") => Ok(()),
        _ => Err(AuthError::UnexpectedSigningMethod),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
        }
    }

    fn one_hour() -> Duration {
        Duration::seconds(ACCESS_TOKEN_TTL_SECONDS)
    }

    fn replace_char_at(token: &str, index: usize) -> String {
        let mut chars: Vec<char> = token.chars().collect();
        chars[index] = if chars[index] == 'A' { 'B' } else { 'A' };
        chars.into_iter().collect()
    }

    #[test]
    fn test_generate_and_validate_token() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let token = generate_access_token(&user_id, &config, one_hour())
            .expect("Failed to generate token");
        let validated = validate_access_token(&token, &config).expect("Failed to validate token");

        assert_eq!(validated, user_id);
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_header_declares_hs256() {
        let config = get_test_config();
        let token = generate_access_token(&Uuid::new_v4(), &config, one_hour()).unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
    }

    #[test]
    fn test_expired_token() {
        let config = get_test_config();
        let token = generate_access_token(&Uuid::new_v4(), &config, Duration::seconds(-5))
            .expect("Failed to generate token");

        assert_eq!(
            validate_access_token(&token, &config),
            Err(AuthError::TokenExpiredOrInvalidSignature)
        );
    }

    #[test]
    fn test_invalid_token() {
        let config = get_test_config();
        assert!(validate_access_token("invalid.token.here", &config).is_err());
        assert!(validate_access_token("", &config).is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let config = get_test_config();
        let token = generate_access_token(&Uuid::new_v4(), &config, one_hour()).unwrap();

        let other = JwtSettings {
            secret: "a-completely-different-signing-secret".to_string(),
        };
        assert_eq!(
            validate_access_token(&token, &other),
            Err(AuthError::TokenExpiredOrInvalidSignature)
        );
    }

    #[test]
    fn test_tampered_payload_and_signature() {
        let config = get_test_config();
        let token = generate_access_token(&Uuid::new_v4(), &config, one_hour()).unwrap();

        let header_len = token.find('.').unwrap();
        let signature_start = token.rfind('.').unwrap() + 1;

        // every position inside the payload segment
        for index in (header_len + 1)..(signature_start - 1) {
            let tampered = replace_char_at(&token, index);
            assert_eq!(
                validate_access_token(&tampered, &config),
                Err(AuthError::TokenExpiredOrInvalidSignature),
                "payload position {} accepted",
                index
            );
        }

        let tampered = replace_char_at(&token, signature_start + 5);
        assert_eq!(
            validate_access_token(&tampered, &config),
            Err(AuthError::TokenExpiredOrInvalidSignature)
        );
    }

    #[test]
    fn test_tampered_header() {
        let config = get_test_config();
        let token = generate_access_token(&Uuid::new_v4(), &config, one_hour()).unwrap();

        for index in 0..token.find('.').unwrap() {
            let tampered = replace_char_at(&token, index);
            assert!(validate_access_token(&tampered, &config).is_err());
        }
    }

    #[test]
    fn test_rejects_non_hmac_algorithm() {
        let config = get_test_config();
        let token = generate_access_token(&Uuid::new_v4(), &config, one_hour()).unwrap();
        let rest = &token[token.find('.').unwrap()..];

        for alg in ["RS256", "ES256", "PS256", "EdDSA", "none"] {
            let header = URL_SAFE_NO_PAD.encode(format!(r#"{{"typ":"JWT","alg":"{}"}}"#, alg));
            let forged = format!("{}{}", header, rest);
            assert_eq!(
                validate_access_token(&forged, &config),
                Err(AuthError::UnexpectedSigningMethod),
                "accepted alg {}",
                alg
            );
        }

        let unsigned = format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
            token.split('.').nth(1).unwrap()
        );
        assert_eq!(
            validate_access_token(&unsigned, &config),
            Err(AuthError::UnexpectedSigningMethod)
        );
    }

    #[test]
    fn test_accepts_other_hmac_strengths() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, one_hour());
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(validate_access_token(&token, &config), Ok(user_id));
    }

    #[test]
    fn test_malformed_subject() {
        let config = get_test_config();
        let mut claims = Claims::new(Uuid::new_v4(), one_hour());
        claims.sub = "not-a-uuid".to_string();
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            validate_access_token(&token, &config),
            Err(AuthError::MalformedSubjectIdentity)
        );
    }

    #[test]
    fn test_missing_claims() {
        let config = get_test_config();
        let token = encode(
            &Header::default(),
            &serde_json::json!({ "sub": Uuid::new_v4().to_string() }),
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            validate_access_token(&token, &config),
            Err(AuthError::InvalidTokenClaims)
        );
    }
}
