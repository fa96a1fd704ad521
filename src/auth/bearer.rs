/// Bearer Header Parsing
///
/// Shared by the access token guard and the refresh/logout handlers.

use crate::error::AuthError;

pub const BEARER_SCHEME: &str = "Bearer";

/// Pull the token out of an `Authorization` header value.
///
/// The value must be exactly `Bearer <token>` with a single space; the scheme
/// is matched case-sensitively.
pub fn extract_bearer(header_value: Option<&str>) -> Result<&str, AuthError> {
    let value = header_value
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MalformedAuthorizationHeader)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedAuthorizationHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_token() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_rejects_missing_or_empty() {
        assert_eq!(extract_bearer(None), Err(AuthError::MalformedAuthorizationHeader));
        assert_eq!(extract_bearer(Some("")), Err(AuthError::MalformedAuthorizationHeader));
    }

    #[test]
    fn test_rejects_wrong_shapes() {
        let cases = vec![
            "bearer abc",
            "BEARER abc",
            "Basic abc",
            "Bearer",
            "Bearer ",
            "Bearer  abc",
            "Bearer abc def",
            "abc",
            " Bearer abc",
        ];

        for case in cases {
            assert_eq!(
                extract_bearer(Some(case)),
                Err(AuthError::MalformedAuthorizationHeader),
                "accepted {:?}",
                case
            );
        }
    }
}
