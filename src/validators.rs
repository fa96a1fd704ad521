/// Input validators for registration and login requests
///
/// Each validator returns the normalized value that should be stored or
/// looked up.

use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::BCRYPT_MAX_INPUT_BYTES;
use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_NAME_LENGTH: usize = 256;
const MIN_PASSWORD_LENGTH: usize = 8;
/// bcrypt ignores everything past 72 bytes
const MAX_PASSWORD_LENGTH: usize = BCRYPT_MAX_INPUT_BYTES;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Trim, check and lower-case an email address
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email", MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email"));
    }

    Ok(trimmed.to_lowercase())
}

/// Trim and check a display name
pub fn is_valid_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("name"));
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong("name", MAX_NAME_LENGTH));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat("name"));
    }

    Ok(trimmed.to_string())
}

/// Length rules for a new password. The password itself is not altered.
pub fn is_valid_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password"));
    }

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort("password", MIN_PASSWORD_LENGTH));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password", MAX_PASSWORD_LENGTH));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert_eq!(is_valid_email("user@x.com"), Ok("user@x.com".to_string()));
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn test_email_is_normalized() {
        assert_eq!(
            is_valid_email("  User@Example.COM "),
            Ok("user@example.com".to_string())
        );
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(
            is_valid_email(&too_long),
            Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH))
        );
        assert_eq!(is_valid_email(""), Err(ValidationError::EmptyField("email")));
    }

    #[test]
    fn test_valid_name() {
        assert_eq!(is_valid_name(" John Doe "), Ok("John Doe".to_string()));
        assert!(is_valid_name("Jean-Pierre").is_ok());
        assert!(is_valid_name("Nguyễn Văn A").is_ok());
    }

    #[test]
    fn test_invalid_name() {
        assert!(is_valid_name("").is_err());
        assert!(is_valid_name("   ").is_err());
        assert!(is_valid_name(&"a".repeat(257)).is_err());
        assert!(is_valid_name("Name\0with\0null").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(is_valid_password("secret123").is_ok());
        assert_eq!(
            is_valid_password(""),
            Err(ValidationError::EmptyField("password"))
        );
        assert_eq!(
            is_valid_password("short"),
            Err(ValidationError::TooShort("password", MIN_PASSWORD_LENGTH))
        );
        assert_eq!(
            is_valid_password(&"a".repeat(73)),
            Err(ValidationError::TooLong("password", MAX_PASSWORD_LENGTH))
        );
    }
}
