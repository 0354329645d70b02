use std::sync::LazyLock;
use regex::Regex;
use uuid::Uuid;
use crate::error::ApiError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").expect("email pattern is valid")
});

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ApiError::Validation("Email cannot be empty.".into()));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ApiError::Validation("Email address is not valid.".into()));
    }
    Ok(())
}

pub fn validate_password_strength(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::Validation("Password must be at least 8 characters long.".into()));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ApiError::Validation("Password must contain an uppercase letter.".into()));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::Validation("Password must contain a digit.".into()));
    }
    Ok(())
}

/// Resolves the password fields of an edit form.
///
/// Both empty means "keep the current password" and yields `None`, so the
/// outgoing payload carries no `password` key. A mismatch is rejected before
/// any request is made.
pub fn password_change(password: &str, confirm: &str) -> Result<Option<String>, ApiError> {
    if password.is_empty() && confirm.is_empty() {
        return Ok(None);
    }
    if password != confirm {
        return Err(ApiError::Validation("Passwords do not match.".into()));
    }
    validate_password_strength(password)?;
    Ok(Some(password.to_string()))
}

/// Activation links carry a UUID token; anything else is rejected locally.
pub fn is_valid_uuid(value: &str) -> bool {
    Uuid::parse_str(value.trim()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_password_fields_keep_current_password() {
        assert_eq!(password_change("", ""), Ok(None));
    }

    #[test]
    fn mismatched_passwords_are_rejected() {
        assert_eq!(
            password_change("Secret123", "Secret124"),
            Err(ApiError::Validation("Passwords do not match.".into()))
        );
        assert!(password_change("Secret123", "").is_err());
    }

    #[test]
    fn matching_strong_password_is_sent() {
        assert_eq!(password_change("Secret123", "Secret123"), Ok(Some("Secret123".into())));
    }

    #[test]
    fn weak_password_is_rejected() {
        assert!(validate_password_strength("short1A").is_err());
        assert!(validate_password_strength("nouppercase1").is_err());
        assert!(validate_password_strength("NoDigitsHere").is_err());
    }

    #[test]
    fn email_format() {
        assert!(validate_email("teacher@school.edu").is_ok());
        assert!(validate_email("teacher@school").is_err());
        assert!(validate_email("  ").is_err());
    }

    #[test]
    fn uuid_tokens() {
        assert!(is_valid_uuid("67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(is_valid_uuid(" 67e55044-10b1-426f-9247-bb680e5fe0c8 "));
        assert!(!is_valid_uuid("not-a-token"));
    }
}
