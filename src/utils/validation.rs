//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Regex for validating email addresses
static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

/// Regex for validating phone numbers (7-15 digits, optional leading +)
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{7,15}$").unwrap());

/// Regex for validating product slugs
static SLUG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

/// Validate an email address
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Validate a phone number
pub fn validate_phone(phone: &str) -> bool {
    PHONE_REGEX.is_match(phone)
}

/// Validate a product slug
pub fn validate_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.len() <= 200 && SLUG_REGEX.is_match(slug)
}

/// Check password strength
///
/// Returns an error message describing the first failed requirement.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), String> {
    if password.len() < min_length {
        return Err(format!(
            "Password must be at least {} characters",
            min_length
        ));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err("Password must contain at least one letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("rider@example.com"));
        assert!(validate_email("first.last+tag@dealers.voltride.in"));
    }

    #[test]
    fn test_validate_email_invalid() {
        assert!(!validate_email(""));
        assert!(!validate_email("not-an-email"));
        assert!(!validate_email("missing@tld"));
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("9876543210"));
        assert!(validate_phone("+919876543210"));
        assert!(!validate_phone("12345"));
        assert!(!validate_phone("phone-number"));
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("lightning-pro-2024"));
        assert!(validate_slug("marium"));
        assert!(!validate_slug("Has Spaces"));
        assert!(!validate_slug("-leading-dash"));
        assert!(!validate_slug(""));
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("secret123", 8).is_ok());
        assert!(validate_password_strength("short1", 8).is_err());
        assert!(validate_password_strength("lettersonly", 8).is_err());
        assert!(validate_password_strength("12345678", 8).is_err());
    }
}
