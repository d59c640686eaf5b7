//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

/// Login handles: a letter followed by letters, digits, dot, underscore or dash
static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9._-]*$").unwrap());

/// Optional leading plus, then digits with single spaces or dashes
static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]+(?:[ -]?[0-9]+)*$").unwrap());

/// Article numbers
static SKU_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").unwrap());

/// Check a login handle
pub fn is_valid_username(name: &str) -> bool {
    (3..=50).contains(&name.len()) && USERNAME_REGEX.is_match(name)
}

/// Check a phone number
pub fn is_valid_phone(phone: &str) -> bool {
    (6..=20).contains(&phone.len()) && PHONE_REGEX.is_match(phone)
}

/// Check an article number
pub fn is_valid_sku(sku: &str) -> bool {
    !sku.is_empty() && sku.len() <= 64 && SKU_REGEX.is_match(sku)
}

pub fn validate_username(name: &str) -> Result<(), ValidationError> {
    if is_valid_username(name) {
        Ok(())
    } else {
        Err(ValidationError::new("username")
            .with_message("must be 3-50 characters, start with a letter and contain only letters, digits, '.', '_' or '-'".into()))
    }
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if is_valid_phone(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message("must be a phone number".into()))
    }
}

pub fn validate_sku(sku: &str) -> Result<(), ValidationError> {
    if is_valid_sku(sku) {
        Ok(())
    } else {
        Err(ValidationError::new("sku")
            .with_message("must be 1-64 letters, digits, '.', '_' or '-'".into()))
    }
}
