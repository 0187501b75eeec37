//! Contact field validators
//!
//! Run immediately after extraction merges new values. A failed check clears
//! that one field and triggers a correction prompt; it never blocks the other
//! fields from being accepted in the same turn.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

static PHONE_CHARSET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[\d\s\-()]+$").unwrap());

/// Conservative `local@domain.tld` shape check
pub fn validate_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email.trim())
}

/// Allowed characters only, and at least ten digits once stripped
pub fn validate_phone(phone: &str) -> bool {
    let trimmed = phone.trim();
    if !PHONE_CHARSET.is_match(trimmed) {
        return false;
    }
    trimmed.chars().filter(|c| c.is_ascii_digit()).count() >= 10
}

/// At least two characters after trimming
pub fn validate_name(name: &str) -> bool {
    name.trim().chars().count() >= 2
}
