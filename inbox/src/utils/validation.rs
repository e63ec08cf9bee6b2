//! Input validation constants and utilities
//!
//! Request DTOs are validated by garde in models/input.rs.
//! These functions cover values that arrive outside a DTO: user ids coming
//! from the message feed and profile names written to the store.

/// Maximum lengths for various fields
pub const MAX_USER_ID_LENGTH: usize = 128;
pub const MAX_NAME_LENGTH: usize = 100;

/// Validate and normalize a user id
/// Surrounding whitespace is trimmed; the trimmed form is returned
pub fn validate_user_id(id: &str) -> Result<String, String> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err("User id cannot be empty".to_string());
    }
    if trimmed.chars().count() > MAX_USER_ID_LENGTH {
        return Err(format!(
            "User id too long (max {} characters)",
            MAX_USER_ID_LENGTH
        ));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err("User id contains invalid characters".to_string());
    }
    Ok(trimmed.to_string())
}

/// Validate a first or last name
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(format!(
            "Name too long (max {} characters)",
            MAX_NAME_LENGTH
        ));
    }
    // Check for control characters
    if name.chars().any(|c| c.is_control()) {
        return Err("Name contains invalid characters".to_string());
    }
    Ok(())
}
