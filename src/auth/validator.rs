//! Credential validator
//!
//! Input sanitation for usernames and passwords before they reach the
//! identity store.

use crate::error::FsError;

pub const MAX_USERNAME_LENGTH: usize = 32;
pub const MAX_PASSWORD_LENGTH: usize = 64;

/// Performs basic input sanitation to check for malicious or malformed values.
fn is_valid_input(input: &str, max_length: usize) -> bool {
    !input.is_empty()
        && input.len() <= max_length
        && !input.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// Validates the shape of a username for a new account.
pub fn validate_username(username: &str) -> Result<(), FsError> {
    if username.contains(['@', '#', ',', '%', '/', ':'])
        || username.starts_with(char::is_numeric)
    {
        return Err(FsError::InvalidOperation(format!(
            "invalid username: {}",
            username
        )));
    }

    if !is_valid_input(username, MAX_USERNAME_LENGTH) {
        return Err(FsError::InvalidOperation("invalid username format".into()));
    }

    Ok(())
}

/// Validates the shape of a password for a new account.
pub fn validate_password(password: &str) -> Result<(), FsError> {
    if !is_valid_input(password, MAX_PASSWORD_LENGTH) {
        return Err(FsError::InvalidOperation("invalid password format".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("bob_2").is_ok());
    }

    #[test]
    fn test_invalid_usernames() {
        assert!(validate_username("").is_err());
        assert!(validate_username("9lives").is_err());
        assert!(validate_username("a b").is_err());
        assert!(validate_username("mail@host").is_err());
        let long = "x".repeat(MAX_USERNAME_LENGTH + 1);
        assert!(validate_username(&long).is_err());
    }

    #[test]
    fn test_passwords() {
        assert!(validate_password("hash123").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password("two words").is_err());
    }
}
