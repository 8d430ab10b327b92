//! Input validation for the login and registration forms
//!
//! Only presence is checked here. Account rules belong to the backend, whose
//! `{message}` is shown as-is when it refuses a form.

use crate::models::Credentials;

/// Validate a login form; the backend decides whether the pair is correct
pub fn validate_login(credentials: &Credentials) -> Result<(), String> {
    require_fields(credentials)
}

/// Validate a registration form
pub fn validate_registration(credentials: &Credentials) -> Result<(), String> {
    require_fields(credentials)
}

fn require_fields(credentials: &Credentials) -> Result<(), String> {
    if credentials.username.trim().is_empty() {
        return Err("Username is required".to_string());
    }

    if credentials.password.is_empty() {
        return Err("Password is required".to_string());
    }

    Ok(())
}
