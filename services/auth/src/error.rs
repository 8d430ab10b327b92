//! Errors surfaced by the sign-in and sign-up flows

use thiserror::Error;

use crate::session::SessionError;

/// Error type for authentication requests
#[derive(Error, Debug)]
pub enum AuthError {
    /// The form did not pass local validation
    #[error("{0}")]
    Validation(String),

    /// The backend refused the request
    #[error("{0}")]
    Rejected(String),

    /// The request never completed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with something other than `{token}` or `{message}`
    #[error("Unexpected response from server: {0}")]
    UnexpectedResponse(String),

    /// The issued token could not start a session
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl AuthError {
    /// Message shown inline on the login/register form
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(msg) | AuthError::Rejected(msg) => msg.clone(),
            AuthError::Network(_) => "Could not reach the server. Please try again.".to_string(),
            AuthError::UnexpectedResponse(_) => "Unexpected response from server".to_string(),
            AuthError::Session(SessionError::InvalidToken(_)) => {
                "Received an invalid session token".to_string()
            }
            AuthError::Session(_) => "Could not save your session. Please try again.".to_string(),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
