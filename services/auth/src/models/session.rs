//! Session snapshot model

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::SessionUser;

/// Lifecycle position of the session manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    /// Nothing has been read from storage yet
    Uninitialized,
    /// The persisted token is being read and checked
    Restoring,
    /// No valid token
    Guest,
    /// A valid, unexpired token is held
    Authenticated,
}

/// Point-in-time copy of the session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub status: SessionStatus,
    pub token: Option<String>,
    pub user: Option<SessionUser>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Token and user id, when authenticated
    pub fn credentials(&self) -> Option<(&str, &SessionUser)> {
        match (&self.token, &self.user) {
            (Some(token), Some(user)) if self.is_authenticated() => Some((token.as_str(), user)),
            _ => None,
        }
    }
}

/// Notices pushed to the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The armed expiry timer fired and the user was logged out
    Expired,
}

impl SessionNotice {
    pub fn message(&self) -> &'static str {
        match self {
            SessionNotice::Expired => "Session expired. Please log in again.",
        }
    }
}
