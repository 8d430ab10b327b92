//! Authentication models

pub mod session;
pub mod user;

// Re-export for convenience
pub use session::{Session, SessionNotice, SessionStatus};
pub use user::{AuthResponse, Credentials, SessionUser};
