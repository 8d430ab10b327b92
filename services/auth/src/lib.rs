//! Client-side authentication for the movie-review app
//!
//! Decodes bearer tokens, keeps the session alive until its token expires,
//! and runs the login/register flows against the backend.

pub mod authenticator;
pub mod claims;
pub mod client;
pub mod error;
pub mod models;
pub mod session;
pub mod validation;

pub use authenticator::Authenticator;
pub use client::AuthClient;
pub use error::{AuthError, AuthResult};
pub use models::{Credentials, Session, SessionNotice, SessionStatus, SessionUser};
pub use session::{SessionError, SessionManager, TOKEN_KEY};
