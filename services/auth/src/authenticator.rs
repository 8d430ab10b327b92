//! Sign-in and sign-up flows tying the auth client to the session

use tracing::{info, warn};

use crate::client::AuthClient;
use crate::error::{AuthError, AuthResult};
use crate::models::{Credentials, SessionUser};
use crate::session::SessionManager;
use crate::validation::{validate_login, validate_registration};

/// Runs the form → request → session pipeline
///
/// Failures never leave a half-started session behind: the session either
/// becomes authenticated or stays as it was.
#[derive(Clone)]
pub struct Authenticator {
    client: AuthClient,
    session: SessionManager,
}

impl Authenticator {
    pub fn new(client: AuthClient, session: SessionManager) -> Self {
        Self { client, session }
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> AuthResult<SessionUser> {
        validate_login(credentials).map_err(AuthError::Validation)?;
        let token = self.client.login(credentials).await?;
        self.start_session(&token).await
    }

    /// Register and log straight in with the returned token
    pub async fn sign_up(&self, credentials: &Credentials) -> AuthResult<SessionUser> {
        validate_registration(credentials).map_err(AuthError::Validation)?;
        let token = self.client.register(credentials).await?;
        self.start_session(&token).await
    }

    pub async fn sign_out(&self) {
        self.session.logout().await;
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    async fn start_session(&self, token: &str) -> AuthResult<SessionUser> {
        match self.session.login(token).await? {
            Some(user) => {
                info!(user_id = %user.id, "Signed in as {}", user.username);
                Ok(user)
            }
            None => {
                warn!("Backend issued an already expired token");
                Err(AuthError::Rejected(
                    "Session expired. Please log in again.".to_string(),
                ))
            }
        }
    }
}
