//! HTTP client for the backend's mobile auth endpoints

use common::config::ClientConfig;
use reqwest::Client as HttpClient;
use tracing::{info, warn};

use crate::error::{AuthError, AuthResult};
use crate::models::{AuthResponse, Credentials};

/// Client for `POST /mobileAuth/login` and `POST /mobileAuth/register`
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: HttpClient,
    config: ClientConfig,
}

impl AuthClient {
    pub fn new(config: ClientConfig) -> AuthResult<Self> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { http, config })
    }

    /// Exchange credentials for a token
    pub async fn login(&self, credentials: &Credentials) -> AuthResult<String> {
        info!("Login attempt for user: {}", credentials.username);
        self.request_token("mobileAuth/login", credentials, "Login failed")
            .await
    }

    /// Create an account and receive its first token
    pub async fn register(&self, credentials: &Credentials) -> AuthResult<String> {
        info!("Registration attempt for user: {}", credentials.username);
        self.request_token("mobileAuth/register", credentials, "Registration failed")
            .await
    }

    async fn request_token(
        &self,
        path: &str,
        credentials: &Credentials,
        fallback: &str,
    ) -> AuthResult<String> {
        let response = self
            .http
            .post(self.config.endpoint(path))
            .json(credentials)
            .send()
            .await?;

        let status = response.status();
        let body = match response.json::<AuthResponse>().await {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(AuthError::UnexpectedResponse(e.to_string()));
            }
            // Error bodies without JSON fall back to the generic message.
            Err(_) => AuthResponse::default(),
        };

        if !status.is_success() {
            warn!(status = status.as_u16(), "Auth request rejected");
            return Err(AuthError::Rejected(
                body.message.unwrap_or_else(|| fallback.to_string()),
            ));
        }

        match body {
            AuthResponse {
                token: Some(token), ..
            } => Ok(token),
            AuthResponse {
                message: Some(message),
                ..
            } => Err(AuthError::Rejected(message)),
            _ => Err(AuthError::Rejected(fallback.to_string())),
        }
    }
}
