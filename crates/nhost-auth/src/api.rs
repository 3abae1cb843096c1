//! Network edge of the auth client.
//!
//! [`AuthApi`] is the seam between the client's state machine and the auth
//! service; tests substitute a stub implementation, production wires in
//! [`HttpAuthApi`].

use crate::error::{AuthError, AuthResult};
use crate::session::Session;
use crate::wire::{
    ErrorResponse, RefreshRequest, RefreshResponse, SignInRequest, SignInResponse, SignOutRequest,
};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Operations against the auth service.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a session.
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Session>;

    /// Exchange a refresh token for a new session.
    async fn refresh(&self, refresh_token: &str) -> AuthResult<Session>;

    /// Revoke a refresh token server-side.
    async fn sign_out(&self, refresh_token: &str) -> AuthResult<()>;
}

/// Read-only token lookup consumed by request interceptors.
///
/// Implementors must not block while a refresh resolves; the contract is
/// "whatever token is held right now, or nothing".
pub trait AccessTokenProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

/// reqwest-backed [`AuthApi`] against an NHost auth service.
pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Create a new API client.
    ///
    /// `base_url` is the NHost instance root, e.g. `https://myapp.nhost.run`.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    /// Pull a human-readable message out of an error response body.
    async fn error_message(response: reqwest::Response, fallback: &str) -> String {
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => {
                if let Some(code) = &err.error {
                    debug!(code = %code, status = ?err.status, "Auth service error detail");
                }
                err.message
            }
            Err(_) if body.is_empty() => fallback.to_string(),
            Err(_) => body,
        }
    }

    /// Decode a session payload, enforcing the all-or-nothing invariant.
    fn decode_session(session: Session) -> AuthResult<Session> {
        if !session.is_valid() {
            return Err(AuthError::Malformed(
                "session payload missing tokens".to_string(),
            ));
        }
        Ok(session)
    }
}

/// Map a transport-level failure onto the auth error taxonomy.
fn classify(e: reqwest::Error) -> AuthError {
    if e.is_timeout() {
        AuthError::Timeout
    } else if e.is_decode() {
        AuthError::Malformed(e.to_string())
    } else {
        AuthError::Network(e.to_string())
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Session> {
        let url = self.endpoint("/signin/email-password");
        debug!(url = %url, email = %email, "Signing in");

        let response = self
            .http
            .post(&url)
            .json(&SignInRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let message = Self::error_message(response, "Sign in failed").await;
            warn!(status = %status, message = %message, "Sign in rejected");
            return if status.is_client_error() {
                Err(AuthError::InvalidCredentials(message))
            } else {
                Err(AuthError::Network(format!("HTTP {}: {}", status, message)))
            };
        }

        let body: SignInResponse = response.json().await.map_err(classify)?;
        Self::decode_session(body.session)
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<Session> {
        let url = self.endpoint("/token");
        debug!(url = %url, "Refreshing token");

        let response = self
            .http
            .post(&url)
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let message = Self::error_message(response, "Token refresh failed").await;
            warn!(status = %status, message = %message, "Token refresh failed");
            return if status.is_client_error() {
                Err(AuthError::RefreshRejected(message))
            } else {
                Err(AuthError::Network(format!("HTTP {}: {}", status, message)))
            };
        }

        let body: RefreshResponse = response.json().await.map_err(classify)?;
        Self::decode_session(body.session)
    }

    async fn sign_out(&self, refresh_token: &str) -> AuthResult<()> {
        let url = self.endpoint("/signout");
        debug!(url = %url, "Revoking refresh token");

        let response = self
            .http
            .post(&url)
            .json(&SignOutRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let message = Self::error_message(response, "Sign out failed").await;
            warn!(status = %status, message = %message, "Server-side sign out failed");
            return Err(AuthError::Network(format!("HTTP {}: {}", status, message)));
        }

        Ok(())
    }
}
