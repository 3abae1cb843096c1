//! Request/response bodies for the auth endpoints.

use crate::session::Session;
use serde::{Deserialize, Serialize};

/// Body for POST /v1/signin/email-password.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Response from the sign-in endpoint.
#[derive(Debug, Deserialize)]
pub struct SignInResponse {
    pub session: Session,
}

/// Body for POST /v1/token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response from the refresh endpoint.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub session: Session,
}

/// Body for POST /v1/signout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutRequest {
    pub refresh_token: String,
}

/// Error body returned by the auth service.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub error: Option<String>,
}
