//! Session and user value types.
//!
//! Pure data plus expiry arithmetic. Timestamps are always passed in by the
//! caller, never read from a wall clock, so the computations here are
//! directly unit-testable.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A user profile snapshot.
///
/// Replaced wholesale on every refresh, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub display_name: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
    pub locale: String,
    pub is_anonymous: bool,
    pub default_role: String,
    pub roles: Vec<String>,
    pub email_verified: bool,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub phone_number_verified: bool,
    #[serde(default)]
    pub active_mfa_type: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

/// An authenticated session: token pair plus the user it belongs to.
///
/// A session is either fully present or absent; both tokens are non-empty
/// for a valid session (see [`Session::is_valid`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub access_token_expires_in: i64,
    #[serde(default)]
    pub refresh_token_id: Option<String>,
    pub user: User,
}

impl Session {
    /// Calculate when the access token expires.
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + Duration::seconds(self.access_token_expires_in)
    }

    /// Both tokens present. Responses failing this are treated as malformed.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

/// True iff the access token is within `buffer_seconds` of expiry (or past
/// it): `now >= expires_at - buffer`.
pub fn is_expiring(now: DateTime<Utc>, expires_at: DateTime<Utc>, buffer_seconds: i64) -> bool {
    now >= expires_at - Duration::seconds(buffer_seconds)
}
