//! Session persistence over secure storage.
//!
//! The auth client is the only writer; storage is a durable mirror of the
//! in-memory session, written after every successful mutation and read once
//! at restore.

use crate::session::{Session, User};
use chrono::{DateTime, Utc};
use nhost_keystore::{SecureStorage, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Keys under which session parts are filed.
pub struct StorageKeys;

impl StorageKeys {
    /// Access token
    pub const ACCESS_TOKEN: &'static str = "nhost_access_token";

    /// Refresh token
    pub const REFRESH_TOKEN: &'static str = "nhost_refresh_token";

    /// Session metadata (JSON)
    pub const SESSION_META: &'static str = "nhost_session_meta";
}

/// Non-secret session metadata persisted alongside the tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionMeta {
    user: User,
    /// When the access token expires (RFC 3339)
    expires_at: String,
    /// Access token lifetime in seconds, kept so a restored session
    /// round-trips unchanged
    access_token_expires_in: i64,
    #[serde(default)]
    refresh_token_id: Option<String>,
}

/// A session loaded back from storage.
#[derive(Debug, Clone)]
pub struct PersistedSession {
    pub session: Session,
    pub expires_at: DateTime<Utc>,
}

/// Typed wrapper over a [`SecureStorage`] backend.
pub struct SessionStore {
    storage: Box<dyn SecureStorage>,
}

impl SessionStore {
    /// Create a new store over the given backend.
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    /// Persist a session. All three entries are written; a failure part-way
    /// leaves earlier entries behind, which `load` treats as absent.
    pub fn save(&self, session: &Session, expires_at: DateTime<Utc>) -> StorageResult<()> {
        let meta = SessionMeta {
            user: session.user.clone(),
            expires_at: expires_at.to_rfc3339(),
            access_token_expires_in: session.access_token_expires_in,
            refresh_token_id: session.refresh_token_id.clone(),
        };
        let meta_json = serde_json::to_string(&meta)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.storage
            .set(StorageKeys::ACCESS_TOKEN, &session.access_token)?;
        self.storage
            .set(StorageKeys::REFRESH_TOKEN, &session.refresh_token)?;
        self.storage.set(StorageKeys::SESSION_META, &meta_json)?;

        Ok(())
    }

    /// Load the persisted session, if one is fully present.
    ///
    /// A partial or unparseable record yields `Ok(None)` — a session is
    /// either fully present or absent, never half-restored.
    pub fn load(&self) -> StorageResult<Option<PersistedSession>> {
        let Some(access_token) = self.storage.get(StorageKeys::ACCESS_TOKEN)? else {
            return Ok(None);
        };
        let Some(refresh_token) = self.storage.get(StorageKeys::REFRESH_TOKEN)? else {
            return Ok(None);
        };
        let Some(meta_json) = self.storage.get(StorageKeys::SESSION_META)? else {
            return Ok(None);
        };

        let meta: SessionMeta = match serde_json::from_str(&meta_json) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(error = %e, "Persisted session metadata is unreadable; discarding");
                return Ok(None);
            }
        };

        let expires_at = match DateTime::parse_from_rfc3339(&meta.expires_at) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                warn!(error = %e, "Persisted expiry timestamp is unreadable; discarding");
                return Ok(None);
            }
        };

        if access_token.is_empty() || refresh_token.is_empty() {
            return Ok(None);
        }

        Ok(Some(PersistedSession {
            session: Session {
                access_token,
                refresh_token,
                access_token_expires_in: meta.access_token_expires_in,
                refresh_token_id: meta.refresh_token_id,
                user: meta.user,
            },
            expires_at,
        }))
    }

    /// Remove all session entries.
    pub fn clear(&self) -> StorageResult<()> {
        self.storage.delete(StorageKeys::ACCESS_TOKEN)?;
        self.storage.delete(StorageKeys::REFRESH_TOKEN)?;
        self.storage.delete(StorageKeys::SESSION_META)?;
        Ok(())
    }

    /// Whether any session entries exist.
    pub fn has_session(&self) -> StorageResult<bool> {
        self.storage.has(StorageKeys::REFRESH_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use nhost_keystore::MemoryStorage;
    use std::collections::HashMap;

    fn test_session() -> Session {
        Session {
            access_token: "access-1".to_string(),
            refresh_token: "refresh-1".to_string(),
            access_token_expires_in: 900,
            refresh_token_id: Some("rt-id".to_string()),
            user: User {
                id: "user-1".to_string(),
                email: Some("user@example.com".to_string()),
                display_name: "Test User".to_string(),
                avatar_url: String::new(),
                created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                locale: "en".to_string(),
                is_anonymous: false,
                default_role: "user".to_string(),
                roles: vec!["user".to_string()],
                email_verified: true,
                phone_number: None,
                phone_number_verified: false,
                active_mfa_type: None,
                metadata: Some(HashMap::from([(
                    "org".to_string(),
                    "arya-mahasangh".to_string(),
                )])),
            },
        }
    }

    #[test]
    fn save_and_load_roundtrip() {
        let store = SessionStore::new(Box::new(MemoryStorage::new()));
        let session = test_session();
        let expires_at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        store.save(&session, expires_at).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.session, session);
        assert_eq!(loaded.expires_at, expires_at);
        assert!(store.has_session().unwrap());
    }

    #[test]
    fn load_returns_none_when_empty() {
        let store = SessionStore::new(Box::new(MemoryStorage::new()));
        assert!(store.load().unwrap().is_none());
        assert!(!store.has_session().unwrap());
    }

    #[test]
    fn partial_record_is_treated_as_absent() {
        let storage = Box::new(MemoryStorage::new());
        storage.set(StorageKeys::ACCESS_TOKEN, "access-1").unwrap();
        // No refresh token, no meta

        let store = SessionStore::new(storage);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn corrupt_meta_is_treated_as_absent() {
        let storage = Box::new(MemoryStorage::new());
        storage.set(StorageKeys::ACCESS_TOKEN, "access-1").unwrap();
        storage.set(StorageKeys::REFRESH_TOKEN, "refresh-1").unwrap();
        storage.set(StorageKeys::SESSION_META, "not json").unwrap();

        let store = SessionStore::new(storage);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn clear_removes_all_entries() {
        let store = SessionStore::new(Box::new(MemoryStorage::new()));
        let session = test_session();
        store
            .save(&session, Utc::now() + Duration::seconds(900))
            .unwrap();

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(!store.has_session().unwrap());
    }
}
