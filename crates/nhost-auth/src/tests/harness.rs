//! Test harness for the auth client.
//!
//! Provides:
//! - `MockAuthApi`: a programmable stub backend with call counters
//! - `ManualClock`: a clock advanced by hand
//! - `build_client`: a client wired to both, over shared in-memory storage

use crate::api::AuthApi;
use crate::client::{AuthClient, AuthOptions};
use crate::clock::Clock;
use crate::error::{AuthError, AuthResult};
use crate::session::{Session, User};
use crate::store::SessionStore;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use nhost_keystore::MemoryStorage;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fixed origin for the manual clock.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn test_user(id: &str) -> User {
    User {
        id: id.to_string(),
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
        metadata: None,
    }
}

pub fn test_session(access_token: &str, expires_in: i64) -> Session {
    Session {
        access_token: access_token.to_string(),
        refresh_token: format!("refresh-for-{}", access_token),
        access_token_expires_in: expires_in,
        refresh_token_id: None,
        user: test_user("user-1"),
    }
}

/// Programmable stub backend.
///
/// Each operation pops its next queued result; an empty queue yields a
/// rejection so an unexpected extra call fails the test loudly.
pub struct MockAuthApi {
    sign_in_results: Mutex<VecDeque<AuthResult<Session>>>,
    refresh_results: Mutex<VecDeque<AuthResult<Session>>>,
    sign_out_result: Mutex<AuthResult<()>>,
    /// Simulated network latency for refresh calls.
    refresh_delay: Mutex<Option<Duration>>,
    sign_in_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl MockAuthApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sign_in_results: Mutex::new(VecDeque::new()),
            refresh_results: Mutex::new(VecDeque::new()),
            sign_out_result: Mutex::new(Ok(())),
            refresh_delay: Mutex::new(None),
            sign_in_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        })
    }

    pub fn queue_sign_in(&self, result: AuthResult<Session>) {
        self.sign_in_results.lock().unwrap().push_back(result);
    }

    pub fn queue_refresh(&self, result: AuthResult<Session>) {
        self.refresh_results.lock().unwrap().push_back(result);
    }

    pub fn set_sign_out_result(&self, result: AuthResult<()>) {
        *self.sign_out_result.lock().unwrap() = result;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = Some(delay);
    }

    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn sign_in(&self, _email: &str, _password: &str) -> AuthResult<Session> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.sign_in_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(AuthError::InvalidCredentials(
                "no stubbed sign-in response".to_string(),
            )))
    }

    async fn refresh(&self, _refresh_token: &str) -> AuthResult<Session> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.refresh_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.refresh_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(AuthError::RefreshRejected(
                "no stubbed refresh response".to_string(),
            )))
    }

    async fn sign_out(&self, _refresh_token: &str) -> AuthResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.sign_out_result.lock().unwrap().clone()
    }
}

/// A clock advanced by hand.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(start),
        })
    }

    pub fn advance_secs(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// A client plus handles to everything behind it.
pub struct TestAuth {
    pub client: AuthClient,
    pub api: Arc<MockAuthApi>,
    pub clock: Arc<ManualClock>,
    pub storage: Arc<MemoryStorage>,
}

pub fn build_client(options: AuthOptions) -> TestAuth {
    let api = MockAuthApi::new();
    let clock = ManualClock::new(start_time());
    let storage = Arc::new(MemoryStorage::new());
    let store = SessionStore::new(Box::new(storage.clone()));
    let client = AuthClient::with_clock(api.clone(), store, options, clock.clone());

    TestAuth {
        client,
        api,
        clock,
        storage,
    }
}

/// A second store over the same backing storage, for seeding and inspection.
pub fn store_for(storage: &Arc<MemoryStorage>) -> SessionStore {
    SessionStore::new(Box::new(storage.clone()))
}

/// Let spawned tasks and short timers run to completion.
///
/// Under paused virtual time the sleep advances the clock instantly.
pub async fn settle() {
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}
