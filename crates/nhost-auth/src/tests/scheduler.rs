//! Proactive refresh timing and the non-blocking access-token contract.

use super::harness::{build_client, settle, test_session};
use crate::client::AuthOptions;
use crate::error::AuthError;
use crate::fsm::AuthState;
use crate::store::StorageKeys;
use nhost_keystore::SecureStorage;
use std::time::Duration;

fn options(buffer: u64) -> AuthOptions {
    AuthOptions {
        auto_refresh_token: true,
        refresh_before_expiry: buffer,
    }
}

#[tokio::test(start_paused = true)]
async fn proactive_refresh_fires_exactly_once_at_deadline() {
    let t = build_client(options(60));
    t.api.queue_sign_in(Ok(test_session("access-1", 120)));
    t.api.queue_refresh(Ok(test_session("access-2", 120)));
    t.client
        .sign_in("user@example.com", "password123")
        .await
        .unwrap();

    // Let the spawned refresh task arm its timer before advancing paused
    // virtual time, so its sleep deadline anchors at sign-in, not t+58s.
    settle().await;

    // Just short of the deadline: nothing fires
    tokio::time::advance(Duration::from_secs(58)).await;
    assert_eq!(t.api.refresh_calls(), 0);

    // Past expires_at - buffer: exactly one refresh
    tokio::time::advance(Duration::from_secs(3)).await;
    settle().await;

    assert_eq!(t.api.refresh_calls(), 1);
    assert_eq!(t.client.access_token().as_deref(), Some("access-2"));
    assert_eq!(
        t.storage.get(StorageKeys::ACCESS_TOKEN).unwrap(),
        Some("access-2".to_string())
    );
    assert_eq!(t.client.state(), AuthState::SignedIn);
}

#[tokio::test(start_paused = true)]
async fn sign_out_cancels_the_refresh_timer() {
    let t = build_client(options(60));
    t.api.queue_sign_in(Ok(test_session("access-1", 120)));
    t.client
        .sign_in("user@example.com", "password123")
        .await
        .unwrap();

    t.client.sign_out().await.unwrap();

    // Well past the old expiry: no refresh may fire
    tokio::time::advance(Duration::from_secs(300)).await;
    settle().await;

    assert_eq!(t.api.refresh_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn disabled_auto_refresh_never_arms_the_timer() {
    let t = build_client(AuthOptions {
        auto_refresh_token: false,
        refresh_before_expiry: 60,
    });
    t.api.queue_sign_in(Ok(test_session("access-1", 120)));
    t.client
        .sign_in("user@example.com", "password123")
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(300)).await;
    settle().await;

    assert_eq!(t.api.refresh_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn close_cancels_the_timer_and_rejects_operations() {
    let t = build_client(options(60));
    t.api.queue_sign_in(Ok(test_session("access-1", 120)));
    t.client
        .sign_in("user@example.com", "password123")
        .await
        .unwrap();

    t.client.close();

    tokio::time::advance(Duration::from_secs(300)).await;
    settle().await;
    assert_eq!(t.api.refresh_calls(), 0);

    assert!(t.client.access_token().is_none());
    assert!(matches!(
        t.client.refresh().await,
        Err(AuthError::Closed)
    ));
    assert!(matches!(
        t.client.sign_in("user@example.com", "password123").await,
        Err(AuthError::Closed)
    ));
}

#[tokio::test]
async fn token_inside_buffer_is_returned_while_refresh_runs_in_background() {
    let t = build_client(options(60));
    t.api.queue_sign_in(Ok(test_session("access-1", 120)));
    t.api.queue_refresh(Ok(test_session("access-2", 120)));
    t.client
        .sign_in("user@example.com", "password123")
        .await
        .unwrap();

    // 61s in: inside the buffer window but still 59s of real life left
    t.clock.advance_secs(61);

    assert_eq!(t.client.access_token().as_deref(), Some("access-1"));

    settle().await;
    assert_eq!(t.api.refresh_calls(), 1);
    assert_eq!(t.client.access_token().as_deref(), Some("access-2"));
}

#[tokio::test]
async fn expired_token_yields_none_while_refresh_catches_up() {
    let t = build_client(options(60));
    t.api.queue_sign_in(Ok(test_session("access-1", 120)));
    t.api.queue_refresh(Ok(test_session("access-2", 900)));
    t.client
        .sign_in("user@example.com", "password123")
        .await
        .unwrap();

    // Past actual expiry: no token is handed out
    t.clock.advance_secs(121);
    assert!(t.client.access_token().is_none());
    assert_eq!(t.client.state(), AuthState::Expired);

    // The background refresh lands and service resumes
    settle().await;
    assert_eq!(t.api.refresh_calls(), 1);
    assert_eq!(t.client.access_token().as_deref(), Some("access-2"));
    assert_eq!(t.client.state(), AuthState::SignedIn);
}

#[tokio::test(start_paused = true)]
async fn simultaneous_token_reads_trigger_at_most_one_refresh() {
    let t = build_client(options(60));
    t.api.queue_sign_in(Ok(test_session("access-1", 120)));
    t.api.set_refresh_delay(Duration::from_millis(100));
    t.api.queue_refresh(Ok(test_session("access-2", 120)));
    t.client
        .sign_in("user@example.com", "password123")
        .await
        .unwrap();

    t.clock.advance_secs(61);

    let first = t.client.access_token();
    let second = t.client.access_token();
    assert_eq!(first.as_deref(), Some("access-1"));
    assert_eq!(second.as_deref(), Some("access-1"));

    settle().await;
    settle().await;
    assert_eq!(t.api.refresh_calls(), 1);
    assert_eq!(t.client.access_token().as_deref(), Some("access-2"));
}
