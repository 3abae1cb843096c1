//! Authentication and session management for an NHost backend.
//!
//! This crate provides:
//! - Email/password sign-in, sign-out, and refresh-token exchange
//! - A session model with pure, clock-injected expiry arithmetic
//! - Explicit FSM-based lifecycle state
//! - Proactive token refresh with single-flight collapsing of concurrent
//!   refresh attempts
//! - Session persistence through `nhost-keystore` secure storage
//! - A replay-latest stream of the signed-in user
//!
//! # Core Invariants
//!
//! 1. **Single-Flight Refresh**: at most one token exchange is in flight;
//!    concurrent callers share its outcome. Refresh tokens are single-use
//!    server-side, so a duplicate exchange would invalidate the session.
//! 2. **All-Or-Nothing Session**: a session is fully present or absent —
//!    partial state is never exposed or persisted.
//! 3. **Epoch Ordering**: a refresh that started against an older session
//!    never overwrites state produced by a later sign-in or sign-out.

mod api;
mod client;
mod clock;
mod error;
mod fsm;
mod session;
mod store;
mod wire;

#[cfg(test)]
mod tests;

pub use api::{AccessTokenProvider, AuthApi, HttpAuthApi};
pub use client::{AuthClient, AuthOptions};
pub use clock::{Clock, SystemClock};
pub use error::{AuthError, AuthResult};
pub use fsm::auth_lifecycle;
pub use fsm::{AuthMachine, AuthMachineInput, AuthMachineState, AuthState};
pub use session::{is_expiring, Session, User};
pub use store::{PersistedSession, SessionStore, StorageKeys};
