//! Authentication state machine using rust-fsm.
//!
//! The lifecycle is tracked explicitly rather than derived from storage
//! checks. Session data itself lives with the client; the machine only
//! guards which transitions are legal.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │    SignedOut    │ (initial)
//! └────────┬────────┘
//!          │ SignInAttempt / SessionRestored
//!          ▼
//! ┌─────────────────┐  SignInSucceeded   ┌─────────────────┐
//! │    SigningIn    │ ─────────────────► │    SignedIn     │
//! └────────┬────────┘                    └───┬─────────┬───┘
//!          │ SignInFailed        RefreshDue  │         │ AccessTokenLapsed
//!          ▼                                 ▼         ▼
//!      SignedOut                    ┌─────────────┐ ┌─────────┐
//!                                   │ Refreshing  │◄│ Expired │ (RefreshDue)
//!                                   └──────┬──────┘ └─────────┘
//!                                          │ RefreshSucceeded -> SignedIn
//!                                          │ RefreshDeferred  -> SignedIn
//!                                          │ RefreshLapsed    -> Expired
//!                                          │ RefreshRejected  -> SignedOut
//!                                          ▼
//!   SignOutRequested (from any signed-in state) -> SigningOut
//!                                  SignOutFinished -> SignedOut
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Declarative FSM definition. Generates a module `auth_lifecycle` with:
// - auth_lifecycle::State (enum)
// - auth_lifecycle::Input (enum)
// - auth_lifecycle::StateMachine (type alias)
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub auth_lifecycle(SignedOut)

    SignedOut => {
        SignInAttempt => SigningIn,
        SessionRestored => SignedIn
    },
    SigningIn => {
        SignInSucceeded => SignedIn,
        SignInFailed => SignedOut
    },
    SignedIn => {
        RefreshDue => Refreshing,
        AccessTokenLapsed => Expired,
        SignOutRequested => SigningOut
    },
    Expired => {
        RefreshDue => Refreshing,
        SignOutRequested => SigningOut
    },
    Refreshing => {
        RefreshSucceeded => SignedIn,
        RefreshDeferred => SignedIn,
        RefreshLapsed => Expired,
        RefreshRejected => SignedOut,
        SignOutRequested => SigningOut
    },
    SigningOut => {
        SignOutFinished => SignedOut
    }
}

// Re-export the generated types with clearer names
pub use auth_lifecycle::Input as AuthMachineInput;
pub use auth_lifecycle::State as AuthMachineState;
pub use auth_lifecycle::StateMachine as AuthMachine;

/// Auth lifecycle state for external consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No session.
    SignedOut,
    /// Sign-in request in flight.
    SigningIn,
    /// Valid session held.
    SignedIn,
    /// Token exchange in flight.
    Refreshing,
    /// Access token lapsed; refresh not yet attempted.
    Expired,
    /// Sign-out in progress.
    SigningOut,
}

impl AuthState {
    /// True when a live, non-lapsed session is held.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::SignedIn)
    }

    /// True for in-progress states.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthState::SigningIn | AuthState::Refreshing | AuthState::SigningOut
        )
    }
}

impl From<&AuthMachineState> for AuthState {
    fn from(state: &AuthMachineState) -> Self {
        match state {
            AuthMachineState::SignedOut => AuthState::SignedOut,
            AuthMachineState::SigningIn => AuthState::SigningIn,
            AuthMachineState::SignedIn => AuthState::SignedIn,
            AuthMachineState::Refreshing => AuthState::Refreshing,
            AuthMachineState::Expired => AuthState::Expired,
            AuthMachineState::SigningOut => AuthState::SigningOut,
        }
    }
}
