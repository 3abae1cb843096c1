//! Auth client: session ownership, refresh scheduling, observable user state.

use crate::api::{AccessTokenProvider, AuthApi};
use crate::clock::{Clock, SystemClock};
use crate::error::{AuthError, AuthResult};
use crate::fsm::{AuthMachine, AuthMachineInput, AuthState};
use crate::session::{is_expiring, Session, User};
use crate::store::{PersistedSession, SessionStore};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Tuning knobs for the auth client.
#[derive(Debug, Clone)]
pub struct AuthOptions {
    /// Proactively refresh the access token before it expires.
    pub auto_refresh_token: bool,
    /// Seconds before expiry at which a refresh is due.
    pub refresh_before_expiry: u64,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            refresh_before_expiry: 60,
        }
    }
}

/// The session state owned exclusively by the client.
///
/// `epoch` is bumped on every applied mutation; an in-flight operation that
/// started under an older epoch must discard its result instead of applying
/// it over newer state.
#[derive(Default)]
struct SessionState {
    session: Option<Session>,
    issued_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    epoch: u64,
}

type RefreshOutcome = AuthResult<Session>;

struct Inner {
    api: Arc<dyn AuthApi>,
    store: SessionStore,
    clock: Arc<dyn Clock>,
    options: AuthOptions,
    fsm: Mutex<AuthMachine>,
    state: Mutex<SessionState>,
    session_tx: watch::Sender<Option<Session>>,
    user_tx: watch::Sender<Option<User>>,
    /// Receiver for the in-flight refresh, if one is outstanding.
    refresh_flight: Mutex<Option<watch::Receiver<Option<RefreshOutcome>>>>,
    refresh_timer: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

/// Authentication client for an NHost backend.
///
/// Owns the current [`Session`], performs sign-in/sign-out/refresh, keeps a
/// proactive refresh timer armed, and exposes the signed-in user as a
/// replay-latest [`watch`] stream. Cheap to clone; all clones share state.
/// Call [`AuthClient::close`] to release the background timer.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<Inner>,
}

impl AuthClient {
    /// Create a client over the given API edge and session store.
    pub fn new(api: Arc<dyn AuthApi>, store: SessionStore, options: AuthOptions) -> Self {
        Self::with_clock(api, store, options, Arc::new(SystemClock))
    }

    /// Create a client with an injected time source.
    pub fn with_clock(
        api: Arc<dyn AuthApi>,
        store: SessionStore,
        options: AuthOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (session_tx, _) = watch::channel(None);
        let (user_tx, _) = watch::channel(None);

        Self {
            inner: Arc::new(Inner {
                api,
                store,
                clock,
                options,
                fsm: Mutex::new(AuthMachine::new()),
                state: Mutex::new(SessionState::default()),
                session_tx,
                user_tx,
                refresh_flight: Mutex::new(None),
                refresh_timer: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Sign in with email and password.
    ///
    /// On success the session is stored, persisted, and the user stream
    /// emits. On failure nothing changes; retrying is the caller's call.
    /// Signing in while a session is already held is an invalid transition;
    /// sign out first.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Session> {
        self.inner.ensure_open()?;
        self.inner.transition(&AuthMachineInput::SignInAttempt)?;

        match self.inner.api.sign_in(email, password).await {
            Ok(session) => {
                self.inner.transition(&AuthMachineInput::SignInSucceeded)?;
                self.inner.apply_session(&session)?;
                info!(user_id = %session.user.id, "Signed in");
                Ok(session)
            }
            Err(e) => {
                let _ = self.inner.transition(&AuthMachineInput::SignInFailed);
                Err(e)
            }
        }
    }

    /// Exchange the refresh token for a new session.
    ///
    /// At most one exchange is in flight at a time: callers arriving while
    /// one is outstanding await that same outcome instead of issuing a
    /// second request, so a single-use refresh token is never spent twice.
    pub async fn refresh(&self) -> AuthResult<Session> {
        self.inner.ensure_open()?;
        Inner::refresh(&self.inner).await
    }

    /// Sign out.
    ///
    /// The refresh token is revoked server-side on a best-effort basis;
    /// local state, persisted storage, and the refresh timer are cleared
    /// regardless of how that call goes.
    pub async fn sign_out(&self) -> AuthResult<()> {
        self.inner.ensure_open()?;

        let refresh_token = {
            let state = self.inner.state.lock().unwrap();
            match state.session.as_ref() {
                Some(session) => session.refresh_token.clone(),
                None => return Ok(()),
            }
        };

        // Tolerate unusual lifecycle states; local cleanup happens no
        // matter what.
        let _ = self.inner.transition(&AuthMachineInput::SignOutRequested);

        if let Err(e) = self.inner.api.sign_out(&refresh_token).await {
            warn!(error = %e, "Server-side sign out failed; clearing local session anyway");
        }

        self.inner.clear_session();
        let _ = self.inner.transition(&AuthMachineInput::SignOutFinished);
        info!("Signed out");
        Ok(())
    }

    /// Restore the persisted session from secure storage.
    ///
    /// A still-live session is installed directly and the refresh timer
    /// re-armed. A lapsed session is refreshed first; only a successful
    /// exchange signs the client in. Returns whether a session was restored.
    pub async fn restore_session(&self) -> AuthResult<bool> {
        self.inner.ensure_open()?;

        let persisted = match self.inner.store.load() {
            Ok(Some(p)) => p,
            Ok(None) => {
                debug!("No persisted session found");
                return Ok(false);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                return Err(e.into());
            }
        };

        let epoch_at_start = self.inner.state.lock().unwrap().epoch;
        let now = self.inner.clock.now();

        if now < persisted.expires_at {
            self.inner.transition(&AuthMachineInput::SessionRestored)?;
            let session = persisted.session.clone();
            if !self.inner.apply_restored(persisted, epoch_at_start)? {
                debug!("Discarding restored session; state changed during restore");
                return Ok(false);
            }
            info!(user_id = %session.user.id, "Session restored from storage");
            return Ok(true);
        }

        // Access token lapsed on disk: exchange the stored refresh token
        // before exposing any session state.
        info!("Persisted session has expired; refreshing");
        match self.inner.api.refresh(&persisted.session.refresh_token).await {
            Ok(session) => {
                if self.inner.state.lock().unwrap().epoch != epoch_at_start {
                    debug!("Discarding restore result; state changed while refreshing");
                    return Ok(false);
                }
                self.inner.transition(&AuthMachineInput::SessionRestored)?;
                let issued_at = self.inner.clock.now();
                let expires_at = session.expires_at(issued_at);
                if !self
                    .inner
                    .install_session(&session, issued_at, expires_at, Some(epoch_at_start))?
                {
                    debug!("Discarding restore result; state changed while refreshing");
                    return Ok(false);
                }
                info!(user_id = %session.user.id, "Session restored after refresh");
                Ok(true)
            }
            Err(e) if e.is_transient() => {
                // Storage stays intact; the next launch can try again.
                warn!(error = %e, "Restore refresh failed with transient error");
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Persisted refresh token rejected; clearing storage");
                if let Err(clear_err) = self.inner.store.clear() {
                    warn!(error = %clear_err, "Failed to clear persisted session");
                }
                Err(e)
            }
        }
    }

    /// The current access token, without blocking.
    ///
    /// Expiry is checked against the injected clock. Inside the refresh
    /// buffer a background refresh is kicked off and the still-live token is
    /// returned. Past actual expiry this returns `None` while the background
    /// refresh proceeds — the caller's request fails once and succeeds on
    /// retry.
    pub fn access_token(&self) -> Option<String> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return None;
        }

        let buffer = self.inner.options.refresh_before_expiry as i64;
        let now = self.inner.clock.now();

        let (token, trigger) = {
            let state = self.inner.state.lock().unwrap();
            let (Some(session), Some(expires_at)) = (state.session.as_ref(), state.expires_at)
            else {
                return None;
            };

            if now >= expires_at {
                (None, true)
            } else if is_expiring(now, expires_at, buffer) {
                (Some(session.access_token.clone()), true)
            } else {
                (Some(session.access_token.clone()), false)
            }
        };

        if token.is_none() {
            let _ = self.inner.transition(&AuthMachineInput::AccessTokenLapsed);
        }

        if trigger {
            self.inner.spawn_background_refresh();
        }

        token
    }

    /// Replay-latest stream of the signed-in user.
    ///
    /// New subscribers observe the current value immediately via
    /// [`watch::Receiver::borrow`]; a change is only emitted when the user
    /// actually differs.
    pub fn current_user(&self) -> watch::Receiver<Option<User>> {
        self.inner.user_tx.subscribe()
    }

    /// Replay-latest stream of the full session.
    pub fn current_session(&self) -> watch::Receiver<Option<Session>> {
        self.inner.session_tx.subscribe()
    }

    /// Snapshot of the signed-in user.
    pub fn user(&self) -> Option<User> {
        self.inner.user_tx.borrow().clone()
    }

    /// Whether a session is currently held.
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.lock().unwrap().session.is_some()
    }

    /// When the current access token was issued and when it expires.
    pub fn token_validity(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let state = self.inner.state.lock().unwrap();
        state.issued_at.zip(state.expires_at)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AuthState {
        let fsm = self.inner.fsm.lock().unwrap();
        AuthState::from(fsm.state())
    }

    /// Tear the client down: the refresh timer is cancelled and subsequent
    /// operations fail with [`AuthError::Closed`]. Persisted storage is left
    /// untouched so the session can be restored on the next launch.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut timer = self.inner.refresh_timer.lock().unwrap();
        if let Some(task) = timer.take() {
            task.abort();
        }
        debug!("Auth client closed");
    }
}

impl AccessTokenProvider for AuthClient {
    fn access_token(&self) -> Option<String> {
        AuthClient::access_token(self)
    }
}

impl Inner {
    fn ensure_open(&self) -> AuthResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AuthError::Closed);
        }
        Ok(())
    }

    /// Drive the FSM, logging state changes.
    fn transition(&self, input: &AuthMachineInput) -> AuthResult<AuthState> {
        let mut fsm = self.fsm.lock().unwrap();
        let old_state = AuthState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = AuthState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Auth state transition"
            );
        }

        Ok(new_state)
    }

    /// Atomically install a session.
    ///
    /// Persistence happens under the state lock, so storage writes stay
    /// serialized and memory never disagrees with the mirror. With
    /// `expected_epoch` set, the install is discarded (returning `false`)
    /// when another mutation has landed since that epoch was read.
    fn install_session(
        self: &Arc<Self>,
        session: &Session,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        expected_epoch: Option<u64>,
    ) -> AuthResult<bool> {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(expected) = expected_epoch {
                if state.epoch != expected {
                    return Ok(false);
                }
            }
            self.store.save(session, expires_at)?;
            state.epoch += 1;
            state.session = Some(session.clone());
            state.issued_at = Some(issued_at);
            state.expires_at = Some(expires_at);
        }

        self.emit(session);
        self.schedule_refresh();
        Ok(true)
    }

    /// Install a fresh session issued now.
    fn apply_session(self: &Arc<Self>, session: &Session) -> AuthResult<()> {
        let issued_at = self.clock.now();
        let expires_at = session.expires_at(issued_at);
        self.install_session(session, issued_at, expires_at, None)?;
        Ok(())
    }

    /// Install a session loaded from storage, keeping its original expiry.
    fn apply_restored(
        self: &Arc<Self>,
        persisted: PersistedSession,
        epoch_at_start: u64,
    ) -> AuthResult<bool> {
        let issued_at = persisted.expires_at
            - chrono::Duration::seconds(persisted.session.access_token_expires_in);
        self.install_session(
            &persisted.session,
            issued_at,
            persisted.expires_at,
            Some(epoch_at_start),
        )
    }

    /// Emit on both streams, deduplicating unchanged values.
    fn emit(&self, session: &Session) {
        let session = session.clone();
        let user = session.user.clone();

        self.session_tx.send_if_modified(|current| {
            if current.as_ref() != Some(&session) {
                *current = Some(session.clone());
                true
            } else {
                false
            }
        });
        self.user_tx.send_if_modified(|current| {
            if current.as_ref() != Some(&user) {
                *current = Some(user.clone());
                true
            } else {
                false
            }
        });
    }

    /// Drop the session: cancel the timer, wipe storage, emit `None`.
    fn clear_session(&self) {
        {
            let mut timer = self.refresh_timer.lock().unwrap();
            if let Some(task) = timer.take() {
                task.abort();
            }
        }

        {
            let mut state = self.state.lock().unwrap();
            state.epoch += 1;
            state.session = None;
            state.issued_at = None;
            state.expires_at = None;

            // Same lock as install_session, keeping storage single-writer
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "Failed to clear persisted session");
            }
        }

        self.session_tx.send_if_modified(|current| {
            if current.is_some() {
                *current = None;
                true
            } else {
                false
            }
        });
        self.user_tx.send_if_modified(|current| {
            if current.is_some() {
                *current = None;
                true
            } else {
                false
            }
        });
    }

    /// Re-arm the proactive refresh timer for the current session.
    ///
    /// One task at a time; the previous one is aborted. The task fires a
    /// single refresh at `expires_at - refresh_before_expiry`; rescheduling
    /// happens when the refreshed session is applied.
    fn schedule_refresh(self: &Arc<Self>) {
        if !self.options.auto_refresh_token {
            return;
        }

        let Some(expires_at) = self.state.lock().unwrap().expires_at else {
            return;
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No async runtime available; proactive refresh disabled");
            return;
        };

        let buffer = chrono::Duration::seconds(self.options.refresh_before_expiry as i64);
        let now = self.clock.now();
        let delay = (expires_at - buffer - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        debug!(delay_secs = delay.as_secs(), "Scheduling token refresh");

        let weak = Arc::downgrade(self);
        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = Weak::upgrade(&weak) else {
                return;
            };
            if let Err(e) = Inner::refresh(&inner).await {
                warn!(error = %e, "Scheduled token refresh failed");
            }
        });

        let mut timer = self.refresh_timer.lock().unwrap();
        if let Some(old) = timer.replace(task) {
            old.abort();
        }
    }

    /// Kick a refresh off without awaiting it.
    fn spawn_background_refresh(self: &Arc<Self>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No async runtime available; skipping background refresh");
            return;
        };
        let inner = self.clone();
        handle.spawn(async move {
            if let Err(e) = Inner::refresh(&inner).await {
                warn!(error = %e, "Background token refresh failed");
            }
        });
    }

    /// Single-flight refresh entry point.
    async fn refresh(inner: &Arc<Self>) -> AuthResult<Session> {
        // Join an in-flight exchange if there is one, otherwise own a new one.
        enum Flight {
            Join(watch::Receiver<Option<RefreshOutcome>>),
            Own(watch::Sender<Option<RefreshOutcome>>),
        }

        let flight = {
            let mut slot = inner.refresh_flight.lock().unwrap();
            match slot.as_ref() {
                Some(rx) => Flight::Join(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Some(rx);
                    Flight::Own(tx)
                }
            }
        };

        match flight {
            Flight::Join(mut rx) => {
                let outcome = rx
                    .wait_for(|outcome| outcome.is_some())
                    .await
                    .map_err(|_| AuthError::Network("refresh interrupted".to_string()))?
                    .clone();
                outcome.unwrap_or(Err(AuthError::NotSignedIn))
            }
            Flight::Own(tx) => {
                let outcome = Inner::run_refresh(inner).await;
                {
                    let mut slot = inner.refresh_flight.lock().unwrap();
                    *slot = None;
                }
                let _ = tx.send(Some(outcome.clone()));
                outcome
            }
        }
    }

    /// Perform one refresh exchange and apply (or discard) its result.
    async fn run_refresh(inner: &Arc<Self>) -> AuthResult<Session> {
        inner.ensure_open()?;

        let (refresh_token, epoch_at_start) = {
            let state = inner.state.lock().unwrap();
            let Some(session) = state.session.as_ref() else {
                return Err(AuthError::NotSignedIn);
            };
            (session.refresh_token.clone(), state.epoch)
        };

        inner.transition(&AuthMachineInput::RefreshDue)?;
        debug!("Refreshing session token");

        let result = inner.api.refresh(&refresh_token).await;

        // A sign-in or sign-out may have landed while the exchange was in
        // flight; its state wins and this result is discarded.
        {
            let state = inner.state.lock().unwrap();
            if state.epoch != epoch_at_start {
                debug!("Discarding stale refresh result");
                return match state.session.clone() {
                    Some(session) => Ok(session),
                    None => Err(AuthError::NotSignedIn),
                };
            }
        }

        match result {
            Ok(session) => {
                let _ = inner.transition(&AuthMachineInput::RefreshSucceeded);
                let issued_at = inner.clock.now();
                let expires_at = session.expires_at(issued_at);
                if !inner.install_session(&session, issued_at, expires_at, Some(epoch_at_start))? {
                    debug!("Discarding stale refresh result");
                    let state = inner.state.lock().unwrap();
                    return match state.session.clone() {
                        Some(session) => Ok(session),
                        None => Err(AuthError::NotSignedIn),
                    };
                }
                info!(user_id = %session.user.id, "Session refreshed");
                Ok(session)
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, "Token refresh failed with transient error; keeping session");
                let lapsed = {
                    let state = inner.state.lock().unwrap();
                    state
                        .expires_at
                        .map(|expires_at| inner.clock.now() >= expires_at)
                        .unwrap_or(true)
                };
                let _ = inner.transition(if lapsed {
                    &AuthMachineInput::RefreshLapsed
                } else {
                    &AuthMachineInput::RefreshDeferred
                });
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Refresh token rejected; clearing session");
                inner.clear_session();
                let _ = inner.transition(&AuthMachineInput::RefreshRejected);
                Err(e)
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.refresh_timer.lock() {
            if let Some(task) = timer.take() {
                task.abort();
            }
        }
    }
}
