//! Facade over the NHost client stack.
//!
//! Wires secure storage, the auth client, the file-storage client, and the
//! GraphQL transport together behind one handle:
//!
//! ```ignore
//! use nhost_client::{NhostClient, NhostConfig};
//!
//! let client = NhostClient::new(NhostConfig::new("https://myapp.nhost.run"))?;
//!
//! let session = client.auth().sign_in("user@example.com", "password123").await?;
//! let gql = client.graphql("https://myapp.nhost.run/v1/graphql");
//! let result = gql.execute("{ activities { id title } }", None).await?;
//!
//! client.close();
//! ```

mod config;

pub use config::NhostConfig;
pub use nhost_auth::{AuthClient, AuthError, AuthOptions, AuthState, Session, User};
pub use nhost_files::FilesClient;
pub use nhost_graphql::GraphqlClient;

use nhost_auth::{AccessTokenProvider, HttpAuthApi, SessionStore};
use nhost_keystore::{MemoryStorage, SecureStorage};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Error type for client construction.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Secure storage could not be initialized
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type alias using ClientError.
pub type ClientResult<T> = Result<T, ClientError>;

/// Request timeout for all HTTP traffic.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout for all HTTP traffic.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for an NHost backend.
///
/// One instance per backend; inject it wherever it is needed instead of
/// holding a process-wide singleton. [`NhostClient::close`] releases the
/// background refresh task. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct NhostClient {
    auth: AuthClient,
    files: FilesClient,
    http: reqwest::Client,
}

impl NhostClient {
    /// Create a client backed by platform secure storage.
    ///
    /// Falls back to in-memory storage (sessions do not survive a restart)
    /// on hosts without a platform keychain.
    pub fn new(config: NhostConfig) -> ClientResult<Self> {
        let storage = match nhost_keystore::create_storage() {
            Ok(storage) => storage,
            Err(e) => {
                warn!(error = %e, "Platform secure storage unavailable; falling back to in-memory");
                Box::new(MemoryStorage::new())
            }
        };
        Self::with_storage(config, storage)
    }

    /// Create a client over a caller-provided storage backend.
    pub fn with_storage(
        config: NhostConfig,
        storage: Box<dyn SecureStorage>,
    ) -> ClientResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        let api = Arc::new(HttpAuthApi::new(http.clone(), &config.base_url));
        let auth = AuthClient::new(
            api,
            SessionStore::new(storage),
            AuthOptions {
                auto_refresh_token: config.auto_refresh_token,
                refresh_before_expiry: config.refresh_before_expiry,
            },
        );

        if config.auto_load_session {
            Self::spawn_session_restore(&auth);
        }

        let provider: Arc<dyn AccessTokenProvider> = Arc::new(auth.clone());
        let files = FilesClient::new(http.clone(), &config.base_url, provider);

        Ok(Self { auth, files, http })
    }

    /// Restore the persisted session in the background, as construction is
    /// synchronous and must not wait on the network.
    fn spawn_session_restore(auth: &AuthClient) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No async runtime available; skipping session auto-load");
            return;
        };
        let auth = auth.clone();
        handle.spawn(async move {
            match auth.restore_session().await {
                Ok(true) => debug!("Persisted session restored"),
                Ok(false) => debug!("No persisted session to restore"),
                Err(e) => warn!(error = %e, "Failed to restore persisted session"),
            }
        });
    }

    /// Authentication and session management.
    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// File storage operations.
    pub fn files(&self) -> &FilesClient {
        &self.files
    }

    /// Create a GraphQL client with automatic bearer authentication.
    ///
    /// `endpoint` is the full GraphQL URL, e.g.
    /// `https://myapp.nhost.run/v1/graphql`.
    pub fn graphql(&self, endpoint: impl Into<String>) -> GraphqlClient {
        GraphqlClient::new(self.http.clone(), endpoint, Arc::new(self.auth.clone()))
    }

    /// Tear down the client: the auth refresh timer is cancelled and auth
    /// operations start failing with [`AuthError::Closed`]. Persisted
    /// session state is left in place for the next launch.
    pub fn close(&self) {
        self.auth.close();
    }
}
