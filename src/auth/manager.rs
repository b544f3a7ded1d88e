//! Token cache and refresh coordination
//!
//! [`TokenManager`] is the sole entry point other components use to obtain
//! a currently valid access token.  The API client calls
//! [`TokenManager::get_token`] once per outgoing request, potentially from
//! many concurrent workers; the manager hides expiry checking, the refresh
//! grant, and persistence behind a single critical section.
//!
//! The manager is a plain value owning its lock, store, and credentials.
//! There is deliberately no process-global singleton; consumers receive a
//! shared reference (typically `Arc<TokenManager>`).

use tokio::sync::Mutex;

use crate::auth::exchange::TokenExchanger;
use crate::auth::flow;
use crate::auth::token_store::{Token, TokenStore};
use crate::error::{BbxError, Result};

// ---------------------------------------------------------------------------
// TokenManager
// ---------------------------------------------------------------------------

/// Coordinates the persisted token's lifecycle for all consumers.
///
/// # Concurrency
///
/// Every `get_token` call takes one leaf-level async mutex for its entire
/// load / expiry-check / refresh / save sequence.  Consequences:
///
/// - At most one refresh grant is in flight at any time per process.
/// - Concurrent callers observe either the pre-refresh or the fully
///   persisted post-refresh token, never a partial update.
/// - No nested lock acquisition exists, so there is no deadlock risk.
///
/// # Examples
///
/// ```no_run
/// use bbx::auth::exchange::TokenExchanger;
/// use bbx::auth::manager::TokenManager;
/// use bbx::auth::token_store::TokenStore;
///
/// # async fn example() -> bbx::error::Result<()> {
/// let exchanger = TokenExchanger::new(
///     reqwest::Client::new(),
///     "client-id".to_string(),
///     "client-secret".to_string(),
/// );
/// let manager = TokenManager::new(exchanger, TokenStore::default_location()?);
///
/// let access_token = manager.get_token().await?;
/// // attach as `Authorization: Bearer {access_token}`
/// # Ok(())
/// # }
/// ```
pub struct TokenManager {
    exchanger: TokenExchanger,
    store: TokenStore,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    /// Creates a manager from an exchanger and a token store.
    pub fn new(exchanger: TokenExchanger, store: TokenStore) -> Self {
        Self {
            exchanger,
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Runs the browser login flow and persists the resulting token.
    ///
    /// One-shot and foreground: it blocks on the user's browser interaction
    /// (bounded by the login timeout) and ends in a terminal state.  A
    /// second concurrent login would fail to bind the fixed callback port,
    /// which is surfaced as [`BbxError::Bind`].
    pub async fn login(&self) -> Result<()> {
        let token = flow::authorize(&self.exchanger).await?;
        self.store.save(&token)?;
        Ok(())
    }

    /// Returns a currently valid access token, refreshing if needed.
    ///
    /// Algorithm, entirely inside the critical section:
    ///
    /// 1. Load the persisted token ([`BbxError::NotLoggedIn`] when absent).
    /// 2. If the token is within the refresh buffer of expiry, perform the
    ///    refresh grant and persist the new token.
    /// 3. Return the access token string.
    ///
    /// # Errors
    ///
    /// Returns [`BbxError::RefreshFailed`] when the refresh grant fails; the
    /// previously persisted token is left untouched so a later manual login
    /// starts from a consistent state.
    pub async fn get_token(&self) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        let token = self.store.load()?;
        if !token.is_expired() {
            return Ok(token.access_token);
        }

        tracing::debug!("access token expired or near expiry; refreshing");
        let refreshed = match self.exchanger.refresh(&token.refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                tracing::warn!("token refresh failed: {e}");
                return Err(BbxError::RefreshFailed(e.to_string()).into());
            }
        };
        self.store.save(&refreshed)?;
        Ok(refreshed.access_token)
    }

    /// Deletes the persisted token.
    ///
    /// Returns `true` when a token existed; idempotent otherwise.
    pub fn logout(&self) -> Result<bool> {
        self.store.delete()
    }

    /// Loads the persisted token without refreshing it.
    ///
    /// Used by the `status` command to report expiry; never contacts the
    /// provider.
    pub fn status(&self) -> Result<Token> {
        self.store.load()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
