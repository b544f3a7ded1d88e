//! Durable token persistence as a permission-restricted JSON file
//!
//! The current token pair is stored at `~/.bbx/token.json`, scoped to the
//! current user: the file is owner read/write (0600) and its containing
//! directory owner-only (0700), created on first save.  Exactly one token is
//! active per installation; there is no per-workspace multiplexing.
//!
//! Writes overwrite the previous content in place and are not atomic; a
//! crash mid-write can corrupt the store, which a later `load` reports as
//! [`BbxError::CorruptTokenStore`] rather than a panic.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BbxError, Result};

/// Seconds subtracted from `expires_at` when deciding whether to refresh,
/// absorbing clock skew and in-flight request latency.
pub const REFRESH_BUFFER_SECS: i64 = 30;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// The durable OAuth credential pair.
///
/// `expires_at` is an absolute UTC timestamp, always computed as
/// exchange/refresh time plus the server-reported `expires_in` lifetime.  It
/// is serialized as epoch seconds so the on-disk representation stays stable
/// across timezone and locale changes.
///
/// # Examples
///
/// ```
/// use bbx::auth::token_store::Token;
/// use chrono::{Duration, Utc};
///
/// let token = Token {
///     access_token: "access".to_string(),
///     refresh_token: "refresh".to_string(),
///     expires_at: Utc::now() + Duration::hours(1),
/// };
/// assert!(!token.is_expired());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// The short-lived bearer token presented to the REST API.
    pub access_token: String,

    /// The long-lived credential used to obtain new access tokens without
    /// re-running the browser flow.
    pub refresh_token: String,

    /// UTC timestamp at which the access token expires, stored as epoch
    /// seconds.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Returns `true` when the access token is expired or about to expire.
    ///
    /// A buffer of [`REFRESH_BUFFER_SECS`] is applied so that a token is
    /// refreshed before it is rejected mid-request by the resource server.
    ///
    /// # Examples
    ///
    /// ```
    /// use bbx::auth::token_store::Token;
    /// use chrono::{Duration, Utc};
    ///
    /// let stale = Token {
    ///     access_token: "tok".to_string(),
    ///     refresh_token: "ref".to_string(),
    ///     expires_at: Utc::now() - Duration::seconds(1),
    /// };
    /// assert!(stale.is_expired());
    /// ```
    pub fn is_expired(&self) -> bool {
        let buffer = chrono::Duration::seconds(REFRESH_BUFFER_SECS);
        Utc::now() >= self.expires_at - buffer
    }
}

// ---------------------------------------------------------------------------
// TokenStore
// ---------------------------------------------------------------------------

/// File-backed store owning the on-disk representation of the [`Token`].
///
/// The store holds only the target path; it performs no caching and no
/// locking of its own.  Concurrency control lives in
/// [`TokenManager`](super::manager::TokenManager), which serializes every
/// load/refresh/save sequence.
///
/// # Examples
///
/// ```no_run
/// use bbx::auth::token_store::TokenStore;
///
/// # fn example() -> bbx::error::Result<()> {
/// let store = TokenStore::default_location()?;
/// match store.load() {
///     Ok(token) => println!("expires at {}", token.expires_at),
///     Err(e) => eprintln!("{e}"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store backed by an explicit file path.
    ///
    /// Used by tests; production code goes through
    /// [`default_location`](Self::default_location).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the fixed per-user path `~/.bbx/token.json`.
    ///
    /// # Errors
    ///
    /// Returns [`BbxError::Config`] when the home directory cannot be
    /// determined.
    pub fn default_location() -> Result<Self> {
        let dirs = directories::UserDirs::new()
            .ok_or_else(|| BbxError::Config("cannot find home directory".to_string()))?;
        Ok(Self {
            path: dirs.home_dir().join(".bbx").join("token.json"),
        })
    }

    /// The file path this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted token.
    ///
    /// # Errors
    ///
    /// - [`BbxError::NotLoggedIn`] when the token file does not exist.
    /// - [`BbxError::CorruptTokenStore`] when the file content cannot be
    ///   parsed as a valid token.
    /// - [`BbxError::Io`] for any other read failure.
    pub fn load(&self) -> Result<Token> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BbxError::NotLoggedIn.into());
            }
            Err(e) => return Err(BbxError::Io(e).into()),
        };

        let token: Token = serde_json::from_slice(&data)
            .map_err(|e| BbxError::CorruptTokenStore(e.to_string()))?;
        Ok(token)
    }

    /// Persists the token, overwriting any prior content.
    ///
    /// Creates the containing directory with mode 0700 and writes the file
    /// with mode 0600 on Unix.  The write is not atomic.
    ///
    /// # Errors
    ///
    /// Returns [`BbxError::Io`] on filesystem failures and
    /// [`BbxError::Serialization`] if the token cannot be encoded.
    pub fn save(&self, token: &Token) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            create_private_dir(dir).map_err(BbxError::Io)?;
        }

        let data = serde_json::to_vec_pretty(token).map_err(BbxError::Serialization)?;
        write_private_file(&self.path, &data).map_err(BbxError::Io)?;

        tracing::debug!("token saved to {}", self.path.display());
        Ok(())
    }

    /// Deletes the persisted token.
    ///
    /// Returns `Ok(false)` when no token file existed, so the operation is
    /// idempotent.
    pub fn delete(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BbxError::Io(e).into()),
        }
    }
}

/// Creates `dir` (and parents) with owner-only permissions.
#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Writes `data` to `path` with owner-only read/write permissions.
#[cfg(unix)]
fn write_private_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write as _;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(data)
}

#[cfg(not(unix))]
fn write_private_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
