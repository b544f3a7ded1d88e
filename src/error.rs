//! Error types for bbx
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.
//!
//! The authentication variants map one-to-one onto the failure modes of the
//! OAuth 2.0 Authorization Code + PKCE flow so that callers can distinguish
//! remediation paths: a bind failure means another login is running, a
//! refresh failure means the user must log in again, and so on.

use thiserror::Error;

/// Main error type for bbx operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, the browser-based login flow, token refresh,
/// and token persistence.
#[derive(Error, Debug)]
pub enum BbxError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing client credentials, caught before any flow starts
    #[error("OAuth credentials not configured.\nSet them in .bbx.yaml or via environment variables:\n  BITBUCKET_OAUTH_CLIENT_ID\n  BITBUCKET_OAUTH_CLIENT_SECRET")]
    MissingCredentials,

    /// The fixed callback port is already occupied.
    ///
    /// Surfaced distinctly from [`BbxError::Io`] because the remediation is
    /// different: another login is likely in progress, or a stale process is
    /// holding the port.
    #[error("Callback port {0} is already in use (is another login in progress?)")]
    Bind(u16),

    /// The provider redirected back with an `error` instead of a code
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// No redirect arrived within the login wait window
    #[error("Authorization timed out after {0} seconds")]
    AuthorizationTimeout(u64),

    /// The token endpoint returned a structured OAuth error
    #[error("Token exchange failed ({status}): {error} - {description}")]
    TokenExchange {
        /// HTTP status code returned by the token endpoint
        status: u16,
        /// The OAuth `error` code from the response body
        error: String,
        /// The OAuth `error_description` from the response body
        description: String,
    },

    /// A 2xx token endpoint response could not be parsed
    #[error("Failed to decode token response: {0}")]
    ResponseDecode(String),

    /// Connection-level failure talking to the provider
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// No token has been persisted yet
    #[error("Not logged in. Run 'bbx login' first")]
    NotLoggedIn,

    /// The refresh grant failed; the previously persisted token is untouched
    #[error("Token refresh failed, run 'bbx login' again: {0}")]
    RefreshFailed(String),

    /// The token file exists but cannot be parsed as a valid token
    #[error("Corrupt token store: {0}")]
    CorruptTokenStore(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for bbx operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
