//! Token endpoint grants: authorization-code exchange and refresh
//!
//! Both grant types POST a form-encoded body to the Bitbucket token endpoint
//! with HTTP Basic authentication carrying the registered client
//! credentials.  The server-reported `expires_in` lifetime is converted to
//! an absolute `expires_at` timestamp at response time, so the stored token
//! never depends on a client-side guess about when the exchange happened.
//!
//! No retries happen here; connection failures and endpoint errors propagate
//! immediately and retry policy, if any, belongs to the caller.

use chrono::Utc;
use serde::Deserialize;

use crate::auth::{REDIRECT_URI, TOKEN_URL};
use crate::auth::token_store::Token;
use crate::error::{BbxError, Result};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Raw JSON success body from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

impl TokenResponse {
    /// Converts the raw response into a [`Token`], anchoring `expires_at`
    /// to the current time.
    ///
    /// The server controls `expires_in`, so a lifetime that overflows the
    /// timestamp arithmetic is treated like any other undecodable body and
    /// surfaces as [`BbxError::ResponseDecode`] rather than a panic.
    fn into_token(self) -> Result<Token> {
        let expires_at = i64::try_from(self.expires_in)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                BbxError::ResponseDecode(format!("implausible expires_in: {}", self.expires_in))
            })?;
        Ok(Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        })
    }
}

/// Raw JSON error body from the token endpoint.
#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

// ---------------------------------------------------------------------------
// TokenExchanger
// ---------------------------------------------------------------------------

/// Performs the two token-endpoint grant types against the provider.
///
/// The exchanger owns the registered client credentials and a shared HTTP
/// client.  It is stateless across calls; the
/// [`TokenManager`](super::manager::TokenManager) decides when a grant is
/// needed.
///
/// # Examples
///
/// ```
/// use bbx::auth::exchange::TokenExchanger;
///
/// let exchanger = TokenExchanger::new(
///     reqwest::Client::new(),
///     "my-client-id".to_string(),
///     "my-client-secret".to_string(),
/// );
/// assert_eq!(exchanger.client_id(), "my-client-id");
/// ```
pub struct TokenExchanger {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
}

impl TokenExchanger {
    /// Creates an exchanger targeting the fixed Bitbucket token endpoint.
    pub fn new(http: reqwest::Client, client_id: String, client_secret: String) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Overrides the token endpoint URL.
    ///
    /// Used by tests to point the exchanger at a local mock server.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// The registered OAuth consumer key.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Exchanges an authorization code for a fresh token pair
    /// (`grant_type=authorization_code`).
    ///
    /// The `code_verifier` must be the PKCE verifier whose challenge was
    /// sent in the authorize request that produced `code`.
    ///
    /// # Errors
    ///
    /// See [`TokenExchanger`] error mapping: [`BbxError::TokenExchange`] for
    /// structured endpoint errors, [`BbxError::ResponseDecode`] for
    /// unparseable success bodies, [`BbxError::Transport`] for connection
    /// failures.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<Token> {
        tracing::debug!("exchanging authorization code for tokens");
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", REDIRECT_URI),
            ("code_verifier", code_verifier),
        ];
        self.request_token(&params).await
    }

    /// Obtains a new token pair from a refresh token
    /// (`grant_type=refresh_token`).
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token> {
        tracing::debug!("refreshing access token");
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.request_token(&params).await
    }

    /// POSTs a grant request and decodes the response.
    async fn request_token(&self, params: &[(&str, &str)]) -> Result<Token> {
        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(params)
            .send()
            .await
            .map_err(BbxError::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(BbxError::Transport)?;

        if !status.is_success() {
            // Non-2xx bodies are the structured {error, error_description}
            // shape when the server produced them; anything else decodes to
            // empty fields via the serde defaults.
            let err: TokenErrorResponse = serde_json::from_str(&body).unwrap_or_default();
            return Err(BbxError::TokenExchange {
                status: status.as_u16(),
                error: err.error,
                description: err.error_description,
            }
            .into());
        }

        let raw: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| BbxError::ResponseDecode(e.to_string()))?;
        raw.into_token()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
