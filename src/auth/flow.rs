//! Browser-based OAuth 2.0 Authorization Code + PKCE login flow
//!
//! One call to [`authorize`] drives the whole session:
//!
//! 1. Generate a PKCE verifier/challenge pair.
//! 2. Bind the loopback callback listener on the fixed port.  This happens
//!    *before* the browser launches so the redirect can never race against
//!    a closed port.
//! 3. Build the authorize URL and open it in the user's browser; if the
//!    browser cannot be launched the URL is printed for manual opening.
//! 4. Wait for the redirect, bounded by a five-minute window.
//! 5. Exchange the authorization code for a token pair.
//!
//! The session is one-shot and terminal: on bind failure, denial, timeout,
//! or exchange failure it ends with an error and no retry loop.  The PKCE
//! pair exists only on this call's stack and is dropped when it returns.
//!
//! The authorize request intentionally carries no `state` parameter; see
//! DESIGN.md.

use std::time::Duration;

use crate::auth::callback::CallbackListener;
use crate::auth::exchange::TokenExchanger;
use crate::auth::pkce;
use crate::auth::token_store::Token;
use crate::auth::{AUTHORIZE_URL, CALLBACK_PORT, REDIRECT_URI};
use crate::error::Result;

/// How long the flow waits for the browser redirect before giving up.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Authorize URL
// ---------------------------------------------------------------------------

/// Builds the provider authorize URL for the given client and challenge.
///
/// Pure function: no side effects, no network access.  The redirect URI,
/// response type, and challenge method are fixed by the flow.
///
/// # Examples
///
/// ```
/// use bbx::auth::flow::build_authorize_url;
///
/// let url = build_authorize_url("my-client", "my-challenge");
/// assert!(url.starts_with("https://bitbucket.org/site/oauth2/authorize?"));
/// assert!(url.contains("response_type=code"));
/// assert!(url.contains("client_id=my-client"));
/// assert!(url.contains("code_challenge=my-challenge"));
/// assert!(url.contains("code_challenge_method=S256"));
/// ```
pub fn build_authorize_url(client_id: &str, code_challenge: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", REDIRECT_URI)
        .append_pair("code_challenge", code_challenge)
        .append_pair("code_challenge_method", "S256")
        .finish();
    format!("{AUTHORIZE_URL}?{query}")
}

// ---------------------------------------------------------------------------
// Login flow
// ---------------------------------------------------------------------------

/// Runs the full authorization code + PKCE session and returns the token.
///
/// Persisting the token is the caller's job; see
/// [`TokenManager::login`](super::manager::TokenManager::login).
///
/// # Errors
///
/// - [`BbxError::Bind`](crate::error::BbxError::Bind) when the fixed
///   callback port is occupied.
/// - [`BbxError::AuthorizationDenied`](crate::error::BbxError::AuthorizationDenied)
///   when the user refuses the grant.
/// - [`BbxError::AuthorizationTimeout`](crate::error::BbxError::AuthorizationTimeout)
///   when no redirect arrives within [`LOGIN_TIMEOUT`].
/// - Token endpoint failures as described on
///   [`TokenExchanger::exchange_code`].
pub async fn authorize(exchanger: &TokenExchanger) -> Result<Token> {
    let pkce = pkce::generate()?;

    // The listener must be accepting connections before the browser opens.
    let listener = CallbackListener::bind(CALLBACK_PORT).await?;
    let auth_url = build_authorize_url(exchanger.client_id(), &pkce.challenge);

    tracing::info!("awaiting browser authorization on port {}", listener.port());
    eprintln!("Opening browser for Bitbucket authorization...");
    if !try_open_browser(&auth_url) {
        eprintln!("Please open this URL manually:\n{auth_url}");
    }

    let code = listener.wait(LOGIN_TIMEOUT).await?;

    tracing::info!("authorization code received; exchanging for tokens");
    let token = exchanger.exchange_code(&code, &pkce.verifier).await?;

    tracing::info!("authenticated; access token valid until {}", token.expires_at);
    Ok(token)
}

/// Attempts to open the authorization URL in the user's default browser.
///
/// Returns `false` when launching fails or the platform is unsupported;
/// the caller then degrades to printing the URL.  Never aborts the flow.
fn try_open_browser(url: &str) -> bool {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn().is_ok()
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn().is_ok()
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("rundll32")
            .arg("url.dll,FileProtocolHandler")
            .arg(url)
            .spawn()
            .is_ok()
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        let _ = url;
        false
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
