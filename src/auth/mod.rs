//! OAuth 2.0 Authorization Code + PKCE authentication for Bitbucket
//!
//! This module supplies the rest of the tool with valid bearer tokens for
//! the Bitbucket REST API. The browser-based login flow obtains the initial
//! token pair; afterwards [`manager::TokenManager::get_token`] is the single
//! entry point callers use before every authenticated request, hiding token
//! refresh and concurrency behind one call.
//!
//! # Module Layout
//!
//! - [`pkce`]        -- PKCE `S256` verifier/challenge generation (RFC 7636)
//! - [`callback`]    -- Ephemeral loopback listener for the provider redirect
//! - [`exchange`]    -- Authorization-code and refresh grants at the token
//!   endpoint
//! - [`token_store`] -- Permission-restricted JSON token file
//! - [`flow`]        -- Browser-based login flow composing the above
//! - [`manager`]     -- `TokenManager`: cached access with single-flight
//!   refresh

pub mod callback;
pub mod exchange;
pub mod flow;
pub mod manager;
pub mod pkce;
pub mod token_store;

/// Bitbucket OAuth 2.0 authorization endpoint.
pub const AUTHORIZE_URL: &str = "https://bitbucket.org/site/oauth2/authorize";

/// Bitbucket OAuth 2.0 token endpoint.
pub const TOKEN_URL: &str = "https://bitbucket.org/site/oauth2/access_token";

/// Fixed loopback port for the authorization redirect.
///
/// This port is part of the redirect URI registered with the OAuth consumer,
/// so it cannot be chosen dynamically.
pub const CALLBACK_PORT: u16 = 9876;

/// Path component of the redirect URI.
pub const CALLBACK_PATH: &str = "/callback";

/// The full redirect URI sent in both the authorize request and the code
/// exchange. Must stay consistent with [`CALLBACK_PORT`] and
/// [`CALLBACK_PATH`].
pub const REDIRECT_URI: &str = "http://localhost:9876/callback";
