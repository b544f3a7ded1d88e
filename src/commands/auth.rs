//! Authentication command handlers
//!
//! Thin wrappers that wire configuration into the auth subsystem and print
//! user-facing results. All protocol logic lives in `crate::auth`.

use colored::Colorize;

use crate::auth::exchange::TokenExchanger;
use crate::auth::manager::TokenManager;
use crate::auth::token_store::TokenStore;
use crate::config::Config;
use crate::error::Result;

/// Builds the token manager from validated configuration.
fn build_manager(config: &Config) -> Result<TokenManager> {
    config.validate_oauth()?;
    let exchanger = TokenExchanger::new(
        reqwest::Client::new(),
        config.oauth.client_id.clone(),
        config.oauth.client_secret.clone(),
    );
    Ok(TokenManager::new(exchanger, TokenStore::default_location()?))
}

/// Runs the browser login flow and persists the token.
pub async fn run_login(config: &Config) -> Result<()> {
    let manager = build_manager(config)?;
    manager.login().await?;
    println!("{} Token saved.", "Login successful!".green().bold());
    Ok(())
}

/// Removes the stored token.
pub fn run_logout() -> Result<()> {
    let store = TokenStore::default_location()?;
    if store.delete()? {
        println!("{}", "Logged out.".green());
    } else {
        println!("No stored token; nothing to do.");
    }
    Ok(())
}

/// Reports whether a token is stored and when it expires.
///
/// Never contacts the provider; an expired token is reported as such with
/// the remediation hint.
pub fn run_status() -> Result<()> {
    let store = TokenStore::default_location()?;
    let token = store.load()?;

    if token.is_expired() {
        println!(
            "{} (expired at {}; it will be refreshed on next use or run 'bbx login')",
            "Logged in".yellow(),
            token.expires_at
        );
    } else {
        println!(
            "{} (access token valid until {})",
            "Logged in".green(),
            token.expires_at
        );
    }
    Ok(())
}
