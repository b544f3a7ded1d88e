//! bbx - Bitbucket branch helper CLI library
//!
//! This library provides the OAuth 2.0 Authorization Code + PKCE
//! authentication core that supplies the CLI with valid bearer tokens for
//! the Bitbucket REST API.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: PKCE generation, callback listener, token exchange, token
//!   persistence, and the cache/refresh coordinator
//! - `commands`: Command handlers invoked by the CLI entrypoint
//! - `config`: Configuration loading and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use bbx::auth::exchange::TokenExchanger;
//! use bbx::auth::manager::TokenManager;
//! use bbx::auth::token_store::TokenStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let exchanger = TokenExchanger::new(
//!         reqwest::Client::new(),
//!         "client-id".to_string(),
//!         "client-secret".to_string(),
//!     );
//!     let manager = TokenManager::new(exchanger, TokenStore::default_location()?);
//!     let access_token = manager.get_token().await?;
//!     println!("Authorization: Bearer {access_token}");
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use auth::manager::TokenManager;
pub use auth::token_store::{Token, TokenStore};
pub use config::Config;
pub use error::{BbxError, Result};
