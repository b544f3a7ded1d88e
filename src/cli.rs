//! Command-line interface definition for bbx
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the authentication commands: login, logout, and status.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bbx - Bitbucket branch helper CLI
///
/// Authenticates against Bitbucket with OAuth 2.0 Authorization Code +
/// PKCE and keeps the resulting token fresh for API calls.
#[derive(Parser, Debug, Clone)]
#[command(name = "bbx")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults to .bbx.yaml in the current
    /// or home directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for bbx
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Authenticate with Bitbucket via OAuth 2.0
    ///
    /// Opens your browser to authorize bbx with your Bitbucket account.
    Login,

    /// Remove the stored token
    Logout,

    /// Show whether a token is stored and when it expires
    Status,
}

impl Cli {
    /// Parses command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
