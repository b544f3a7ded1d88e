//! Configuration management for bbx
//!
//! This module handles loading, parsing, and validating the `.bbx.yaml`
//! configuration file.  The file is looked up in the current directory
//! first and the user's home directory second; a missing file yields an
//! empty default so environment variables alone can configure the tool.
//!
//! Credential fields support `${VAR}` interpolation and fall back to the
//! `BITBUCKET_OAUTH_CLIENT_ID` / `BITBUCKET_OAUTH_CLIENT_SECRET`
//! environment variables when left empty, so secrets can stay out of the
//! YAML file entirely.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BbxError, Result};

/// Configuration file name, searched in the current and home directories.
pub const CONFIG_FILE_NAME: &str = ".bbx.yaml";

/// Environment fallback for the OAuth consumer key.
const ENV_CLIENT_ID: &str = "BITBUCKET_OAUTH_CLIENT_ID";

/// Environment fallback for the OAuth consumer secret.
const ENV_CLIENT_SECRET: &str = "BITBUCKET_OAUTH_CLIENT_SECRET";

// ---------------------------------------------------------------------------
// Config structures
// ---------------------------------------------------------------------------

/// Main configuration structure for bbx.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// OAuth consumer credentials
    #[serde(default)]
    pub oauth: OAuthConfig,
}

/// OAuth consumer credentials registered with Bitbucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// The OAuth consumer key.  Supports `${VAR}` interpolation.
    #[serde(default)]
    pub client_id: String,

    /// The OAuth consumer secret.  Supports `${VAR}` interpolation.
    #[serde(default)]
    pub client_secret: String,
}

impl Config {
    /// Loads the configuration.
    ///
    /// When `path` is given, that file must exist and parse.  Otherwise the
    /// standard locations are searched and a missing file produces the
    /// default (empty) configuration.
    ///
    /// After parsing, `${VAR}` references in the credential fields are
    /// expanded and empty fields fall back to the environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`BbxError::Config`] when an explicit path does not exist
    /// and [`BbxError::Yaml`] when the file cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(BbxError::Config(format!(
                        "config file not found: {}",
                        explicit.display()
                    ))
                    .into());
                }
                Some(explicit.to_path_buf())
            }
            None => Self::find_config_file(),
        };

        let mut config = match file {
            Some(file) => {
                tracing::debug!("loading config from {}", file.display());
                let content = std::fs::read_to_string(&file).map_err(BbxError::Io)?;
                serde_yaml::from_str(&content).map_err(BbxError::Yaml)?
            }
            None => Config::default(),
        };

        config.oauth.client_id = resolve_credential(&config.oauth.client_id, ENV_CLIENT_ID);
        config.oauth.client_secret =
            resolve_credential(&config.oauth.client_secret, ENV_CLIENT_SECRET);
        Ok(config)
    }

    /// Verifies that both OAuth credentials are present.
    ///
    /// Called before any flow starts so a misconfiguration fails fast with
    /// remediation text instead of surfacing mid-flow.
    ///
    /// # Errors
    ///
    /// Returns [`BbxError::MissingCredentials`] when either field is empty.
    pub fn validate_oauth(&self) -> Result<()> {
        if self.oauth.client_id.is_empty() || self.oauth.client_secret.is_empty() {
            return Err(BbxError::MissingCredentials.into());
        }
        Ok(())
    }

    /// Searches the current directory and then the home directory for the
    /// configuration file.
    fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        let dirs = directories::UserDirs::new()?;
        let home = dirs.home_dir().join(CONFIG_FILE_NAME);
        home.exists().then_some(home)
    }
}

// ---------------------------------------------------------------------------
// Credential resolution
// ---------------------------------------------------------------------------

/// Expands `${VAR}` references in a credential value, falling back to the
/// named environment variable when the configured value is empty.
fn resolve_credential(value: &str, env_fallback: &str) -> String {
    let expanded = expand_env_vars(value);
    if expanded.is_empty() {
        std::env::var(env_fallback).unwrap_or_default()
    } else {
        expanded
    }
}

/// Replaces `${VAR}` patterns with environment variable values.
///
/// Unset variables expand to the empty string.
fn expand_env_vars(value: &str) -> String {
    // The pattern is a fixed literal, so compilation cannot fail.
    let pattern = regex::Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern");
    pattern
        .replace_all(value, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
