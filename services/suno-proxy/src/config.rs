//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Account credentials never live in the TOML; the config only points
//! at the JSON files holding them.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use suno_auth::{CLERK_API_URL, STUDIO_API_URL};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub relay: RelayConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
}

/// Inbound HTTP settings
#[derive(Debug, Deserialize)]
pub struct RelayConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Suno upstream settings. Overriding the URLs is mainly for tests.
#[derive(Debug, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_studio_url")]
    pub studio_url: String,
    #[serde(default = "default_clerk_url")]
    pub clerk_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Account file locations and refresh cadence
#[derive(Debug, Deserialize)]
pub struct AccountsConfig {
    #[serde(default = "default_accounts_file")]
    pub accounts_file: PathBuf,
    #[serde(default = "default_disabled_file")]
    pub disabled_file: PathBuf,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            studio_url: default_studio_url(),
            clerk_url: default_clerk_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            accounts_file: default_accounts_file(),
            disabled_file: default_disabled_file(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_studio_url() -> String {
    STUDIO_API_URL.to_string()
}

fn default_clerk_url() -> String {
    CLERK_API_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_accounts_file() -> PathBuf {
    PathBuf::from("accounts.json")
}

fn default_disabled_file() -> PathBuf {
    PathBuf::from("disabled_accounts.json")
}

fn default_refresh_interval() -> u64 {
    5
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        // Validate upstream URLs carry an http(s) scheme
        if !config.upstream.studio_url.starts_with("http://")
            && !config.upstream.studio_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "studio_url must start with http:// or https://, got: {}",
                config.upstream.studio_url
            )));
        }

        if !config.upstream.clerk_url.starts_with("http://")
            && !config.upstream.clerk_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "clerk_url must start with http:// or https://, got: {}",
                config.upstream.clerk_url
            )));
        }

        // Validate timeout_secs is non-zero
        if config.upstream.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        // Validate max_connections is non-zero
        if config.relay.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        // Validate refresh_interval_secs is non-zero
        if config.accounts.refresh_interval_secs == 0 {
            return Err(common::Error::Config(
                "refresh_interval_secs must be greater than 0".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("suno-cookie-proxy.toml")
    }
}
