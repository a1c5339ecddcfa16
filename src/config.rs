//! Configuration for Telegram API credentials and the export allow-list
//!
//! Credentials come from environment variables (a `.env` file is loaded first),
//! the list of group names from `config.yml` or the built-in default.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Group names exported when no `config.yml` overrides them.
pub const DEFAULT_GROUP_NAMES: &[&str] = &["sample1", "sample2"];

/// Default config file holding the `groups:` list
pub const CONFIG_FILE: &str = "config.yml";

/// MTProto proxy parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub secret: String,
}

/// YAML config structure
#[derive(Debug, Deserialize)]
struct YamlConfig {
    groups: Option<Vec<String>>,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub phone: String,
    pub api_id: i32,
    pub api_hash: String,
    pub session_name: String,
    pub proxy: Option<ProxyConfig>,
    pub group_names: Vec<String>,
}

impl Config {
    /// Load `.env`, then read credentials from the process environment and
    /// the allow-list from `config.yml` (falling back to `DEFAULT_GROUP_NAMES`).
    pub fn load() -> Result<Self> {
        Self::load_dotenv();
        let group_names = load_group_names(CONFIG_FILE)?;
        Self::from_lookup(|key| std::env::var(key).ok(), group_names)
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F, group_names: Vec<String>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let phone = required(&lookup, "PHONE")?;
        let api_hash = required(&lookup, "API_HASH")?;
        let api_id = required(&lookup, "API_ID")?
            .parse::<i32>()
            .map_err(|e| Error::Configuration(format!("API_ID must be an integer: {}", e)))?;

        let session_name = non_empty(&lookup, "SESSION_NAME").unwrap_or_else(|| phone.clone());
        let proxy = parse_proxy(&lookup);

        Ok(Self {
            phone,
            api_id,
            api_hash,
            session_name,
            proxy,
            group_names,
        })
    }

    /// Exact, case-sensitive allow-list membership
    pub fn is_listed(&self, name: &str) -> bool {
        self.group_names.iter().any(|g| g == name)
    }

    pub fn session_file(&self) -> String {
        format!("{}.session", self.session_name)
    }

    pub fn lock_file(&self) -> String {
        format!("{}.lock", self.session_name)
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).ok_or_else(|| Error::Configuration(format!("{} is not set", key)))
}

/// The proxy is enabled only when host, port and secret are all present and
/// the port is a positive integer.
fn parse_proxy<F>(lookup: &F) -> Option<ProxyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let host = non_empty(lookup, "PROXY_HOST");
    let port = non_empty(lookup, "PROXY_PORT");
    let secret = non_empty(lookup, "PROXY_SECRET");

    match (host, port, secret) {
        (Some(host), Some(port), Some(secret)) => match port.parse::<u16>() {
            Ok(port) if port > 0 => Some(ProxyConfig { host, port, secret }),
            _ => {
                tracing::warn!("PROXY_PORT '{}' is not a valid port, connecting directly", port);
                None
            }
        },
        (None, None, None) => None,
        _ => {
            tracing::warn!(
                "PROXY_HOST, PROXY_PORT and PROXY_SECRET must all be set, connecting directly"
            );
            None
        }
    }
}

/// Read the `groups:` list from a YAML file, or the defaults if it is absent.
pub fn load_group_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(DEFAULT_GROUP_NAMES.iter().map(|s| s.to_string()).collect());
    }

    let content = fs::read_to_string(path)?;
    let yaml: YamlConfig = serde_yaml::from_str(&content).map_err(|e| {
        Error::Configuration(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    Ok(yaml
        .groups
        .unwrap_or_else(|| DEFAULT_GROUP_NAMES.iter().map(|s| s.to_string()).collect()))
}
