//! Configuration management for dymka
//!
//! Loads the provider endpoint and named private keys from a JSON (or TOML)
//! file, with environment variable substitution.

use crate::error::{DymkaError, DymkaResult};

use ethers::signers::LocalWallet;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::Path;

/// Default receipt polling interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub accounts: BTreeMap<String, PrivateKey>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct ProviderConfig {
    pub url: String,
    #[serde(default = "default_poll_interval", skip_serializing)]
    pub poll_interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Hex encoded private key, kept out of debug output
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn expose(&self) -> &str {
        self.0.trim()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

impl Settings {
    /// Load settings from a configuration file
    pub fn load(path: &Path) -> DymkaResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DymkaError::Configuration(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        // Substitute environment variables
        let raw = substitute_env_vars(&raw);

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        let settings = if is_toml {
            Self::from_toml(&raw)?
        } else {
            Self::from_json(&raw)?
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json(raw: &str) -> DymkaResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| DymkaError::Configuration(format!("Failed to parse configuration: {}", e)))
    }

    pub fn from_toml(raw: &str) -> DymkaResult<Self> {
        toml::from_str(raw)
            .map_err(|e| DymkaError::Configuration(format!("Failed to parse configuration: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> DymkaResult<()> {
        if self.provider.url.trim().is_empty() {
            return Err(DymkaError::Configuration(
                "provider.url must not be empty".to_string(),
            ));
        }

        for (name, key) in &self.accounts {
            key.expose().parse::<LocalWallet>().map_err(|e| {
                DymkaError::Configuration(format!("Invalid private key for account {}: {}", name, e))
            })?;
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |cap: &regex::Captures| {
            env::var(&cap[1]).unwrap_or_default()
        })
        .into_owned()
}
