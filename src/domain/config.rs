//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file
//! (`config.yaml`). Defines the structs for gateway credentials, prefix
//! settings, and system options.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub services: ServicesConfig,
    #[serde(default)]
    pub prefix: PrefixConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }
}

/// Configuration for connected services.
#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    pub gateway: GatewayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Authentication credential for the gateway. An empty token is the one
    /// fatal startup condition.
    #[serde(default)]
    pub token: String,
    /// Synthetic origin used by the console transport.
    #[serde(default = "default_console_guild")]
    pub guild: String,
    #[serde(default = "default_console_channel")]
    pub channel: String,
    #[serde(default = "default_console_operator")]
    pub operator: String,
}

fn default_console_guild() -> String {
    "console".to_string()
}

fn default_console_channel() -> String {
    "console".to_string()
}

fn default_console_operator() -> String {
    "operator".to_string()
}

/// Command prefix settings, per origin with a global default.
#[derive(Debug, Deserialize, Clone)]
pub struct PrefixConfig {
    #[serde(default = "default_prefix")]
    pub default: String,
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self {
            default: default_prefix(),
            overrides: HashMap::new(),
        }
    }
}

fn default_prefix() -> String {
    "!".to_string()
}

/// System-level settings for the bot.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct SystemConfig {
    /// Seconds a paged display stays alive before it self-destructs.
    #[serde(default)]
    pub paged_expiry_secs: Option<u64>,
}
