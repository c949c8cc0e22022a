//! # Static Settings Provider
//!
//! Prefix lookup backed by the configuration file: a global default plus
//! per-origin overrides.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::config::PrefixConfig;
use crate::domain::traits::SettingsProvider;

pub struct StaticSettings {
    default: String,
    overrides: HashMap<String, String>,
}

impl StaticSettings {
    pub fn new(default: String) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn from_config(config: &PrefixConfig) -> Self {
        Self {
            default: config.default.clone(),
            overrides: config.overrides.clone(),
        }
    }
}

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn get_prefix(&self, origin_id: &str) -> String {
        self.overrides
            .get(origin_id)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_override_falls_back_to_default() {
        let mut config = PrefixConfig::default();
        config.overrides.insert("guild-1".to_string(), ".".to_string());
        let settings = StaticSettings::from_config(&config);

        assert_eq!(settings.get_prefix("guild-1").await, ".");
        assert_eq!(settings.get_prefix("guild-2").await, "!");
    }
}
