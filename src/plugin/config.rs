//! Plugin system configuration document (`plugins.json`).
//!
//! Shape: `{plugins: name -> {enabled, settings, layout}, plugin_settings}`.
//! A missing file yields the built-in defaults.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::PluginConfig;
use crate::config::ConfigError;

/// Global plugin system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    pub auto_load: bool,
    pub update_interval: i64,
    pub plugin_directory: String,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            auto_load: false,
            update_interval: 2,
            plugin_directory: "./plugins".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSystemConfig {
    pub plugins: HashMap<String, PluginConfig>,
    pub plugin_settings: PluginSettings,
}

impl PluginSystemConfig {
    /// Whether the named plugin is present and enabled in the document.
    pub fn plugin_enabled(&self, name: &str) -> bool {
        self.plugins.get(name).is_some_and(|p| p.enabled)
    }

    /// The configured entry for `name`, if any.
    pub fn get(&self, name: &str) -> Option<PluginConfig> {
        self.plugins.get(name).cloned()
    }
}

/// Loads `plugins.json`, falling back to defaults when the file is absent.
/// Zero update intervals are normalized to the defaults (2 s globally, 5 s
/// per plugin layout); the scheduler applies its own floor and cap on top.
pub fn load_plugin_config(path: &Path) -> Result<PluginSystemConfig, ConfigError> {
    if !path.exists() {
        return Ok(PluginSystemConfig::default());
    }

    let data = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    let mut config: PluginSystemConfig = serde_json::from_str(&data)
        .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;

    if config.plugin_settings.update_interval <= 0 {
        config.plugin_settings.update_interval = PluginSettings::default().update_interval;
    }
    if config.plugin_settings.plugin_directory.is_empty() {
        config.plugin_settings.plugin_directory = PluginSettings::default().plugin_directory;
    }
    for plugin in config.plugins.values_mut() {
        if plugin.layout.update_interval <= 0 {
            plugin.layout.update_interval = 5;
        }
    }

    Ok(config)
}
