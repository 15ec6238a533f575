//! Extension mechanism: the plugin capability trait and its registry.
//!
//! A plugin contributes one widget and one data collector. The registry
//! stores plugins as `Arc<dyn Plugin>` trait objects and never sees a
//! concrete type.

pub mod config;
pub mod registry;

mod clock;
mod docker;

pub use clock::ClockPlugin;
pub use config::{PluginSettings, PluginSystemConfig, load_plugin_config};
pub use docker::DockerPlugin;
pub use registry::{PluginInfo, PluginRegistry, PluginState, RegistryError};

use std::sync::{Arc, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Free-form key/value data exchanged with plugins (settings, exports).
pub type DataMap = serde_json::Map<String, serde_json::Value>;

/// Error raised by plugin code itself.
#[derive(Debug)]
pub enum PluginError {
    /// A dependency of the plugin is missing (e.g. an external command).
    Unavailable(String),
    /// The operation ran and failed.
    Failed(String),
}

impl std::fmt::Display for PluginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginError::Unavailable(msg) => write!(f, "unavailable: {}", msg),
            PluginError::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for PluginError {}

/// Who a plugin is, for the management view and export.
#[derive(Debug, Clone, Serialize)]
pub struct PluginIdentity {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
}

/// Grid placement of a plugin widget; same shape as a built-in slot entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginLayout {
    pub title: String,
    pub row: u16,
    pub column: u16,
    #[serde(rename = "rowSpan")]
    pub row_span: u16,
    #[serde(rename = "colSpan")]
    pub col_span: u16,
    #[serde(rename = "minWidth")]
    pub min_width: u16,
    pub border_color: String,
    pub foreground_color: String,
    pub update_interval: i64,
}

impl Default for PluginLayout {
    fn default() -> Self {
        Self {
            title: String::new(),
            row: 0,
            column: 0,
            row_span: 1,
            col_span: 1,
            min_width: 20,
            border_color: String::new(),
            foreground_color: String::new(),
            update_interval: 5,
        }
    }
}

/// Per-plugin configuration, from `plugins.json` or defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub enabled: bool,
    pub settings: DataMap,
    pub layout: PluginLayout,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settings: DataMap::new(),
            layout: PluginLayout::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WidgetBody {
    pub title: String,
    pub lines: Vec<String>,
    /// Error text shown instead of the lines when the last update failed.
    pub unavailable: Option<String>,
}

/// Shared text-panel state backing one plugin widget. The plugin's update
/// function writes it; the render pass reads it.
#[derive(Clone, Default)]
pub struct WidgetHandle {
    body: Arc<RwLock<WidgetBody>>,
    errors: Arc<AtomicU64>,
}

impl WidgetHandle {
    pub fn new(title: impl Into<String>) -> Self {
        let handle = Self::default();
        handle.body.write().unwrap_or_else(|p| p.into_inner()).title = title.into();
        handle
    }

    /// Replaces the panel content and clears any error state.
    pub fn set_lines(&self, lines: Vec<String>) {
        let mut body = self.body.write().unwrap_or_else(|p| p.into_inner());
        body.lines = lines;
        body.unavailable = None;
    }

    /// Marks the panel unavailable and bumps the error counter.
    pub fn mark_unavailable(&self, error: impl Into<String>) {
        let mut body = self.body.write().unwrap_or_else(|p| p.into_inner());
        body.unavailable = Some(error.into());
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn body(&self) -> WidgetBody {
        self.body.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Capability interface every extension implements.
///
/// Methods take `&self`: plugins keep their mutable state behind their own
/// locks, because updates run concurrently with registry reads.
pub trait Plugin: Send + Sync {
    fn identity(&self) -> PluginIdentity;
    fn initialize(&self, config: &PluginConfig) -> Result<(), PluginError>;
    fn teardown(&self) -> Result<(), PluginError>;
    fn create_widget(&self) -> Result<WidgetHandle, PluginError>;
    fn update_widget(&self, widget: &WidgetHandle) -> Result<(), PluginError>;
    fn collect_data(&self) -> Result<DataMap, PluginError>;
    fn export_data(&self) -> DataMap;
}

/// Loads the bundled plugins that `plugins.json` enables, then creates
/// their widgets. A failing load is logged and that plugin omitted; the
/// rest of the system stays usable.
pub fn bootstrap(registry: &PluginRegistry, config: &PluginSystemConfig) {
    let bundled: Vec<(&str, Arc<dyn Plugin>)> = vec![
        ("clock", Arc::new(ClockPlugin::new())),
        ("docker", Arc::new(DockerPlugin::new())),
    ];

    for (name, plugin) in bundled {
        if !config.plugin_enabled(name) {
            continue;
        }
        match registry.load(plugin, config.get(name)) {
            Ok(()) => info!(plugin = name, "plugin loaded"),
            Err(e) => warn!(plugin = name, error = %e, "failed to load plugin"),
        }
    }

    registry.create_widgets();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_handle_error_then_recovery() {
        let handle = WidgetHandle::new("Test");
        handle.mark_unavailable("boom");
        handle.mark_unavailable("boom");
        assert_eq!(handle.error_count(), 2);
        assert!(handle.body().unavailable.is_some());

        handle.set_lines(vec!["ok".into()]);
        let body = handle.body();
        assert!(body.unavailable.is_none());
        assert_eq!(body.lines, vec!["ok".to_string()]);
        // counter is cumulative
        assert_eq!(handle.error_count(), 2);
    }

    #[test]
    fn test_plugin_config_defaults() {
        let config = PluginConfig::default();
        assert!(config.enabled);
        assert_eq!(config.layout.row, 0);
        assert_eq!(config.layout.column, 0);
        assert_eq!(config.layout.row_span, 1);
        assert_eq!(config.layout.col_span, 1);
        assert_eq!(config.layout.min_width, 20);
        assert_eq!(config.layout.update_interval, 5);
    }
}
