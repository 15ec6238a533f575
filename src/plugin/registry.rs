//! Plugin lifecycle registry.
//!
//! One `RwLock` guards the registry maps. Calls that invoke plugin code
//! with unbounded latency (widget creation, updates, teardown) clone the
//! `Arc<dyn Plugin>` out under the lock and release it before the call, so
//! concurrent enable/disable/info never block on a slow plugin.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::warn;

use super::{DataMap, Plugin, PluginConfig, PluginError, PluginIdentity, PluginLayout, WidgetHandle};
use crate::config::check_slot;

/// Registry operation errors.
#[derive(Debug)]
pub enum RegistryError {
    /// A plugin with this name is already registered.
    NameCollision(String),
    /// No plugin registered under this name.
    NotFound(String),
    /// The plugin's own setup failed; it was not registered.
    Init { name: String, source: PluginError },
    /// The operation requires an enabled plugin.
    Disabled(String),
    /// The operation requires a created widget.
    NoWidget(String),
    /// Teardown failed; the registry entry is retained.
    Teardown { name: String, source: PluginError },
    /// The plugin's layout violates the grid bounds.
    InvalidLayout { name: String, reason: String },
    /// A forced update failed.
    Update { name: String, source: PluginError },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::NameCollision(name) => write!(f, "plugin {} already loaded", name),
            RegistryError::NotFound(name) => write!(f, "plugin {} not found", name),
            RegistryError::Init { name, source } => {
                write!(f, "failed to initialize plugin {}: {}", name, source)
            }
            RegistryError::Disabled(name) => write!(f, "plugin {} is disabled", name),
            RegistryError::NoWidget(name) => write!(f, "plugin {} has no widget", name),
            RegistryError::Teardown { name, source } => {
                write!(f, "failed to tear down plugin {}: {}", name, source)
            }
            RegistryError::InvalidLayout { name, reason } => {
                write!(f, "plugin {} layout invalid: {}", name, reason)
            }
            RegistryError::Update { name, source } => {
                write!(f, "failed to update plugin {}: {}", name, source)
            }
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::Init { source, .. }
            | RegistryError::Teardown { source, .. }
            | RegistryError::Update { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Lifecycle state, derived from the enabled flag and widget presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Loaded but the widget has not been created yet.
    Initialized,
    /// Enabled with a live widget; scheduled and focusable.
    Active,
    /// Kept in the registry but skipped by scheduler and focus order.
    Disabled,
}

/// Read-only listing entry for the management view and export.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub identity: PluginIdentity,
    pub config: PluginConfig,
    pub state: PluginState,
    pub has_widget: bool,
    pub last_update: Option<DateTime<Utc>>,
}

struct Entry {
    plugin: Arc<dyn Plugin>,
    identity: PluginIdentity,
    config: PluginConfig,
    widget: Option<WidgetHandle>,
    last_update: Option<DateTime<Utc>>,
}

impl Entry {
    fn state(&self) -> PluginState {
        if !self.config.enabled {
            PluginState::Disabled
        } else if self.widget.is_some() {
            PluginState::Active
        } else {
            PluginState::Initialized
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    /// Registration order, for deterministic listings and focus tie-breaks.
    order: Vec<String>,
}

pub struct PluginRegistry {
    inner: RwLock<Inner>,
    /// Bumped on every membership, enablement, or layout change; the render
    /// loop rebuilds the focus order when it observes a new value.
    generation: AtomicU64,
    grid_rows: u16,
    grid_cols: u16,
}

impl PluginRegistry {
    pub fn new(grid_rows: u16, grid_cols: u16) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            generation: AtomicU64::new(0),
            grid_rows,
            grid_cols,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    fn check_layout(&self, name: &str, layout: &PluginLayout) -> Result<(), RegistryError> {
        check_slot(
            name,
            layout.row,
            layout.column,
            layout.row_span,
            layout.col_span,
            layout.min_width,
            layout.update_interval.max(1),
            self.grid_rows,
            self.grid_cols,
        )
        .map_err(|reason| RegistryError::InvalidLayout {
            name: name.to_string(),
            reason,
        })
    }

    /// Registers a plugin under its identity name. Without a config the
    /// defaults apply (enabled, row 0 / col 0 / 1x1 / min width 20).
    pub fn load(
        &self,
        plugin: Arc<dyn Plugin>,
        config: Option<PluginConfig>,
    ) -> Result<(), RegistryError> {
        let identity = plugin.identity();
        let name = identity.name.clone();

        if self.read().entries.contains_key(&name) {
            return Err(RegistryError::NameCollision(name));
        }

        let mut config = config.unwrap_or_default();
        if config.layout.title.is_empty() {
            config.layout.title = name.clone();
        }
        self.check_layout(&name, &config.layout)?;

        // plugin setup runs without the lock held
        plugin
            .initialize(&config)
            .map_err(|source| RegistryError::Init {
                name: name.clone(),
                source,
            })?;

        let mut inner = self.write();
        if inner.entries.contains_key(&name) {
            return Err(RegistryError::NameCollision(name));
        }
        inner.entries.insert(
            name.clone(),
            Entry {
                plugin,
                identity,
                config,
                widget: None,
                last_update: None,
            },
        );
        inner.order.push(name);
        drop(inner);
        self.bump();
        Ok(())
    }

    /// Tears the plugin down and removes it. If teardown fails the entry is
    /// retained (still visible in `info()`) and the error propagated.
    pub fn unload(&self, name: &str) -> Result<(), RegistryError> {
        let plugin = {
            let inner = self.read();
            let entry = inner
                .entries
                .get(name)
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
            entry.plugin.clone()
        };

        plugin.teardown().map_err(|source| RegistryError::Teardown {
            name: name.to_string(),
            source,
        })?;

        let mut inner = self.write();
        inner.entries.remove(name);
        inner.order.retain(|n| n != name);
        drop(inner);
        self.bump();
        Ok(())
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), RegistryError> {
        let mut inner = self.write();
        let entry = inner
            .entries
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let changed = entry.config.enabled != enabled;
        entry.config.enabled = enabled;
        drop(inner);
        if changed {
            self.bump();
        }
        Ok(())
    }

    /// Pure state flip; no side effect on the widget handle.
    pub fn enable(&self, name: &str) -> Result<(), RegistryError> {
        self.set_enabled(name, true)
    }

    /// Pure state flip; the widget handle is kept for re-enabling.
    pub fn disable(&self, name: &str) -> Result<(), RegistryError> {
        self.set_enabled(name, false)
    }

    /// Creates widgets for enabled plugins that have none yet. A failing
    /// constructor is logged and that plugin alone is skipped.
    pub fn create_widgets(&self) -> HashMap<String, WidgetHandle> {
        let pending: Vec<(String, Arc<dyn Plugin>)> = {
            let inner = self.read();
            inner
                .order
                .iter()
                .filter_map(|name| {
                    let entry = inner.entries.get(name)?;
                    (entry.config.enabled && entry.widget.is_none())
                        .then(|| (name.clone(), entry.plugin.clone()))
                })
                .collect()
        };

        let mut created = HashMap::new();
        for (name, plugin) in pending {
            match plugin.create_widget() {
                Ok(handle) => {
                    created.insert(name, handle);
                }
                Err(e) => warn!(plugin = %name, error = %e, "widget constructor failed"),
            }
        }

        if !created.is_empty() {
            let mut inner = self.write();
            for (name, handle) in &created {
                if let Some(entry) = inner.entries.get_mut(name) {
                    entry.widget = Some(handle.clone());
                }
            }
            drop(inner);
            self.bump();
        }
        created
    }

    /// Clones out what a sampling task needs for one update, without holding
    /// the lock across the plugin call.
    pub fn update_target(
        &self,
        name: &str,
    ) -> Result<(Arc<dyn Plugin>, WidgetHandle), RegistryError> {
        let inner = self.read();
        let entry = inner
            .entries
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        if !entry.config.enabled {
            return Err(RegistryError::Disabled(name.to_string()));
        }
        let widget = entry
            .widget
            .clone()
            .ok_or_else(|| RegistryError::NoWidget(name.to_string()))?;
        Ok((entry.plugin.clone(), widget))
    }

    /// Records a successful update.
    pub fn touch(&self, name: &str) {
        let mut inner = self.write();
        if let Some(entry) = inner.entries.get_mut(name) {
            entry.last_update = Some(Utc::now());
        }
    }

    /// Forces one synchronous update outside the normal cadence.
    pub fn refresh(&self, name: &str) -> Result<(), RegistryError> {
        let (plugin, widget) = self.update_target(name)?;
        plugin
            .update_widget(&widget)
            .map_err(|source| RegistryError::Update {
                name: name.to_string(),
                source,
            })?;
        self.touch(name);
        Ok(())
    }

    /// Re-initializes the plugin with a new config and stores it.
    pub fn update_config(&self, name: &str, config: PluginConfig) -> Result<(), RegistryError> {
        self.check_layout(name, &config.layout)?;
        let plugin = {
            let inner = self.read();
            let entry = inner
                .entries
                .get(name)
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
            entry.plugin.clone()
        };
        plugin
            .initialize(&config)
            .map_err(|source| RegistryError::Init {
                name: name.to_string(),
                source,
            })?;
        let mut inner = self.write();
        if let Some(entry) = inner.entries.get_mut(name) {
            entry.config = config;
        }
        drop(inner);
        self.bump();
        Ok(())
    }

    /// Read-only listing in registration order.
    pub fn info(&self) -> Vec<PluginInfo> {
        let inner = self.read();
        inner
            .order
            .iter()
            .filter_map(|name| {
                let entry = inner.entries.get(name)?;
                Some(PluginInfo {
                    identity: entry.identity.clone(),
                    config: entry.config.clone(),
                    state: entry.state(),
                    has_widget: entry.widget.is_some(),
                    last_update: entry.last_update,
                })
            })
            .collect()
    }

    /// Panels the render pass draws: enabled plugins with a widget.
    pub fn widget_panels(&self) -> Vec<(String, PluginLayout, WidgetHandle)> {
        let inner = self.read();
        inner
            .order
            .iter()
            .filter_map(|name| {
                let entry = inner.entries.get(name)?;
                if !entry.config.enabled {
                    return None;
                }
                let widget = entry.widget.clone()?;
                Some((name.clone(), entry.config.layout.clone(), widget))
            })
            .collect()
    }

    /// Every enabled plugin's export data, keyed by name. Plugin calls run
    /// without the lock held.
    pub fn export_all(&self) -> DataMap {
        let targets: Vec<(String, Arc<dyn Plugin>)> = {
            let inner = self.read();
            inner
                .order
                .iter()
                .filter_map(|name| {
                    let entry = inner.entries.get(name)?;
                    entry.config.enabled.then(|| (name.clone(), entry.plugin.clone()))
                })
                .collect()
        };

        let mut out = DataMap::new();
        for (name, plugin) in targets {
            out.insert(name, serde_json::Value::Object(plugin.export_data()));
        }
        out
    }

    /// Unloads every plugin at shutdown. Teardown failures are logged; the
    /// retain-on-failure rule keeps those entries, which is harmless here.
    pub fn unload_all(&self) {
        let names: Vec<String> = self.read().order.clone();
        for name in names {
            if let Err(e) = self.unload(&name) {
                warn!(plugin = %name, error = %e, "plugin teardown failed during shutdown");
            }
        }
    }
}
