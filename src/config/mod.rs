//! Dashboard configuration: theme, grid layout, widget slots.
//!
//! Configuration is a JSON document (`config.json`). A missing file yields
//! the built-in defaults; a present but invalid file aborts startup before
//! the scheduler runs.

mod validate;

pub use validate::{check_slot, validate};

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration errors. Validation failures are fatal at startup.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error while reading the config file.
    Io(String),
    /// JSON syntax or shape error.
    Parse(String),
    /// Layout or bounds violation.
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where a widget's update function comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetSource {
    Builtin,
    Plugin,
}

/// Pure data describing one widget's place in the grid and its cadence.
///
/// Invariant for enabled slots: `row + row_span <= grid rows` and
/// `col + col_span <= grid cols` (enforced by [`validate`]).
#[derive(Debug, Clone)]
pub struct WidgetSlot {
    pub id: String,
    pub title: String,
    pub row: u16,
    pub col: u16,
    pub row_span: u16,
    pub col_span: u16,
    pub min_width: u16,
    pub enabled: bool,
    pub border_color: String,
    pub fg_color: String,
    /// Update period in seconds. Values <= 0 are coerced to the 1 s floor
    /// by the scheduler.
    pub cadence: i64,
    pub source: WidgetSource,
}

/// Per-widget entry in the config document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetEntry {
    pub enabled: bool,
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

impl Default for WidgetEntry {
    fn default() -> Self {
        Self {
            enabled: true,
            row: 0,
            column: 0,
            row_span: 1,
            col_span: 1,
            min_width: 20,
            border_color: String::new(),
            foreground_color: String::new(),
            update_interval: 2,
        }
    }
}

impl WidgetEntry {
    fn at(row: u16, column: u16, update_interval: i64) -> Self {
        Self {
            row,
            column,
            update_interval,
            ..Self::default()
        }
    }
}

/// Grid geometry plus one entry per built-in widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub rows: u16,
    pub columns: u16,
    pub spacing: u16,
    pub cpu: WidgetEntry,
    pub memory: WidgetEntry,
    pub disk: WidgetEntry,
    pub network: WidgetEntry,
    pub process: WidgetEntry,
    pub gpu: WidgetEntry,
    pub load: WidgetEntry,
    pub temperature: WidgetEntry,
    #[serde(rename = "network_connections")]
    pub connections: WidgetEntry,
    pub disk_io: WidgetEntry,
    pub process_tree: WidgetEntry,
    pub battery: WidgetEntry,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rows: 6,
            columns: 2,
            spacing: 0,
            cpu: WidgetEntry::at(0, 0, 2),
            memory: WidgetEntry::at(0, 1, 2),
            disk: WidgetEntry::at(1, 0, 10),
            network: WidgetEntry::at(1, 1, 2),
            process: WidgetEntry::at(2, 0, 3),
            gpu: WidgetEntry::at(2, 1, 5),
            load: WidgetEntry::at(3, 0, 5),
            temperature: WidgetEntry::at(3, 1, 5),
            connections: WidgetEntry::at(4, 0, 5),
            disk_io: WidgetEntry::at(4, 1, 2),
            process_tree: WidgetEntry::at(5, 0, 5),
            battery: WidgetEntry::at(5, 1, 30),
        }
    }
}

impl LayoutConfig {
    /// Ordered (id, title, entry) view over the built-in widgets.
    /// Order here fixes the registration order used for focus tie-breaks.
    pub fn entries(&self) -> Vec<(&'static str, &'static str, &WidgetEntry)> {
        vec![
            ("cpu", "CPU", &self.cpu),
            ("memory", "Memory", &self.memory),
            ("disk", "Disk", &self.disk),
            ("network", "Network", &self.network),
            ("process", "Processes", &self.process),
            ("gpu", "GPU", &self.gpu),
            ("load", "Load", &self.load),
            ("temperature", "Temperature", &self.temperature),
            ("connections", "Connections", &self.connections),
            ("disk_io", "Disk I/O", &self.disk_io),
            ("process_tree", "Process Tree", &self.process_tree),
            ("battery", "Battery", &self.battery),
        ]
    }

    /// Materialize the built-in widget slots.
    pub fn slots(&self) -> Vec<WidgetSlot> {
        self.entries()
            .into_iter()
            .map(|(id, title, e)| WidgetSlot {
                id: id.to_string(),
                title: title.to_string(),
                row: e.row,
                col: e.column,
                row_span: e.row_span,
                col_span: e.col_span,
                min_width: e.min_width,
                enabled: e.enabled,
                border_color: e.border_color.clone(),
                fg_color: e.foreground_color.clone(),
                cadence: e.update_interval,
                source: WidgetSource::Builtin,
            })
            .collect()
    }
}

/// On-demand / shutdown export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub enabled: bool,
    pub formats: Vec<String>,
    pub directory: String,
    pub filename_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            formats: vec!["json".to_string(), "csv".to_string()],
            directory: "./export".to_string(),
            filename_prefix: "hostpulse".to_string(),
        }
    }
}

/// Top-level config document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background: String,
    pub foreground: String,
    pub altforeground: String,
    pub layout: LayoutConfig,
    pub export: ExportConfig,
}

/// Loads the theme from `path`, falling back to defaults when the file does
/// not exist. The result is validated; a validation failure aborts startup.
pub fn load_theme(path: &Path) -> Result<Theme, ConfigError> {
    let theme = if path.exists() {
        let data =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&data).map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?
    } else {
        Theme::default()
    };
    validate(&theme)?;
    Ok(theme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_theme_is_valid() {
        let theme = Theme::default();
        assert!(validate(&theme).is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let theme = load_theme(Path::new("/nonexistent/hostpulse/config.json")).unwrap();
        assert_eq!(theme.layout.rows, 6);
        assert_eq!(theme.layout.columns, 2);
        assert!(theme.layout.cpu.enabled);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"layout": {{"rows": 8, "cpu": {{"row": 7}}}}}}"#).unwrap();
        let theme = load_theme(file.path()).unwrap();
        assert_eq!(theme.layout.rows, 8);
        assert_eq!(theme.layout.cpu.row, 7);
        assert_eq!(theme.layout.columns, 2);
        assert_eq!(theme.layout.memory.update_interval, 2);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        match load_theme(file.path()) {
            Err(ConfigError::Parse(_)) => {}
            other => panic!("expected parse error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_slots_preserve_registration_order() {
        let ids: Vec<String> = LayoutConfig::default()
            .slots()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids[0], "cpu");
        assert_eq!(ids[1], "memory");
        assert_eq!(ids[11], "battery");
    }
}
