//! Startup validation of the layout and export configuration.
//!
//! Runs before the scheduler starts; any violation aborts startup rather
//! than letting the dashboard operate on an inconsistent grid.

use super::{ConfigError, ExportConfig, Theme};

/// Longest allowed update period, in seconds.
const MAX_CADENCE_SECS: i64 = 1800;

/// Checks one widget slot against the grid. Shared between the theme
/// validation below and plugin layout checks in the registry.
pub fn check_slot(
    name: &str,
    row: u16,
    col: u16,
    row_span: u16,
    col_span: u16,
    min_width: u16,
    cadence: i64,
    grid_rows: u16,
    grid_cols: u16,
) -> Result<(), String> {
    if row_span < 1 {
        return Err(format!("{} widget row span must be greater than 0", name));
    }
    if col_span < 1 {
        return Err(format!("{} widget column span must be greater than 0", name));
    }
    if row + row_span > grid_rows {
        return Err(format!("{} widget exceeds layout row bounds", name));
    }
    if col + col_span > grid_cols {
        return Err(format!("{} widget exceeds layout column bounds", name));
    }
    if min_width < 1 {
        return Err(format!("{} widget minimum width must be greater than 0", name));
    }
    if cadence < 1 {
        return Err(format!("{} widget update interval must be at least 1 second", name));
    }
    if cadence > MAX_CADENCE_SECS {
        return Err(format!(
            "{} widget update interval cannot exceed {} seconds",
            name, MAX_CADENCE_SECS
        ));
    }
    Ok(())
}

/// Validates the whole theme document. Disabled widgets are skipped:
/// their geometry is irrelevant until they are turned on.
pub fn validate(theme: &Theme) -> Result<(), ConfigError> {
    let layout = &theme.layout;
    if layout.rows < 1 {
        return Err(ConfigError::Validation("layout rows must be greater than 0".into()));
    }
    if layout.columns < 1 {
        return Err(ConfigError::Validation(
            "layout columns must be greater than 0".into(),
        ));
    }

    for (id, _, entry) in layout.entries() {
        if !entry.enabled {
            continue;
        }
        check_slot(
            id,
            entry.row,
            entry.column,
            entry.row_span,
            entry.col_span,
            entry.min_width,
            entry.update_interval,
            layout.rows,
            layout.columns,
        )
        .map_err(ConfigError::Validation)?;
    }

    validate_export(&theme.export)
}

fn validate_export(export: &ExportConfig) -> Result<(), ConfigError> {
    if !export.enabled {
        return Ok(());
    }
    if export.formats.is_empty() {
        return Err(ConfigError::Validation(
            "at least one export format must be specified".into(),
        ));
    }
    for format in &export.formats {
        if format != "csv" && format != "json" {
            return Err(ConfigError::Validation(format!(
                "unsupported export format: {} (must be 'csv' or 'json')",
                format
            )));
        }
    }
    if export.directory.is_empty() {
        return Err(ConfigError::Validation("export directory must be specified".into()));
    }
    Ok(())
}
