//! Snapshot assembly and CSV/JSON file export.
//!
//! A snapshot is a read-only copy of every metric cell plus each enabled
//! plugin's export data keyed by plugin name. Export runs on demand from
//! the TUI and once at shutdown, after the scheduler join.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, Utc};
use serde_json::json;

use crate::plugin::PluginRegistry;
use crate::config::ExportConfig;
use crate::state::SharedState;

#[derive(Debug)]
pub enum ExportError {
    Io(String),
    Serialize(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(msg) => write!(f, "I/O error: {}", msg),
            ExportError::Serialize(msg) => write!(f, "serialize error: {}", msg),
        }
    }
}

impl std::error::Error for ExportError {}

/// Builds the read-only snapshot document.
pub fn build_snapshot(state: &SharedState, registry: &PluginRegistry) -> serde_json::Value {
    json!({
        "timestamp": Utc::now().to_rfc3339(),
        "metrics": {
            "cpu": state.cpu.read(),
            "memory": state.memory.read(),
            "disk": state.disk.read(),
            "disk_io": state.disk_io.read(),
            "network": state.network.read(),
            "connections": state.connections.read(),
            "gpu": state.gpu.read(),
            "load": state.load.read(),
            "temperature": state.temperature.read(),
            "battery": state.battery.read(),
            "process": state.process.read(),
            "process_tree": state.process_tree.read(),
        },
        "plugins": serde_json::Value::Object(registry.export_all()),
    })
}

/// Writes the snapshot in every configured format. Returns the files
/// written.
pub fn write_all(
    config: &ExportConfig,
    state: &Arc<SharedState>,
    registry: &Arc<PluginRegistry>,
) -> Result<Vec<PathBuf>, ExportError> {
    let dir = Path::new(&config.directory);
    std::fs::create_dir_all(dir)
        .map_err(|e| ExportError::Io(format!("{}: {}", dir.display(), e)))?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let mut written = Vec::new();

    for format in &config.formats {
        let path = dir.join(format!("{}_{}.{}", config.filename_prefix, stamp, format));
        match format.as_str() {
            "json" => write_json(&path, &build_snapshot(state, registry))?,
            "csv" => write_csv(&path, state)?,
            other => {
                // unreachable after config validation, but never silently drop
                return Err(ExportError::Serialize(format!("unknown format: {}", other)));
            }
        }
        written.push(path);
    }
    Ok(written)
}

fn write_json(path: &Path, snapshot: &serde_json::Value) -> Result<(), ExportError> {
    let data = serde_json::to_string_pretty(snapshot)
        .map_err(|e| ExportError::Serialize(e.to_string()))?;
    std::fs::write(path, data).map_err(|e| ExportError::Io(format!("{}: {}", path.display(), e)))
}

const CSV_HEADER: &str = "timestamp,cpu_total_pct,mem_used,mem_total,swap_used,load1,load5,load15,\
net_rx_bps,net_tx_bps,disk_read_bps,disk_write_bps,processes,battery_pct";

/// One headline-metrics row per export, in a fixed column set.
fn write_csv(path: &Path, state: &SharedState) -> Result<(), ExportError> {
    let cpu = state.cpu.read().value.unwrap_or_default();
    let mem = state.memory.read().value.unwrap_or_default();
    let load = state.load.read().value.unwrap_or_default();
    let net = state.network.read().value.unwrap_or_default();
    let io = state.disk_io.read().value.unwrap_or_default();
    let procs = state.process.read().value.unwrap_or_default();
    let battery = state.battery.read().value.unwrap_or_default();

    let net_rx: u64 = net.interfaces.iter().map(|i| i.rx_bytes_per_sec).sum();
    let net_tx: u64 = net.interfaces.iter().map(|i| i.tx_bytes_per_sec).sum();
    let disk_read: u64 = io.devices.iter().map(|d| d.read_bytes_per_sec).sum();
    let disk_write: u64 = io.devices.iter().map(|d| d.write_bytes_per_sec).sum();

    let row = format!(
        "{},{:.1},{},{},{},{:.2},{:.2},{:.2},{},{},{},{},{},{:.0}",
        Utc::now().to_rfc3339(),
        cpu.total_pct,
        mem.used,
        mem.total,
        mem.swap_used,
        load.one,
        load.five,
        load.fifteen,
        net_rx,
        net_tx,
        disk_read,
        disk_write,
        procs.total,
        battery.percent,
    );

    std::fs::write(path, format!("{}\n{}\n", CSV_HEADER, row))
        .map_err(|e| ExportError::Io(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::registry::tests::StubPlugin;
    use crate::state::{CpuSample, LoadSample};

    fn fixtures() -> (Arc<SharedState>, Arc<PluginRegistry>) {
        let state = Arc::new(SharedState::new());
        state.cpu.publish(CpuSample {
            total_pct: 12.5,
            per_core_pct: vec![10.0, 15.0],
        });
        state.load.publish(LoadSample {
            one: 0.5,
            five: 0.6,
            fifteen: 0.7,
        });

        let registry = Arc::new(PluginRegistry::new(6, 2));
        registry.load(Arc::new(StubPlugin::named("stub")), None).unwrap();
        (state, registry)
    }

    #[test]
    fn test_snapshot_includes_metrics_and_plugins() {
        let (state, registry) = fixtures();
        let snapshot = build_snapshot(&state, &registry);

        assert_eq!(snapshot["metrics"]["cpu"]["value"]["total_pct"], 12.5);
        assert_eq!(snapshot["metrics"]["cpu"]["status"], "Ok");
        // domains nothing wrote yet are present but empty
        assert_eq!(snapshot["metrics"]["gpu"]["status"], "Empty");
        assert!(snapshot["plugins"]["stub"].is_object());
    }

    #[test]
    fn test_write_all_produces_both_formats() {
        let (state, registry) = fixtures();
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            enabled: true,
            formats: vec!["json".into(), "csv".into()],
            directory: dir.path().to_string_lossy().into_owned(),
            filename_prefix: "test".into(),
        };

        let written = write_all(&config, &state, &registry).unwrap();
        assert_eq!(written.len(), 2);

        let json_path = written.iter().find(|p| p.extension().unwrap() == "json").unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert!(parsed["metrics"]["load"]["value"]["one"].as_f64().unwrap() > 0.0);

        let csv_path = written.iter().find(|p| p.extension().unwrap() == "csv").unwrap();
        let csv = std::fs::read_to_string(csv_path).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0].split(',').count(),
            lines[1].split(',').count(),
            "header and row column counts differ"
        );
    }
}
