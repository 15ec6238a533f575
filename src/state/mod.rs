//! Shared dashboard state: one independently lockable cell per metric domain.
//!
//! Ownership contract: exactly one sampling task writes a given cell; the
//! render pass and the export snapshot builder only read. Cells are
//! last-write-visible and not atomic across domains: a render pass may
//! observe values sampled at slightly different instants.

mod sample;

pub use sample::*;

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Visible availability of a widget's data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum CellStatus {
    /// No sample published yet.
    #[default]
    Empty,
    /// Last update succeeded.
    Ok,
    /// Last update failed; the widget shows this text instead of stale data.
    Unavailable(String),
}

/// Snapshot of one cell, as read by render and export.
#[derive(Debug, Clone, Serialize)]
pub struct CellView<T> {
    pub value: Option<T>,
    pub status: CellStatus,
    pub error_count: u64,
    pub last_update: Option<DateTime<Utc>>,
}

impl<T> Default for CellView<T> {
    fn default() -> Self {
        Self {
            value: None,
            status: CellStatus::Empty,
            error_count: 0,
            last_update: None,
        }
    }
}

/// Single-writer cell for one metric domain.
pub struct MetricCell<T> {
    inner: RwLock<CellView<T>>,
}

impl<T> Default for MetricCell<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(CellView::default()),
        }
    }
}

impl<T: Clone> MetricCell<T> {
    /// Publishes a fresh sample and clears any previous error status.
    pub fn publish(&self, value: T) {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        guard.value = Some(value);
        guard.status = CellStatus::Ok;
        guard.last_update = Some(Utc::now());
    }

    /// Marks the cell unavailable and bumps the error counter. The previous
    /// value is kept for export but the renderer shows the error text.
    pub fn publish_error(&self, error: impl Into<String>) {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        guard.status = CellStatus::Unavailable(error.into());
        guard.error_count += 1;
    }

    /// Read-only copy of the cell.
    pub fn read(&self) -> CellView<T> {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn error_count(&self) -> u64 {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).error_count
    }
}

/// The full shared state, one cell per metric domain.
#[derive(Default)]
pub struct SharedState {
    pub cpu: MetricCell<CpuSample>,
    pub memory: MetricCell<MemorySample>,
    pub disk: MetricCell<DiskSample>,
    pub disk_io: MetricCell<DiskIoSample>,
    pub network: MetricCell<NetworkSample>,
    pub connections: MetricCell<ConnectionsSample>,
    pub gpu: MetricCell<GpuSample>,
    pub load: MetricCell<LoadSample>,
    pub temperature: MetricCell<TemperatureSample>,
    pub battery: MetricCell<BatterySample>,
    pub process: MetricCell<ProcessSample>,
    pub process_tree: MetricCell<ProcessTreeSample>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the cell belonging to `widget_id` unavailable. Used by the
    /// scheduler's task boundary when an update function fails or panics.
    pub fn mark_unavailable(&self, widget_id: &str, error: &str) {
        match widget_id {
            "cpu" => self.cpu.publish_error(error),
            "memory" => self.memory.publish_error(error),
            "disk" => self.disk.publish_error(error),
            "disk_io" => self.disk_io.publish_error(error),
            "network" => self.network.publish_error(error),
            "connections" => self.connections.publish_error(error),
            "gpu" => self.gpu.publish_error(error),
            "load" => self.load.publish_error(error),
            "temperature" => self.temperature.publish_error(error),
            "battery" => self.battery.publish_error(error),
            "process" => self.process.publish_error(error),
            "process_tree" => self.process_tree.publish_error(error),
            _ => {}
        }
    }

    /// Error counter for `widget_id`, 0 for unknown ids.
    pub fn error_count(&self, widget_id: &str) -> u64 {
        match widget_id {
            "cpu" => self.cpu.error_count(),
            "memory" => self.memory.error_count(),
            "disk" => self.disk.error_count(),
            "disk_io" => self.disk_io.error_count(),
            "network" => self.network.error_count(),
            "connections" => self.connections.error_count(),
            "gpu" => self.gpu.error_count(),
            "load" => self.load.error_count(),
            "temperature" => self.temperature.error_count(),
            "battery" => self.battery.error_count(),
            "process" => self.process.error_count(),
            "process_tree" => self.process_tree.error_count(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_then_read() {
        let cell = MetricCell::<LoadSample>::default();
        assert_eq!(cell.read().status, CellStatus::Empty);

        cell.publish(LoadSample {
            one: 0.5,
            five: 0.7,
            fifteen: 1.0,
        });
        let view = cell.read();
        assert_eq!(view.status, CellStatus::Ok);
        assert_eq!(view.value.unwrap().one, 0.5);
        assert!(view.last_update.is_some());
    }

    #[test]
    fn test_error_keeps_value_and_counts() {
        let cell = MetricCell::<LoadSample>::default();
        cell.publish(LoadSample::default());
        cell.publish_error("probe failed");
        cell.publish_error("probe failed");

        let view = cell.read();
        assert_eq!(view.status, CellStatus::Unavailable("probe failed".into()));
        assert!(view.value.is_some());
        assert_eq!(view.error_count, 2);
    }

    #[test]
    fn test_recovery_clears_unavailable() {
        let cell = MetricCell::<LoadSample>::default();
        cell.publish_error("down");
        cell.publish(LoadSample::default());
        assert_eq!(cell.read().status, CellStatus::Ok);
        // the counter is cumulative, not reset by recovery
        assert_eq!(cell.error_count(), 1);
    }

    #[test]
    fn test_mark_unavailable_routes_by_id() {
        let state = SharedState::new();
        state.mark_unavailable("gpu", "nvidia-smi missing");
        assert_eq!(state.gpu.error_count(), 1);
        assert_eq!(state.cpu.error_count(), 0);
        // unknown ids are ignored
        state.mark_unavailable("nope", "x");
    }
}
