//! Per-domain sample models, one struct per metric domain.

use serde::Serialize;

/// CPU usage, percent per core plus the total.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CpuSample {
    pub total_pct: f32,
    pub per_core_pct: Vec<f32>,
}

/// RAM and swap, in bytes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemorySample {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub swap_total: u64,
    pub swap_used: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MountUsage {
    pub mount_point: String,
    pub total: u64,
    pub used: u64,
    pub used_pct: f64,
}

/// Filesystem usage per mounted disk.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiskSample {
    pub mounts: Vec<MountUsage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceIo {
    pub device: String,
    pub read_bytes_per_sec: u64,
    pub write_bytes_per_sec: u64,
    pub reads_completed: u64,
    pub writes_completed: u64,
}

/// Block device throughput derived from successive counter reads.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiskIoSample {
    pub devices: Vec<DeviceIo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IfaceRates {
    pub name: String,
    pub rx_bytes_per_sec: u64,
    pub tx_bytes_per_sec: u64,
    pub total_rx: u64,
    pub total_tx: u64,
}

/// Per-interface receive/transmit rates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkSample {
    pub interfaces: Vec<IfaceRates>,
}

/// TCP connection counts by state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionsSample {
    pub total: usize,
    pub established: usize,
    pub listening: usize,
    pub time_wait: usize,
    pub close_wait: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GpuDevice {
    pub name: String,
    pub memory_total: u64,
    pub memory_used: u64,
    pub utilization_pct: f64,
    pub temperature_c: f64,
}

/// Discrete GPUs as reported by the vendor tool.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GpuSample {
    pub gpus: Vec<GpuDevice>,
}

/// System load averages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSample {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorReading {
    pub label: String,
    pub celsius: f64,
}

/// Hardware temperature sensors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemperatureSample {
    pub sensors: Vec<SensorReading>,
}

/// Battery charge state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatterySample {
    pub percent: f64,
    pub status: String,
    pub charging: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessRow {
    pub pid: u32,
    pub name: String,
    pub user: String,
    pub cpu_pct: f32,
    pub mem_pct: f64,
    pub memory: u64,
    pub status: String,
}

/// Process table, sorted by CPU usage descending.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessSample {
    pub total: usize,
    pub rows: Vec<ProcessRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeRow {
    pub pid: u32,
    pub depth: usize,
    pub name: String,
}

/// Parent/child process hierarchy flattened for display.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessTreeSample {
    pub total: usize,
    pub rows: Vec<TreeRow>,
}
