//! Disk usage (sysinfo) and block device throughput (`/proc/diskstats`).

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use sysinfo::Disks;

use super::{CollectError, Collector, HostFs};
use crate::state::{DeviceIo, DiskIoSample, DiskSample, MountUsage, SharedState};

/// Filesystem usage per mounted disk.
pub struct DiskCollector {
    disks: Disks,
}

impl DiskCollector {
    pub fn new() -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for DiskCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for DiskCollector {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
        self.disks.refresh(true);
        let mut mounts: Vec<MountUsage> = self
            .disks
            .iter()
            .map(|d| {
                let total = d.total_space();
                let used = total.saturating_sub(d.available_space());
                MountUsage {
                    mount_point: d.mount_point().to_string_lossy().into_owned(),
                    total,
                    used,
                    used_pct: if total > 0 {
                        used as f64 * 100.0 / total as f64
                    } else {
                        0.0
                    },
                }
            })
            .collect();
        mounts.sort_by(|a, b| a.mount_point.cmp(&b.mount_point));
        mounts.dedup_by(|a, b| a.mount_point == b.mount_point);
        state.disk.publish(DiskSample { mounts });
        Ok(())
    }
}

/// Cumulative counters for one device, as read from `/proc/diskstats`.
#[derive(Clone, Copy)]
struct DiskCounters {
    reads_completed: u64,
    sectors_read: u64,
    writes_completed: u64,
    sectors_written: u64,
}

/// Block device read/write throughput from successive counter reads.
pub struct DiskIoCollector<F: HostFs> {
    fs: F,
    prev: HashMap<String, DiskCounters>,
    prev_at: Option<Instant>,
}

const SECTOR_SIZE: u64 = 512;

impl<F: HostFs> DiskIoCollector<F> {
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            prev: HashMap::new(),
            prev_at: None,
        }
    }

    fn parse_diskstats(data: &str) -> Result<HashMap<String, DiskCounters>, CollectError> {
        let mut out = HashMap::new();
        for line in data.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                continue;
            }
            let device = fields[2];
            // virtual devices carry no useful throughput
            if device.starts_with("loop") || device.starts_with("ram") {
                continue;
            }
            let parse = |idx: usize| -> Result<u64, CollectError> {
                fields[idx]
                    .parse::<u64>()
                    .map_err(|e| CollectError::Parse(format!("diskstats field {}: {}", idx, e)))
            };
            out.insert(
                device.to_string(),
                DiskCounters {
                    reads_completed: parse(3)?,
                    sectors_read: parse(5)?,
                    writes_completed: parse(7)?,
                    sectors_written: parse(9)?,
                },
            );
        }
        Ok(out)
    }
}

impl<F: HostFs> Collector for DiskIoCollector<F> {
    fn name(&self) -> &'static str {
        "disk_io"
    }

    fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
        let data = self
            .fs
            .read_to_string(Path::new("/proc/diskstats"))
            .map_err(|e| CollectError::Unavailable(format!("/proc/diskstats: {}", e)))?;
        let current = Self::parse_diskstats(&data)?;

        let now = Instant::now();
        let elapsed = self
            .prev_at
            .map(|t| now.duration_since(t).as_secs_f64())
            .unwrap_or(0.0);

        let mut devices: Vec<DeviceIo> = Vec::new();
        for (device, counters) in &current {
            let (read_bps, write_bps) = match (self.prev.get(device), elapsed > 0.0) {
                (Some(prev), true) => {
                    let read = counters.sectors_read.saturating_sub(prev.sectors_read) * SECTOR_SIZE;
                    let written =
                        counters.sectors_written.saturating_sub(prev.sectors_written) * SECTOR_SIZE;
                    (
                        (read as f64 / elapsed) as u64,
                        (written as f64 / elapsed) as u64,
                    )
                }
                _ => (0, 0),
            };
            devices.push(DeviceIo {
                device: device.clone(),
                read_bytes_per_sec: read_bps,
                write_bytes_per_sec: write_bps,
                reads_completed: counters.reads_completed,
                writes_completed: counters.writes_completed,
            });
        }
        devices.sort_by(|a, b| a.device.cmp(&b.device));

        self.prev = current;
        self.prev_at = Some(now);
        state.disk_io.publish(DiskIoSample { devices });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::testfs::MockFs;
    use crate::state::CellStatus;

    const DISKSTATS: &str = "\
   8       0 sda 1000 10 16000 500 2000 20 48000 800 0 900 1300
   8       1 sda1 900 10 14000 450 1900 20 46000 750 0 850 1200
   7       0 loop0 5 0 40 1 0 0 0 0 0 0 0
";

    #[test]
    fn test_parse_skips_virtual_devices() {
        let counters = DiskIoCollector::<MockFs>::parse_diskstats(DISKSTATS).unwrap();
        assert!(counters.contains_key("sda"));
        assert!(counters.contains_key("sda1"));
        assert!(!counters.contains_key("loop0"));
        assert_eq!(counters["sda"].sectors_read, 16000);
        assert_eq!(counters["sda"].sectors_written, 48000);
    }

    #[test]
    fn test_first_tick_publishes_zero_rates() {
        let fs = MockFs::default().with_file("/proc/diskstats", DISKSTATS);
        let state = SharedState::new();
        let mut collector = DiskIoCollector::new(fs);
        collector.collect(&state).unwrap();

        let sample = state.disk_io.read().value.unwrap();
        let sda = sample.devices.iter().find(|d| d.device == "sda").unwrap();
        assert_eq!(sda.read_bytes_per_sec, 0);
        assert_eq!(sda.reads_completed, 1000);
    }

    #[test]
    fn test_missing_diskstats_is_unavailable() {
        let state = SharedState::new();
        let mut collector = DiskIoCollector::new(MockFs::default());
        match collector.collect(&state) {
            Err(CollectError::Unavailable(_)) => {}
            other => panic!("expected unavailable, got {:?}", other),
        }
        // the scheduler, not the collector, marks the cell
        assert_eq!(state.disk_io.read().status, CellStatus::Empty);
    }
}
