//! Built-in metric collectors, one per domain widget.
//!
//! Each collector is owned by its sampling task and writes only its own
//! [`SharedState`] cell. Collectors may block (procfs reads, external
//! commands); the scheduler runs them on the blocking pool.

mod cache;
mod disk;
mod network;
mod processes;
mod sensors;
mod system;

pub use cache::{CacheEntry, ProcessCache};
pub use disk::{DiskCollector, DiskIoCollector};
pub use network::{ConnectionsCollector, NetworkCollector};
pub use processes::{ProcessCollector, ProcessTreeCollector};
pub use sensors::{BatteryCollector, GpuCollector, TemperatureCollector};
pub use system::{CpuCollector, LoadCollector, MemoryCollector};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::state::SharedState;
use crate::util::SystemClock;

/// Error from a single sampling tick. Never escapes the task boundary:
/// the scheduler converts it into the widget's "unavailable" state.
#[derive(Debug)]
pub enum CollectError {
    /// The metric source does not exist on this host.
    Unavailable(String),
    /// I/O error while reading a kernel file or running a command.
    Io(String),
    /// Malformed data from the metric source.
    Parse(String),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Unavailable(msg) => write!(f, "unavailable: {}", msg),
            CollectError::Io(msg) => write!(f, "I/O error: {}", msg),
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for CollectError {}

/// One update function: samples its domain and publishes into `state`.
pub trait Collector: Send {
    fn name(&self) -> &'static str;
    fn collect(&mut self, state: &SharedState) -> Result<(), CollectError>;
}

/// Abstraction over kernel file reads (`/proc`, `/sys`) so collectors can be
/// fed canned data in tests.
pub trait HostFs: Send {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Reads from the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl HostFs for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(path)? {
            paths.push(entry?.path());
        }
        paths.sort();
        Ok(paths)
    }
}

/// Constructs the built-in collector for a widget id, or `None` for ids
/// with no built-in update function (e.g. plugin widgets).
pub fn builtin_collector(id: &str) -> Option<Box<dyn Collector>> {
    match id {
        "cpu" => Some(Box::new(CpuCollector::new())),
        "memory" => Some(Box::new(MemoryCollector::new())),
        "load" => Some(Box::new(LoadCollector::new())),
        "disk" => Some(Box::new(DiskCollector::new())),
        "disk_io" => Some(Box::new(DiskIoCollector::new(RealFs))),
        "network" => Some(Box::new(NetworkCollector::new())),
        "connections" => Some(Box::new(ConnectionsCollector::new(RealFs))),
        "gpu" => Some(Box::new(GpuCollector::new())),
        "temperature" => Some(Box::new(TemperatureCollector::new(RealFs))),
        "battery" => Some(Box::new(BatteryCollector::new(RealFs))),
        "process" => Some(Box::new(ProcessCollector::new(ProcessCache::new(
            std::time::Duration::from_secs(10),
            Arc::new(SystemClock),
        )))),
        "process_tree" => Some(Box::new(ProcessTreeCollector::new())),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod testfs {
    use super::HostFs;
    use std::collections::BTreeMap;
    use std::io;
    use std::path::{Path, PathBuf};

    /// In-memory filesystem for collector tests.
    #[derive(Default)]
    pub struct MockFs {
        files: BTreeMap<PathBuf, String>,
    }

    impl MockFs {
        pub fn with_file(mut self, path: &str, content: &str) -> Self {
            self.files.insert(PathBuf::from(path), content.to_string());
            self
        }
    }

    impl HostFs for MockFs {
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
        }

        fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
            let mut out: Vec<PathBuf> = self
                .files
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect();
            let mut dirs: Vec<PathBuf> = self
                .files
                .keys()
                .filter_map(|p| {
                    let mut anc = p.ancestors();
                    anc.next();
                    anc.find(|a| a.parent() == Some(path)).map(PathBuf::from)
                })
                .collect();
            out.append(&mut dirs);
            out.sort();
            out.dedup();
            if out.is_empty() {
                return Err(io::Error::new(io::ErrorKind::NotFound, path.display().to_string()));
            }
            Ok(out)
        }
    }

    #[test]
    fn test_mock_fs_lists_directories() {
        let fs = MockFs::default()
            .with_file("/sys/class/hwmon/hwmon0/name", "coretemp")
            .with_file("/sys/class/hwmon/hwmon0/temp1_input", "42000");
        let entries = fs.read_dir(Path::new("/sys/class/hwmon")).unwrap();
        assert_eq!(entries, vec![PathBuf::from("/sys/class/hwmon/hwmon0")]);
        let files = fs.read_dir(Path::new("/sys/class/hwmon/hwmon0")).unwrap();
        assert_eq!(files.len(), 2);
    }
}
