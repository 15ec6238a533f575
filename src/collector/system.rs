//! CPU, memory, and load average collectors backed by `sysinfo`.

use sysinfo::System;

use super::{CollectError, Collector};
use crate::state::{CpuSample, LoadSample, MemorySample, SharedState};

/// Per-core and total CPU usage. The first tick after startup reports 0%
/// because usage is computed between successive refreshes.
pub struct CpuCollector {
    sys: System,
}

impl CpuCollector {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for CpuCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for CpuCollector {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
        self.sys.refresh_cpu_usage();
        let per_core_pct: Vec<f32> = self.sys.cpus().iter().map(|c| c.cpu_usage()).collect();
        state.cpu.publish(CpuSample {
            total_pct: self.sys.global_cpu_usage(),
            per_core_pct,
        });
        Ok(())
    }
}

/// RAM and swap usage.
pub struct MemoryCollector {
    sys: System,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for MemoryCollector {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
        self.sys.refresh_memory();
        state.memory.publish(MemorySample {
            total: self.sys.total_memory(),
            used: self.sys.used_memory(),
            available: self.sys.available_memory(),
            swap_total: self.sys.total_swap(),
            swap_used: self.sys.used_swap(),
        });
        Ok(())
    }
}

/// 1/5/15 minute load averages.
#[derive(Default)]
pub struct LoadCollector;

impl LoadCollector {
    pub fn new() -> Self {
        Self
    }
}

impl Collector for LoadCollector {
    fn name(&self) -> &'static str {
        "load"
    }

    fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
        let avg = System::load_average();
        state.load.publish(LoadSample {
            one: avg.one,
            five: avg.five,
            fifteen: avg.fifteen,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CellStatus;

    #[test]
    fn test_memory_collector_publishes() {
        let state = SharedState::new();
        let mut collector = MemoryCollector::new();
        collector.collect(&state).unwrap();

        let view = state.memory.read();
        assert_eq!(view.status, CellStatus::Ok);
        assert!(view.value.unwrap().total > 0);
    }

    #[test]
    fn test_cpu_collector_reports_cores() {
        let state = SharedState::new();
        let mut collector = CpuCollector::new();
        collector.collect(&state).unwrap();
        assert!(!state.cpu.read().value.unwrap().per_core_pct.is_empty());
    }
}
