//! Temperature (`/sys/class/hwmon`), battery (`/sys/class/power_supply`),
//! and GPU (`nvidia-smi`) collectors.

use std::path::Path;
use std::process::Command;

use super::{CollectError, Collector, HostFs};
use crate::state::{BatterySample, GpuDevice, GpuSample, SensorReading, SharedState, TemperatureSample};

const HWMON_ROOT: &str = "/sys/class/hwmon";
const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

/// Hardware temperature sensors from the hwmon sysfs tree.
pub struct TemperatureCollector<F: HostFs> {
    fs: F,
}

impl<F: HostFs> TemperatureCollector<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }
}

impl<F: HostFs> Collector for TemperatureCollector<F> {
    fn name(&self) -> &'static str {
        "temperature"
    }

    fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
        let chips = self
            .fs
            .read_dir(Path::new(HWMON_ROOT))
            .map_err(|e| CollectError::Unavailable(format!("{}: {}", HWMON_ROOT, e)))?;

        let mut sensors = Vec::new();
        for chip in chips {
            let chip_name = self
                .fs
                .read_to_string(&chip.join("name"))
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| "hwmon".to_string());

            let Ok(files) = self.fs.read_dir(&chip) else {
                continue;
            };
            for file in files {
                let Some(fname) = file.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let Some(index) = fname
                    .strip_prefix("temp")
                    .and_then(|rest| rest.strip_suffix("_input"))
                else {
                    continue;
                };
                let Ok(raw) = self.fs.read_to_string(&file) else {
                    continue;
                };
                let Ok(millideg) = raw.trim().parse::<i64>() else {
                    continue;
                };
                let label = self
                    .fs
                    .read_to_string(&chip.join(format!("temp{}_label", index)))
                    .map(|s| s.trim().to_string())
                    .unwrap_or_else(|_| format!("{} temp{}", chip_name, index));
                sensors.push(SensorReading {
                    label,
                    celsius: millideg as f64 / 1000.0,
                });
            }
        }

        if sensors.is_empty() {
            return Err(CollectError::Unavailable("no temperature sensors found".into()));
        }
        sensors.sort_by(|a, b| a.label.cmp(&b.label));
        state.temperature.publish(TemperatureSample { sensors });
        Ok(())
    }
}

/// Battery charge level and status from the power_supply class.
pub struct BatteryCollector<F: HostFs> {
    fs: F,
}

impl<F: HostFs> BatteryCollector<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }
}

impl<F: HostFs> Collector for BatteryCollector<F> {
    fn name(&self) -> &'static str {
        "battery"
    }

    fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
        let supplies = self
            .fs
            .read_dir(Path::new(POWER_SUPPLY_ROOT))
            .map_err(|e| CollectError::Unavailable(format!("{}: {}", POWER_SUPPLY_ROOT, e)))?;

        for supply in supplies {
            let is_battery = self
                .fs
                .read_to_string(&supply.join("type"))
                .map(|t| t.trim() == "Battery")
                .unwrap_or(false);
            if !is_battery {
                continue;
            }
            let capacity = self
                .fs
                .read_to_string(&supply.join("capacity"))
                .map_err(|e| CollectError::Io(format!("battery capacity: {}", e)))?
                .trim()
                .parse::<f64>()
                .map_err(|e| CollectError::Parse(format!("battery capacity: {}", e)))?;
            let status = self
                .fs
                .read_to_string(&supply.join("status"))
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| "Unknown".to_string());
            state.battery.publish(BatterySample {
                percent: capacity,
                charging: status == "Charging",
                status,
            });
            return Ok(());
        }

        Err(CollectError::Unavailable("no battery present".into()))
    }
}

/// GPU inventory via `nvidia-smi`. Hosts without the tool (or without a
/// discrete GPU) show the widget as unavailable.
#[derive(Default)]
pub struct GpuCollector;

impl GpuCollector {
    pub fn new() -> Self {
        Self
    }

    fn parse_csv(output: &str) -> Result<Vec<GpuDevice>, CollectError> {
        let mut gpus = Vec::new();
        for line in output.lines() {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != 5 {
                return Err(CollectError::Parse(format!("unexpected nvidia-smi row: {}", line)));
            }
            let mib = |s: &str| -> Result<u64, CollectError> {
                s.parse::<u64>()
                    .map(|v| v * 1024 * 1024)
                    .map_err(|e| CollectError::Parse(format!("nvidia-smi memory: {}", e)))
            };
            let num = |s: &str| -> Result<f64, CollectError> {
                s.parse::<f64>()
                    .map_err(|e| CollectError::Parse(format!("nvidia-smi value: {}", e)))
            };
            gpus.push(GpuDevice {
                name: fields[0].to_string(),
                memory_total: mib(fields[1])?,
                memory_used: mib(fields[2])?,
                utilization_pct: num(fields[3])?,
                temperature_c: num(fields[4])?,
            });
        }
        Ok(gpus)
    }
}

impl Collector for GpuCollector {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
        let output = Command::new("nvidia-smi")
            .args([
                "--query-gpu=name,memory.total,memory.used,utilization.gpu,temperature.gpu",
                "--format=csv,noheader,nounits",
            ])
            .output()
            .map_err(|e| CollectError::Unavailable(format!("nvidia-smi: {}", e)))?;

        if !output.status.success() {
            return Err(CollectError::Unavailable(format!(
                "nvidia-smi exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let gpus = Self::parse_csv(&stdout)?;
        if gpus.is_empty() {
            return Err(CollectError::Unavailable("no GPUs reported".into()));
        }
        state.gpu.publish(GpuSample { gpus });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::testfs::MockFs;

    #[test]
    fn test_temperature_reads_hwmon() {
        let fs = MockFs::default()
            .with_file("/sys/class/hwmon/hwmon0/name", "coretemp\n")
            .with_file("/sys/class/hwmon/hwmon0/temp1_input", "42000\n")
            .with_file("/sys/class/hwmon/hwmon0/temp1_label", "Package id 0\n")
            .with_file("/sys/class/hwmon/hwmon1/name", "nvme\n")
            .with_file("/sys/class/hwmon/hwmon1/temp1_input", "35500\n");
        let state = SharedState::new();
        TemperatureCollector::new(fs).collect(&state).unwrap();

        let sample = state.temperature.read().value.unwrap();
        assert_eq!(sample.sensors.len(), 2);
        let pkg = sample.sensors.iter().find(|s| s.label == "Package id 0").unwrap();
        assert_eq!(pkg.celsius, 42.0);
        let nvme = sample.sensors.iter().find(|s| s.label == "nvme temp1").unwrap();
        assert_eq!(nvme.celsius, 35.5);
    }

    #[test]
    fn test_temperature_no_sensors_is_unavailable() {
        let fs = MockFs::default().with_file("/sys/class/hwmon/hwmon0/name", "empty\n");
        let state = SharedState::new();
        match TemperatureCollector::new(fs).collect(&state) {
            Err(CollectError::Unavailable(_)) => {}
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_battery_reads_first_battery_supply() {
        let fs = MockFs::default()
            .with_file("/sys/class/power_supply/AC/type", "Mains\n")
            .with_file("/sys/class/power_supply/BAT0/type", "Battery\n")
            .with_file("/sys/class/power_supply/BAT0/capacity", "87\n")
            .with_file("/sys/class/power_supply/BAT0/status", "Charging\n");
        let state = SharedState::new();
        BatteryCollector::new(fs).collect(&state).unwrap();

        let sample = state.battery.read().value.unwrap();
        assert_eq!(sample.percent, 87.0);
        assert!(sample.charging);
        assert_eq!(sample.status, "Charging");
    }

    #[test]
    fn test_no_battery_is_unavailable() {
        let fs = MockFs::default().with_file("/sys/class/power_supply/AC/type", "Mains\n");
        let state = SharedState::new();
        match BatteryCollector::new(fs).collect(&state) {
            Err(CollectError::Unavailable(_)) => {}
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_gpu_csv_parse() {
        let gpus = GpuCollector::parse_csv("NVIDIA GeForce RTX 3080, 10240, 2048, 37, 54\n").unwrap();
        assert_eq!(gpus.len(), 1);
        assert_eq!(gpus[0].name, "NVIDIA GeForce RTX 3080");
        assert_eq!(gpus[0].memory_total, 10240 * 1024 * 1024);
        assert_eq!(gpus[0].utilization_pct, 37.0);
    }

    #[test]
    fn test_gpu_csv_malformed_row() {
        assert!(GpuCollector::parse_csv("garbage row\n").is_err());
    }
}
