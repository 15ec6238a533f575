//! Minimal bundled plugin: wall clock and uptime panel.
//!
//! Doubles as a reference implementation of the capability trait for
//! plugin authors.

use std::sync::Mutex;

use chrono::{DateTime, Local};

use super::{DataMap, Plugin, PluginConfig, PluginError, PluginIdentity, WidgetHandle};

#[derive(Default)]
struct ClockState {
    settings: DataMap,
    started_at: Option<DateTime<Local>>,
    update_count: u64,
}

pub struct ClockPlugin {
    state: Mutex<ClockState>,
}

impl ClockPlugin {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClockState::default()),
        }
    }
}

impl Default for ClockPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for ClockPlugin {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity {
            name: "clock".to_string(),
            version: "1.0.0".to_string(),
            description: "Shows the local time and how long the dashboard has been up".to_string(),
            author: "hostpulse".to_string(),
        }
    }

    fn initialize(&self, config: &PluginConfig) -> Result<(), PluginError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.settings = config.settings.clone();
        state.started_at = Some(Local::now());
        Ok(())
    }

    fn teardown(&self) -> Result<(), PluginError> {
        Ok(())
    }

    fn create_widget(&self) -> Result<WidgetHandle, PluginError> {
        let widget = WidgetHandle::new("Clock");
        self.update_widget(&widget)?;
        Ok(widget)
    }

    fn update_widget(&self, widget: &WidgetHandle) -> Result<(), PluginError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.update_count += 1;

        let now = Local::now();
        let mut lines = vec![
            format!("Time:    {}", now.format("%H:%M:%S")),
            format!("Date:    {}", now.format("%Y-%m-%d")),
        ];
        if let Some(started) = state.started_at {
            let up = (now - started).num_seconds().max(0) as u64;
            lines.push(format!("Up:      {}", crate::util::format_duration(up)));
        }
        lines.push(format!("Updates: {}", state.update_count));
        for (key, value) in &state.settings {
            lines.push(format!("{}: {}", key, value));
        }

        widget.set_lines(lines);
        Ok(())
    }

    fn collect_data(&self) -> Result<DataMap, PluginError> {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let mut map = DataMap::new();
        map.insert("time".into(), Local::now().format("%H:%M:%S").to_string().into());
        map.insert("update_count".into(), state.update_count.into());
        if let Some(started) = state.started_at {
            map.insert("started_at".into(), started.to_rfc3339().into());
        }
        Ok(map)
    }

    fn export_data(&self) -> DataMap {
        self.collect_data().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_lifecycle() {
        let plugin = ClockPlugin::new();
        plugin.initialize(&PluginConfig::default()).unwrap();

        let widget = plugin.create_widget().unwrap();
        plugin.update_widget(&widget).unwrap();

        let body = widget.body();
        assert!(body.lines.iter().any(|l| l.starts_with("Time:")));
        assert!(body.unavailable.is_none());

        let data = plugin.collect_data().unwrap();
        // create_widget and update_widget each count as one update
        assert_eq!(data["update_count"], 2);
        assert!(data.contains_key("started_at"));

        plugin.teardown().unwrap();
    }

    #[test]
    fn test_settings_appear_in_widget() {
        let plugin = ClockPlugin::new();
        let mut config = PluginConfig::default();
        config.settings.insert("zone".into(), "local".into());
        plugin.initialize(&config).unwrap();

        let widget = plugin.create_widget().unwrap();
        assert!(widget.body().lines.iter().any(|l| l.contains("zone")));
    }
}
