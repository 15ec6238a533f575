//! Bundled Docker plugin: container list via the docker CLI.
//!
//! `initialize` probes for a reachable docker daemon and fails when it is
//! absent, so hosts without docker simply skip the plugin at load time.

use std::process::Command;
use std::sync::Mutex;

use super::{DataMap, Plugin, PluginConfig, PluginError, PluginIdentity, WidgetHandle};

#[derive(Debug, Clone)]
struct ContainerRow {
    id: String,
    name: String,
    image: String,
    status: String,
}

#[derive(Default)]
struct DockerState {
    containers: Vec<ContainerRow>,
}

pub struct DockerPlugin {
    state: Mutex<DockerState>,
}

impl DockerPlugin {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DockerState::default()),
        }
    }

    fn docker(args: &[&str]) -> Result<String, PluginError> {
        let output = Command::new("docker")
            .args(args)
            .output()
            .map_err(|e| PluginError::Unavailable(format!("docker: {}", e)))?;
        if !output.status.success() {
            return Err(PluginError::Failed(format!(
                "docker {} exited with {}",
                args.first().unwrap_or(&""),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn parse_ps(output: &str) -> Vec<ContainerRow> {
        output
            .lines()
            .filter_map(|line| {
                let mut fields = line.split('\t');
                Some(ContainerRow {
                    id: fields.next()?.to_string(),
                    name: fields.next()?.to_string(),
                    image: fields.next()?.to_string(),
                    status: fields.next()?.to_string(),
                })
            })
            .collect()
    }

    fn fetch(&self) -> Result<(), PluginError> {
        let output = Self::docker(&[
            "ps",
            "--all",
            "--format",
            "{{.ID}}\t{{.Names}}\t{{.Image}}\t{{.Status}}",
        ])?;
        let containers = Self::parse_ps(&output);
        self.state.lock().unwrap_or_else(|p| p.into_inner()).containers = containers;
        Ok(())
    }
}

impl Default for DockerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for DockerPlugin {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity {
            name: "docker".to_string(),
            version: "1.0.0".to_string(),
            description: "Monitors docker containers via the docker CLI".to_string(),
            author: "hostpulse".to_string(),
        }
    }

    fn initialize(&self, _config: &PluginConfig) -> Result<(), PluginError> {
        Self::docker(&["version", "--format", "{{.Server.Version}}"]).map(|_| ())
    }

    fn teardown(&self) -> Result<(), PluginError> {
        Ok(())
    }

    fn create_widget(&self) -> Result<WidgetHandle, PluginError> {
        let widget = WidgetHandle::new("Docker");
        self.update_widget(&widget)?;
        Ok(widget)
    }

    fn update_widget(&self, widget: &WidgetHandle) -> Result<(), PluginError> {
        self.fetch()?;
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());

        let running = state
            .containers
            .iter()
            .filter(|c| c.status.starts_with("Up"))
            .count();
        let mut lines = vec![format!(
            "Containers: {} running / {} total",
            running,
            state.containers.len()
        )];
        for container in &state.containers {
            lines.push(format!(
                "{} {} ({}) {}",
                container.id, container.name, container.image, container.status
            ));
        }

        widget.set_lines(lines);
        Ok(())
    }

    fn collect_data(&self) -> Result<DataMap, PluginError> {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let mut map = DataMap::new();
        map.insert("total".into(), state.containers.len().into());
        map.insert(
            "running".into(),
            state
                .containers
                .iter()
                .filter(|c| c.status.starts_with("Up"))
                .count()
                .into(),
        );
        map.insert(
            "containers".into(),
            state
                .containers
                .iter()
                .map(|c| c.name.clone())
                .collect::<Vec<_>>()
                .into(),
        );
        Ok(map)
    }

    fn export_data(&self) -> DataMap {
        self.collect_data().unwrap_or_default()
    }
}
