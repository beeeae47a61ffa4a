//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// One playout device entry in the YAML roster.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to.
    /// Override: `CUELIST_BIND_PORT`
    pub bind_port: u16,

    /// Timeout for a single device command round-trip (milliseconds).
    /// Override: `CUELIST_COMMAND_TIMEOUT_MS`
    pub command_timeout_ms: u64,

    /// Timeout for establishing a device connection (milliseconds).
    /// Override: `CUELIST_CONNECT_TIMEOUT_MS`
    pub connect_timeout_ms: u64,

    /// Connect all configured devices at startup.
    pub connect_on_start: bool,

    /// Path to the project bundle file (JSON).
    /// Override: `CUELIST_PROJECT_FILE`
    pub project_file: Option<PathBuf>,

    /// Configured playout devices.
    pub devices: Vec<DeviceEntry>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_port: 49500,
            command_timeout_ms: 5000,
            connect_timeout_ms: 3000,
            connect_on_start: false,
            project_file: None,
            devices: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CUELIST_BIND_PORT") {
            if let Ok(port) = val.parse() {
                self.bind_port = port;
            }
        }

        if let Ok(val) = std::env::var("CUELIST_COMMAND_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse() {
                self.command_timeout_ms = timeout;
            }
        }

        if let Ok(val) = std::env::var("CUELIST_CONNECT_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse() {
                self.connect_timeout_ms = timeout;
            }
        }

        // Note: CUELIST_PROJECT_FILE is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to cuelist-core's Config type.
    pub fn to_core_config(&self) -> cuelist_core::Config {
        cuelist_core::Config {
            preferred_port: self.bind_port,
            command_timeout_ms: self.command_timeout_ms,
            connect_timeout_ms: self.connect_timeout_ms,
            devices: self
                .devices
                .iter()
                .map(|d| cuelist_core::DeviceConfig {
                    id: d.id.clone(),
                    name: d.name.clone(),
                    host: d.host.clone(),
                    port: d.port,
                    enabled: d.enabled,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_converts_cleanly() {
        let config = ServerConfig::default();
        let core = config.to_core_config();
        assert!(core.validate().is_ok());
        assert!(core.devices.is_empty());
    }

    #[test]
    fn yaml_roster_is_parsed() {
        let yaml = r#"
bind_port: 9000
devices:
  - id: main
    name: Main playout
    host: 10.0.0.5
    port: 5250
  - id: backup
    name: Backup
    host: 10.0.0.6
    port: 5250
    enabled: false
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.devices.len(), 2);
        assert!(config.devices[0].enabled);
        assert!(!config.devices[1].enabled);
    }
}
