//! Core configuration types.
//!
//! [`Config`] holds everything the control plane needs at bootstrap time:
//! server settings and the static device roster. The headless server binary
//! builds this from its YAML configuration; embedders construct it directly.

use serde::{Deserialize, Serialize};

/// Static configuration for one playout device.
///
/// Consumed once by the device registry to materialize sessions. Devices with
/// `enabled == false` are kept out of the registry entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Stable device identifier referenced by timeline items.
    pub id: String,
    /// Human-readable device name (used in logs and events).
    pub name: String,
    /// Hostname or IP address of the playout device.
    pub host: String,
    /// Command port of the playout device.
    pub port: u16,
    /// Whether the device is available for session materialization.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Configuration for the Cuelist control plane.
///
/// All fields have sensible defaults except the device roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Preferred port for the HTTP server (0 = auto-allocate).
    pub preferred_port: u16,

    /// Timeout for a single device command round-trip (milliseconds).
    pub command_timeout_ms: u64,

    /// Timeout for establishing a device connection (milliseconds).
    pub connect_timeout_ms: u64,

    /// Configured playout devices.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl Config {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message if any value would cause runtime issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.command_timeout_ms == 0 {
            return Err("command_timeout_ms must be >= 1".to_string());
        }
        if self.connect_timeout_ms == 0 {
            return Err("connect_timeout_ms must be >= 1".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for device in &self.devices {
            if device.id.is_empty() {
                return Err("device id must not be empty".to_string());
            }
            if !seen.insert(device.id.as_str()) {
                return Err(format!("duplicate device id: {}", device.id));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 0,
            command_timeout_ms: 5000,
            connect_timeout_ms: 3000,
            devices: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str) -> DeviceConfig {
        DeviceConfig {
            id: id.to_string(),
            name: format!("Device {id}"),
            host: "127.0.0.1".to_string(),
            port: 5250,
            enabled: true,
        }
    }

    #[test]
    fn config_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn config_rejects_zero_timeouts() {
        let config = Config {
            command_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_rejects_duplicate_device_ids() {
        let config = Config {
            devices: vec![device("d1"), device("d1")],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn device_enabled_defaults_to_true() {
        let parsed: DeviceConfig = serde_json::from_str(
            r#"{"id":"d1","name":"Main","host":"10.0.0.5","port":5250}"#,
        )
        .unwrap();
        assert!(parsed.enabled);
    }
}
