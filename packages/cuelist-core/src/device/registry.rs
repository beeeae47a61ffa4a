//! Device registry: configuration-driven session materialization.
//!
//! The registry maps device ids to lazily created [`DeviceSession`]s. The
//! roster comes from configuration at construction; disabled devices are
//! filtered out up front and behave like unknown ids.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use super::session::{ConnectionState, DeviceSession};
use super::transport::TransportFactory;
use crate::error::{ControlError, ControlResult};
use crate::events::EventEmitter;
use crate::state::DeviceConfig;

/// One failed device in a bulk operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFailure {
    pub device_id: String,
    pub error: String,
}

/// Snapshot of one device for API responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub state: ConnectionState,
}

/// Maps device ids to sessions, creating them on first use.
pub struct DeviceRegistry {
    configs: HashMap<String, DeviceConfig>,
    sessions: DashMap<String, Arc<DeviceSession>>,
    factory: Arc<dyn TransportFactory>,
    emitter: Arc<dyn EventEmitter>,
}

impl DeviceRegistry {
    /// Creates a registry from the configured roster.
    pub fn new(
        devices: Vec<DeviceConfig>,
        factory: Arc<dyn TransportFactory>,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        let configs = devices
            .into_iter()
            .filter(|d| d.enabled)
            .map(|d| (d.id.clone(), d))
            .collect();
        Self {
            configs,
            sessions: DashMap::new(),
            factory,
            emitter,
        }
    }

    /// Configured (enabled) device ids.
    #[must_use]
    pub fn device_ids(&self) -> Vec<String> {
        self.configs.keys().cloned().collect()
    }

    /// Returns the session for a device, materializing it on first use.
    ///
    /// # Errors
    ///
    /// `DeviceNotFound` for ids outside the configured roster.
    pub fn ensure(&self, device_id: &str) -> ControlResult<Arc<DeviceSession>> {
        let config = self
            .configs
            .get(device_id)
            .ok_or_else(|| ControlError::DeviceNotFound(device_id.to_string()))?;

        // entry() keeps concurrent first-use races to a single session.
        let session = self
            .sessions
            .entry(device_id.to_string())
            .or_insert_with(|| {
                log::info!("[Registry] Materializing session for '{}'", device_id);
                let transport = self.factory.create(config);
                Arc::new(DeviceSession::new(
                    config.clone(),
                    transport,
                    Arc::clone(&self.emitter),
                ))
            });
        Ok(Arc::clone(session.value()))
    }

    /// Returns the session only if it was already materialized.
    #[must_use]
    pub fn get(&self, device_id: &str) -> Option<Arc<DeviceSession>> {
        self.sessions.get(device_id).map(|s| Arc::clone(s.value()))
    }

    /// Snapshots all configured devices with their current states.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DeviceSnapshot> {
        let mut devices: Vec<DeviceSnapshot> = self
            .configs
            .values()
            .map(|config| DeviceSnapshot {
                id: config.id.clone(),
                name: config.name.clone(),
                host: config.host.clone(),
                port: config.port,
                state: self
                    .get(&config.id)
                    .map(|s| s.state())
                    .unwrap_or_default(),
            })
            .collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }

    /// Connects every configured device, collecting failures.
    ///
    /// One device failing does not stop the others.
    pub async fn connect_all(&self) -> Vec<DeviceFailure> {
        let mut failures = Vec::new();
        for device_id in self.device_ids() {
            let result = match self.ensure(&device_id) {
                Ok(session) => session.connect().await,
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                failures.push(DeviceFailure {
                    device_id,
                    error: err.to_string(),
                });
            }
        }
        failures
    }

    /// Disconnects every materialized session, collecting failures.
    pub async fn disconnect_all(&self) -> Vec<DeviceFailure> {
        let sessions: Vec<Arc<DeviceSession>> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut failures = Vec::new();
        for session in sessions {
            if let Err(err) = session.disconnect().await {
                failures.push(DeviceFailure {
                    device_id: session.id().to_string(),
                    error: err.to_string(),
                });
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::session::tests::{test_config, MockTransport};
    use crate::device::transport::DeviceTransport;
    use crate::events::NoopEventEmitter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Factory that counts how many transports it built.
    struct CountingFactory {
        created: AtomicUsize,
        fail_connect_for: Option<String>,
    }

    impl CountingFactory {
        fn new() -> Self {
            Self {
                created: AtomicUsize::new(0),
                fail_connect_for: None,
            }
        }
    }

    impl TransportFactory for CountingFactory {
        fn create(&self, config: &DeviceConfig) -> Arc<dyn DeviceTransport> {
            self.created.fetch_add(1, Ordering::SeqCst);
            match &self.fail_connect_for {
                Some(id) if id == &config.id => Arc::new(MockTransport::failing_connect("refused")),
                _ => Arc::new(MockTransport::ok()),
            }
        }
    }

    fn registry_with(devices: Vec<DeviceConfig>, factory: Arc<CountingFactory>) -> DeviceRegistry {
        DeviceRegistry::new(devices, factory, Arc::new(NoopEventEmitter))
    }

    #[tokio::test]
    async fn ensure_materializes_once() {
        let factory = Arc::new(CountingFactory::new());
        let registry = registry_with(vec![test_config("main")], Arc::clone(&factory));

        let first = registry.ensure("main").unwrap();
        let second = registry.ensure("main").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_device_is_rejected() {
        let registry = registry_with(vec![test_config("main")], Arc::new(CountingFactory::new()));
        let err = registry.ensure("ghost").unwrap_err();
        assert!(matches!(err, ControlError::DeviceNotFound(_)));
    }

    #[tokio::test]
    async fn disabled_device_behaves_like_unknown() {
        let mut disabled = test_config("backup");
        disabled.enabled = false;
        let registry = registry_with(
            vec![test_config("main"), disabled],
            Arc::new(CountingFactory::new()),
        );

        assert!(registry.ensure("backup").is_err());
        assert_eq!(registry.device_ids(), vec!["main"]);
    }

    #[tokio::test]
    async fn connect_all_collects_failures_without_aborting() {
        let factory = Arc::new(CountingFactory {
            created: AtomicUsize::new(0),
            fail_connect_for: Some("bad".to_string()),
        });
        let registry = registry_with(
            vec![test_config("main"), test_config("bad")],
            Arc::clone(&factory),
        );

        let failures = registry.connect_all().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].device_id, "bad");

        // The good device still connected.
        let main = registry.ensure("main").unwrap();
        assert!(main.state().is_connected());
    }

    #[tokio::test]
    async fn snapshot_reports_default_state_for_unmaterialized() {
        let registry = registry_with(vec![test_config("main")], Arc::new(CountingFactory::new()));
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_all_touches_only_materialized_sessions() {
        let factory = Arc::new(CountingFactory::new());
        let registry = registry_with(
            vec![test_config("main"), test_config("backup")],
            Arc::clone(&factory),
        );

        registry.ensure("main").unwrap().connect().await.unwrap();
        let failures = registry.disconnect_all().await;
        assert!(failures.is_empty());
        // backup was never materialized.
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    }
}
