//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together. This pattern provides:
//!
//! - **Clarity**: All dependency relationships are visible in one place
//! - **Testability**: Easy to swap implementations for testing
//! - **Maintainability**: Service creation logic is isolated from usage

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::device::registry::DeviceRegistry;
use crate::device::transport::{TcpTransportFactory, TransportFactory};
use crate::events::{EventEmitter, FanoutService};
use crate::orchestrator::PlaybackOrchestrator;
use crate::project::runtime::ProjectRuntime;
use crate::project::source::ProjectSource;
use crate::state::Config;

/// Container for all bootstrapped services.
///
/// This struct holds all the wired services created during bootstrap.
/// It's consumed by `AppState` to build the final application state.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Event fan-out for SSE subscribers (also the crate's [`EventEmitter`]).
    pub fanout: Arc<FanoutService>,
    /// Device session registry.
    pub registry: Arc<DeviceRegistry>,
    /// Current-project holder.
    pub runtime: Arc<ProjectRuntime>,
    /// Coordinates playback across project model and device sessions.
    pub orchestrator: Arc<PlaybackOrchestrator>,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Signal cancellation to all background tasks
        self.cancel_token.cancel();

        // Disconnect all device sessions; failures are logged, not fatal
        for failure in self.registry.disconnect_all().await {
            log::warn!(
                "[Bootstrap] Disconnect failed for '{}': {}",
                failure.device_id,
                failure.error
            );
        }

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps all application services with their dependencies.
///
/// This is the composition root where all services are instantiated and
/// wired together. The wiring order matters - services are created in
/// dependency order:
///
/// 1. Event fan-out (everything emits through it)
/// 2. Device registry (depends on transport factory and emitter)
/// 3. Project runtime (depends on the project source)
/// 4. Orchestrator (depends on runtime, registry, emitter)
///
/// # Arguments
/// * `config` - Application configuration
/// * `source` - Project persistence backend
///
/// # Returns
///
/// A `BootstrappedServices` container with all services ready to use.
pub fn bootstrap_services(config: &Config, source: Arc<dyn ProjectSource>) -> BootstrappedServices {
    let factory = Arc::new(TcpTransportFactory::new(
        Duration::from_millis(config.connect_timeout_ms),
        Duration::from_millis(config.command_timeout_ms),
    ));
    bootstrap_services_with_factory(config, source, factory)
}

/// Bootstrap variant with an injectable transport factory.
///
/// Used by tests and embedders that talk to something other than TCP devices.
pub fn bootstrap_services_with_factory(
    config: &Config,
    source: Arc<dyn ProjectSource>,
    factory: Arc<dyn TransportFactory>,
) -> BootstrappedServices {
    let fanout = Arc::new(FanoutService::new());
    let emitter: Arc<dyn EventEmitter> = Arc::clone(&fanout) as Arc<dyn EventEmitter>;

    let registry = Arc::new(DeviceRegistry::new(
        config.devices.clone(),
        factory,
        Arc::clone(&emitter),
    ));
    let runtime = Arc::new(ProjectRuntime::new(source));
    let orchestrator = Arc::new(PlaybackOrchestrator::new(
        Arc::clone(&runtime),
        Arc::clone(&registry),
        Arc::clone(&emitter),
    ));

    log::info!(
        "[Bootstrap] Services wired ({} device(s) configured)",
        registry.device_ids().len()
    );

    BootstrappedServices {
        fanout,
        registry,
        runtime,
        orchestrator,
        cancel_token: CancellationToken::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::source::{
        ClipRecord, EventRecord, ProjectRecord, SourceError, SourceResult, TemplateRecord,
    };
    use async_trait::async_trait;

    struct EmptySource;

    #[async_trait]
    impl ProjectSource for EmptySource {
        async fn find_project_by_id(&self, id: &str) -> SourceResult<ProjectRecord> {
            Err(SourceError::UnknownProject(id.to_string()))
        }
        async fn find_events_by_project(&self, _id: &str) -> SourceResult<Vec<EventRecord>> {
            Ok(vec![])
        }
        async fn find_clips_by_event(&self, _id: &str) -> SourceResult<Vec<ClipRecord>> {
            Ok(vec![])
        }
        async fn find_templates_by_event(&self, _id: &str) -> SourceResult<Vec<TemplateRecord>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn bootstrap_wires_services() {
        let config = Config::default();
        let services = bootstrap_services(&config, Arc::new(EmptySource));

        assert!(!services.runtime.is_loaded());
        assert_eq!(services.fanout.observer_count(), 0);
        assert!(services.registry.device_ids().is_empty());
    }

    #[tokio::test]
    async fn shutdown_cancels_token() {
        let services = bootstrap_services(&Config::default(), Arc::new(EmptySource));
        services.shutdown().await;
        assert!(services.cancel_token.is_cancelled());
    }
}
