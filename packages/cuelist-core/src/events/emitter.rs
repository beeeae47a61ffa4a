//! Event emitter abstraction for decoupling services from transport.
//!
//! Services depend on the [`EventEmitter`] trait rather than a concrete
//! fan-out, enabling testing and alternative delivery implementations.

use super::{DeviceEvent, ItemEvent, ProjectEvent, SystemEvent};

/// Trait for emitting domain events without knowledge of transport.
///
/// Services use this trait to emit events, decoupling them from the
/// specifics of how events are delivered to clients (SSE, Tauri frontend, etc.).
///
/// # Example
///
/// ```ignore
/// struct MyService {
///     emitter: Arc<dyn EventEmitter>,
/// }
///
/// impl MyService {
///     fn do_something(&self) {
///         self.emitter.emit_item(ItemEvent::StateChanged { ... });
///     }
/// }
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits a device session event.
    fn emit_device(&self, event: DeviceEvent);

    /// Emits an item playback event.
    fn emit_item(&self, event: ItemEvent);

    /// Emits a project lifecycle event.
    fn emit_project(&self, event: ProjectEvent);

    /// Emits a housekeeping event.
    fn emit_system(&self, event: SystemEvent);
}

/// No-op emitter for testing or embedding without a client transport.
///
/// Events are silently discarded.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_device(&self, _event: DeviceEvent) {
        // No-op
    }

    fn emit_item(&self, _event: ItemEvent) {
        // No-op
    }

    fn emit_project(&self, _event: ProjectEvent) {
        // No-op
    }

    fn emit_system(&self, _event: SystemEvent) {
        // No-op
    }
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level. Useful for debugging event flow
/// or in development environments.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_device(&self, event: DeviceEvent) {
        tracing::debug!(?event, "device_event");
    }

    fn emit_item(&self, event: ItemEvent) {
        tracing::debug!(?event, "item_event");
    }

    fn emit_project(&self, event: ProjectEvent) {
        tracing::debug!(?event, "project_event");
    }

    fn emit_system(&self, event: SystemEvent) {
        tracing::debug!(?event, "system_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ItemType;
    use crate::project::model::PlaybackState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Test emitter that counts events.
    struct CountingEventEmitter {
        item_count: AtomicUsize,
        project_count: AtomicUsize,
    }

    impl CountingEventEmitter {
        fn new() -> Self {
            Self {
                item_count: AtomicUsize::new(0),
                project_count: AtomicUsize::new(0),
            }
        }
    }

    impl EventEmitter for CountingEventEmitter {
        fn emit_device(&self, _event: DeviceEvent) {}

        fn emit_item(&self, _event: ItemEvent) {
            self.item_count.fetch_add(1, Ordering::SeqCst);
        }

        fn emit_project(&self, _event: ProjectEvent) {
            self.project_count.fetch_add(1, Ordering::SeqCst);
        }

        fn emit_system(&self, _event: SystemEvent) {}
    }

    #[test]
    fn counting_emitter_tracks_events() {
        let emitter = Arc::new(CountingEventEmitter::new());

        emitter.emit_item(ItemEvent::StateChanged {
            item_id: "clip-1".to_string(),
            item_type: ItemType::Clip,
            state: PlaybackState::Playing,
            timestamp: 0,
        });
        emitter.emit_item(ItemEvent::StateChanged {
            item_id: "clip-1".to_string(),
            item_type: ItemType::Clip,
            state: PlaybackState::Stopped,
            timestamp: 0,
        });
        emitter.emit_project(ProjectEvent::Unloaded {
            project_id: "show-a".to_string(),
            timestamp: 0,
        });

        assert_eq!(emitter.item_count.load(Ordering::SeqCst), 2);
        assert_eq!(emitter.project_count.load(Ordering::SeqCst), 1);
    }
}
