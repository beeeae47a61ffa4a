//! Observer registry and event fan-out.
//!
//! This module delivers [`BroadcastEvent`]s to subscribed observers:
//!
//! - `FanoutService`: tracks observers and publishes events to each of them
//! - `ObserverHandle`: RAII handle for automatic unregistration on disconnect
//!
//! Each observer gets its own unbounded channel, so a slow or dead observer
//! never delays delivery to the others. An observer whose channel is closed
//! is evicted during the publish that discovers it.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::{
    BroadcastEvent, DeviceEvent, EventEmitter, ItemEvent, ProjectEvent, SystemEvent,
};
use crate::utils::now_millis;

/// Internal per-observer state.
struct ObserverEntry {
    sender: mpsc::UnboundedSender<BroadcastEvent>,
}

/// Manages all active event observers.
///
/// Thread-safe and designed for concurrent access from HTTP handlers and
/// domain services. Implements [`EventEmitter`] so services can publish
/// through the trait without knowing about subscriptions.
pub struct FanoutService {
    /// Active observers: observer_id -> ObserverEntry
    observers: DashMap<String, ObserverEntry>,
}

impl FanoutService {
    /// Creates a new fan-out service with no observers.
    pub fn new() -> Self {
        Self {
            observers: DashMap::new(),
        }
    }

    /// Registers a new observer and returns a handle for RAII cleanup.
    ///
    /// The observer immediately receives a [`SystemEvent::Info`] acknowledging
    /// the subscription. The returned `ObserverHandle` unregisters the
    /// observer when dropped.
    pub fn register(self: &Arc<Self>) -> ObserverHandle {
        let id = uuid::Uuid::new_v4().to_string();
        let (sender, receiver) = mpsc::unbounded_channel();

        // Ack before the entry is visible so it is always the first event seen.
        let _ = sender.send(BroadcastEvent::System(SystemEvent::Info {
            message: "connection established".to_string(),
            timestamp: now_millis(),
        }));

        self.observers.insert(id.clone(), ObserverEntry { sender });
        log::info!(
            "[Fanout] Observer registered: {} (total: {})",
            id,
            self.observers.len()
        );

        ObserverHandle {
            id,
            receiver,
            service: Arc::clone(self),
        }
    }

    /// Unregisters an observer by ID.
    fn unregister(&self, id: &str) {
        if self.observers.remove(id).is_some() {
            log::info!(
                "[Fanout] Observer unregistered: {} (remaining: {})",
                id,
                self.observers.len()
            );
        }
    }

    /// Returns the number of active observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Publishes an event to every registered observer.
    ///
    /// Observers whose channel has been closed are evicted; delivery to the
    /// remaining observers is unaffected. Returns the number of observers
    /// that received the event.
    pub fn publish(&self, event: BroadcastEvent) -> usize {
        let mut delivered = 0;
        let mut dead: Vec<String> = Vec::new();

        for entry in self.observers.iter() {
            if entry.value().sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(entry.key().clone());
            }
        }

        // Removal happens after iteration; removing under an iter guard
        // would deadlock the shard.
        for id in dead {
            log::warn!("[Fanout] Evicting dead observer: {}", id);
            self.unregister(&id);
        }

        delivered
    }
}

impl Default for FanoutService {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEmitter for FanoutService {
    fn emit_device(&self, event: DeviceEvent) {
        self.publish(event.into());
    }

    fn emit_item(&self, event: ItemEvent) {
        self.publish(event.into());
    }

    fn emit_project(&self, event: ProjectEvent) {
        self.publish(event.into());
    }

    fn emit_system(&self, event: SystemEvent) {
        self.publish(event.into());
    }
}

/// RAII handle that unregisters an observer when dropped.
///
/// This ensures observers are always cleaned up, even if the subscription
/// handler panics or exits early.
pub struct ObserverHandle {
    id: String,
    receiver: mpsc::UnboundedReceiver<BroadcastEvent>,
    service: Arc<FanoutService>,
}

impl ObserverHandle {
    /// Returns the observer ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Receives the next event, or `None` if the service dropped the sender.
    pub async fn recv(&mut self) -> Option<BroadcastEvent> {
        self.receiver.recv().await
    }

    /// Non-blocking receive, for draining in tests.
    pub fn try_recv(&mut self) -> Option<BroadcastEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.service.unregister(&self.id);
    }
}
