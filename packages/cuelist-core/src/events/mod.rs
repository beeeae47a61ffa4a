//! Event system for real-time client communication.
//!
//! This module provides:
//! - [`EventEmitter`] trait for domain services to emit events
//! - [`FanoutService`] for delivering events to subscribed observers
//! - Event types for the various domains (devices, items, projects, system)
//!
//! Every event serializes to a flat `{"type": ..., "data": ...}` envelope so
//! clients can switch on a single `type` field regardless of category.

mod emitter;
mod fanout;

pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};
pub use fanout::{FanoutService, ObserverHandle};

use serde::Serialize;

use crate::device::session::ConnectionState;
use crate::project::model::PlaybackState;

/// Events broadcast to clients.
///
/// The enum is untagged: each inner category already carries the
/// `{"type", "data"}` envelope, so the category never appears on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BroadcastEvent {
    /// Events from playout device sessions.
    Device(DeviceEvent),

    /// Events related to timeline item playback.
    Item(ItemEvent),

    /// Events related to project lifecycle.
    Project(ProjectEvent),

    /// Housekeeping events (subscription acks, notices).
    System(SystemEvent),
}

/// Kind of timeline item, carried in item events so clients can route
/// without re-resolving the project tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemType {
    /// Media clip played on a channel/layer.
    Clip,
    /// Graphic template rendered on a channel/layer.
    Template,
}

/// Severity of a device log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Events from playout device sessions.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum DeviceEvent {
    /// A device connection state transition.
    #[serde(rename = "deviceStateChanged")]
    StateChanged {
        /// The device identifier.
        #[serde(rename = "deviceId")]
        device_id: String,
        /// The new connection state.
        state: ConnectionState,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A log line produced by a device session (command outcomes, faults).
    #[serde(rename = "deviceLog")]
    Log {
        /// The device identifier.
        #[serde(rename = "deviceId")]
        device_id: String,
        /// Severity of the line.
        level: LogLevel,
        /// Human-readable message.
        message: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Events related to timeline item playback.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ItemEvent {
    /// An item's confirmed playback state changed.
    #[serde(rename = "itemStateChanged")]
    StateChanged {
        /// The item identifier.
        #[serde(rename = "itemId")]
        item_id: String,
        /// The kind of item.
        #[serde(rename = "itemType")]
        item_type: ItemType,
        /// The new playback state.
        state: PlaybackState,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A template item's dynamic data was updated on the device.
    #[serde(rename = "itemDataUpdated")]
    DataUpdated {
        /// The item identifier.
        #[serde(rename = "itemId")]
        item_id: String,
        /// The key/value payload that was sent to the device.
        data: serde_json::Map<String, serde_json::Value>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Events related to project lifecycle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ProjectEvent {
    /// A project became the current project.
    #[serde(rename = "projectLoaded")]
    Loaded {
        /// The project identifier.
        #[serde(rename = "projectId")]
        project_id: String,
        /// The project name.
        name: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The current project was cleared.
    #[serde(rename = "projectUnloaded")]
    Unloaded {
        /// The project identifier.
        #[serde(rename = "projectId")]
        project_id: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Aggregate playback activity changed (something started or everything stopped).
    #[serde(rename = "projectStateChanged")]
    StateChanged {
        /// The project identifier.
        #[serde(rename = "projectId")]
        project_id: String,
        /// Whether any item is currently playing.
        #[serde(rename = "isPlaying")]
        is_playing: bool,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Housekeeping events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum SystemEvent {
    /// Informational notice (e.g. subscription acknowledgement).
    #[serde(rename = "systemInfo")]
    Info {
        /// Human-readable message.
        message: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

// From implementations for converting inner events to BroadcastEvent
impl From<DeviceEvent> for BroadcastEvent {
    fn from(event: DeviceEvent) -> Self {
        BroadcastEvent::Device(event)
    }
}

impl From<ItemEvent> for BroadcastEvent {
    fn from(event: ItemEvent) -> Self {
        BroadcastEvent::Item(event)
    }
}

impl From<ProjectEvent> for BroadcastEvent {
    fn from(event: ProjectEvent) -> Self {
        BroadcastEvent::Project(event)
    }
}

impl From<SystemEvent> for BroadcastEvent {
    fn from(event: SystemEvent) -> Self {
        BroadcastEvent::System(event)
    }
}
