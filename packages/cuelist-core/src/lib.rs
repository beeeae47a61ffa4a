//! Cuelist Core - shared library for the Cuelist playout control plane.
//!
//! This crate provides the runtime control plane for broadcast playout:
//! an in-memory project/timeline model, per-device command sessions with an
//! explicit connection state machine, and real-time event fan-out to
//! connected clients. It is designed to be used by both a standalone
//! headless server and embedders that wire their own transport.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`events`]: Event system for real-time client communication
//! - [`device`]: Device transport, sessions, and the registry
//! - [`project`]: Timeline model, persistence seam, current-project holder
//! - [`orchestrator`]: Playback coordination across model and devices
//! - [`api`]: HTTP/SSE surface
//! - [`state`]: Core configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The crate defines several traits to decouple core logic from
//! platform-specific implementations:
//!
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events
//! - [`DeviceTransport`](device::DeviceTransport): Device wire protocol
//! - [`ProjectSource`](project::ProjectSource): Project persistence
//!
//! Each trait has a default implementation suitable for the standalone
//! server; tests and embedders provide their own.

#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod device;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod project;
pub mod state;
pub mod utils;

// Re-export commonly used types at the crate root
pub use bootstrap::{bootstrap_services, bootstrap_services_with_factory, BootstrappedServices};
pub use error::{ControlError, ControlResult};
pub use events::{
    BroadcastEvent, DeviceEvent, EventEmitter, FanoutService, ItemEvent, ItemType, LogLevel,
    NoopEventEmitter, ObserverHandle, ProjectEvent, SystemEvent,
};
pub use state::{Config, DeviceConfig};
pub use utils::now_millis;

// Re-export device types
pub use device::{
    ConnectionState, DeviceRegistry, DeviceSession, DeviceTransport, TransportFactory,
};

// Re-export project types
pub use project::{ItemKind, PlaybackState, Project, ProjectRuntime, ProjectSource};

// Re-export orchestration types
pub use orchestrator::{ItemFailure, PlaybackOrchestrator};

// Re-export API types
pub use api::{start_server, AppState, ServerError};
