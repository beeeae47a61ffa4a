//! Device domain: the transport seam, per-device command sessions, and the
//! registry that materializes sessions from configuration.

pub mod registry;
pub mod session;
pub mod transport;

pub use registry::{DeviceFailure, DeviceRegistry, DeviceSnapshot};
pub use session::{ConnectionState, DeviceSession};
pub use transport::{
    DeviceCommand, DeviceReply, DeviceTransport, TcpTransport, TcpTransportFactory,
    TransportError, TransportFactory, TransportResult,
};
