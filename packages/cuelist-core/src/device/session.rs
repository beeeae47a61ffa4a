//! Per-device command session with an explicit connection state machine.
//!
//! A [`DeviceSession`] wraps one transport and tracks the confirmed
//! connection state: `disconnected`, `connecting`, `connected`,
//! `disconnecting`, or `error`. Every transition is emitted as a
//! [`DeviceEvent::StateChanged`]; command outcomes are emitted as
//! [`DeviceEvent::Log`] lines.
//!
//! There is no automatic reconnection. A session in the error state stays
//! there until an explicit `connect()` moves it back through `connecting`.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;

use super::transport::{DeviceCommand, DeviceReply, DeviceTransport};
use crate::error::{ControlError, ControlResult};
use crate::events::{DeviceEvent, EventEmitter, LogLevel};
use crate::state::DeviceConfig;
use crate::utils::now_millis;

/// Connection state of a device session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ConnectionState {
    /// No connection, none in progress.
    #[default]
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The transport is established.
    Connected,
    /// A disconnect is in flight.
    Disconnecting,
    /// The last connect or exchange failed.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl ConnectionState {
    /// Whether commands may be dispatched in this state.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// One playout device: transport plus state machine plus event emission.
pub struct DeviceSession {
    config: DeviceConfig,
    transport: Arc<dyn DeviceTransport>,
    emitter: Arc<dyn EventEmitter>,
    state: RwLock<ConnectionState>,
    /// Serializes connect/disconnect/command dispatch per device.
    op_lock: Mutex<()>,
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    /// Creates a session in the disconnected state.
    pub fn new(
        config: DeviceConfig,
        transport: Arc<dyn DeviceTransport>,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            config,
            transport,
            emitter,
            state: RwLock::new(ConnectionState::Disconnected),
            op_lock: Mutex::new(()),
        }
    }

    /// The device id this session serves.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// The device configuration.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.read().clone()
    }

    fn set_state(&self, next: ConnectionState) {
        {
            let mut guard = self.state.write();
            if *guard == next {
                return;
            }
            *guard = next.clone();
        }
        self.emitter.emit_device(DeviceEvent::StateChanged {
            device_id: self.config.id.clone(),
            state: next,
            timestamp: now_millis(),
        });
    }

    fn emit_log(&self, level: LogLevel, message: String) {
        self.emitter.emit_device(DeviceEvent::Log {
            device_id: self.config.id.clone(),
            level,
            message,
            timestamp: now_millis(),
        });
    }

    /// Connects the device.
    ///
    /// Idempotent: calling on an already-connected session does nothing and
    /// emits nothing. On failure the session lands in the error state and
    /// the error is returned.
    pub async fn connect(&self) -> ControlResult<()> {
        let _guard = self.op_lock.lock().await;

        if self.state().is_connected() {
            return Ok(());
        }

        self.set_state(ConnectionState::Connecting);
        log::info!("[Device] Connecting to '{}'", self.config.id);

        match self.transport.connect().await {
            Ok(()) => {
                self.set_state(ConnectionState::Connected);
                self.emit_log(
                    LogLevel::Info,
                    format!("connected to {}:{}", self.config.host, self.config.port),
                );
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                log::warn!("[Device] Connect failed for '{}': {}", self.config.id, message);
                self.set_state(ConnectionState::Error {
                    message: message.clone(),
                });
                self.emit_log(LogLevel::Error, format!("connect failed: {message}"));
                Err(ControlError::DeviceConnection(message))
            }
        }
    }

    /// Disconnects the device.
    ///
    /// A no-op when already disconnected. Always lands in the disconnected
    /// state, even from error.
    pub async fn disconnect(&self) -> ControlResult<()> {
        let _guard = self.op_lock.lock().await;

        if matches!(self.state(), ConnectionState::Disconnected) {
            return Ok(());
        }

        self.set_state(ConnectionState::Disconnecting);
        let result = self.transport.disconnect().await;
        self.set_state(ConnectionState::Disconnected);
        log::info!("[Device] Disconnected '{}'", self.config.id);

        result.map_err(|err| ControlError::DeviceConnection(err.to_string()))
    }

    /// Sends one command and returns the device's reply.
    ///
    /// Fails fast with `DeviceNotConnected` before touching the transport if
    /// the session is not connected. A rejected command (4xx/5xx reply) is a
    /// `DeviceCommand` error; a transport fault moves the session to the
    /// error state.
    pub async fn execute(&self, command: DeviceCommand) -> ControlResult<DeviceReply> {
        if !self.state().is_connected() {
            return Err(ControlError::DeviceNotConnected(self.config.id.clone()));
        }

        let _guard = self.op_lock.lock().await;

        // Re-check after acquiring: a disconnect may have slipped in.
        if !self.state().is_connected() {
            return Err(ControlError::DeviceNotConnected(self.config.id.clone()));
        }

        log::debug!("[Device] '{}' <- {}", self.config.id, command.to_line());

        match self.transport.send(&command).await {
            Ok(reply) if reply.is_error() => {
                let message = format!("{} rejected: {} {}", command.name(), reply.code, reply.text);
                self.emit_log(LogLevel::Error, message.clone());
                Err(ControlError::DeviceCommand(message))
            }
            Ok(reply) => {
                self.emit_log(
                    LogLevel::Info,
                    format!("{} ok: {}", command.name(), reply.code),
                );
                Ok(reply)
            }
            Err(err) => {
                let message = err.to_string();
                log::warn!(
                    "[Device] Transport fault on '{}' during {}: {}",
                    self.config.id,
                    command.name(),
                    message
                );
                self.set_state(ConnectionState::Error {
                    message: message.clone(),
                });
                self.emit_log(LogLevel::Error, format!("{} failed: {message}", command.name()));
                Err(ControlError::DeviceConnection(message))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Command wrappers
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts playing a media clip on a channel/layer.
    pub async fn play_media(
        &self,
        channel: u16,
        layer: u16,
        media: &str,
        loop_media: bool,
        transition: Option<(String, u32)>,
    ) -> ControlResult<DeviceReply> {
        self.execute(DeviceCommand::PlayMedia {
            channel,
            layer,
            media: media.to_string(),
            loop_media,
            transition,
        })
        .await
    }

    /// Stops whatever is playing on a channel/layer.
    pub async fn stop_media(&self, channel: u16, layer: u16) -> ControlResult<DeviceReply> {
        self.execute(DeviceCommand::StopMedia { channel, layer }).await
    }

    /// Adds a graphic template to a channel/layer.
    pub async fn add_template(
        &self,
        channel: u16,
        layer: u16,
        template: &str,
        data: &str,
        auto_play: bool,
    ) -> ControlResult<DeviceReply> {
        self.execute(DeviceCommand::AddTemplate {
            channel,
            layer,
            template: template.to_string(),
            data: data.to_string(),
            auto_play,
        })
        .await
    }

    /// Pushes new data into the live template on a channel/layer.
    pub async fn update_template(
        &self,
        channel: u16,
        layer: u16,
        data: &str,
    ) -> ControlResult<DeviceReply> {
        self.execute(DeviceCommand::UpdateTemplate {
            channel,
            layer,
            data: data.to_string(),
        })
        .await
    }

    /// Stops and removes the template on a channel/layer.
    pub async fn stop_template(&self, channel: u16, layer: u16) -> ControlResult<DeviceReply> {
        self.execute(DeviceCommand::StopTemplate { channel, layer }).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::device::transport::{TransportError, TransportResult};
    use crate::events::NoopEventEmitter;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scriptable transport: counts calls, replays queued send results.
    pub(crate) struct MockTransport {
        pub connect_calls: AtomicUsize,
        pub send_calls: AtomicUsize,
        pub connect_result: parking_lot::Mutex<TransportResult<()>>,
        pub send_results: parking_lot::Mutex<Vec<TransportResult<DeviceReply>>>,
        pub sent: parking_lot::Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub(crate) fn ok() -> Self {
            Self {
                connect_calls: AtomicUsize::new(0),
                send_calls: AtomicUsize::new(0),
                connect_result: parking_lot::Mutex::new(Ok(())),
                send_results: parking_lot::Mutex::new(Vec::new()),
                sent: parking_lot::Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing_connect(message: &str) -> Self {
            let mock = Self::ok();
            *mock.connect_result.lock() = Err(TransportError::Connect(message.to_string()));
            mock
        }

        pub(crate) fn queue_reply(&self, code: u16, text: &str) {
            self.send_results.lock().push(Ok(DeviceReply {
                code,
                text: text.to_string(),
            }));
        }

        pub(crate) fn queue_fault(&self) {
            self.send_results
                .lock()
                .push(Err(TransportError::Io("broken pipe".to_string())));
        }
    }

    #[async_trait]
    impl DeviceTransport for MockTransport {
        async fn connect(&self) -> TransportResult<()> {
            self.connect_calls.fetch_add(1, Ordering::SeqCst);
            match &*self.connect_result.lock() {
                Ok(()) => Ok(()),
                Err(TransportError::Connect(m)) => Err(TransportError::Connect(m.clone())),
                Err(_) => Err(TransportError::Connect("unexpected".to_string())),
            }
        }

        async fn disconnect(&self) -> TransportResult<()> {
            Ok(())
        }

        async fn send(&self, command: &DeviceCommand) -> TransportResult<DeviceReply> {
            self.send_calls.fetch_add(1, Ordering::SeqCst);
            self.sent.lock().push(command.to_line());
            let mut results = self.send_results.lock();
            if results.is_empty() {
                Ok(DeviceReply {
                    code: 202,
                    text: "OK".to_string(),
                })
            } else {
                results.remove(0)
            }
        }
    }

    pub(crate) fn test_config(id: &str) -> DeviceConfig {
        DeviceConfig {
            id: id.to_string(),
            name: format!("Device {id}"),
            host: "127.0.0.1".to_string(),
            port: 5250,
            enabled: true,
        }
    }

    fn session_with(transport: Arc<MockTransport>) -> DeviceSession {
        DeviceSession::new(test_config("main"), transport, Arc::new(NoopEventEmitter))
    }

    fn stop_command() -> DeviceCommand {
        DeviceCommand::StopMedia {
            channel: 1,
            layer: 10,
        }
    }

    #[tokio::test]
    async fn connect_transitions_to_connected() {
        let transport = Arc::new(MockTransport::ok());
        let session = session_with(Arc::clone(&transport));

        assert_eq!(session.state(), ConnectionState::Disconnected);
        session.connect().await.unwrap();
        assert_eq!(session.state(), ConnectionState::Connected);
        assert_eq!(transport.connect_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connect_is_idempotent_when_connected() {
        let transport = Arc::new(MockTransport::ok());
        let session = session_with(Arc::clone(&transport));

        session.connect().await.unwrap();
        session.connect().await.unwrap();
        assert_eq!(transport.connect_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_connect_lands_in_error_state() {
        let transport = Arc::new(MockTransport::failing_connect("refused"));
        let session = session_with(transport);

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, ControlError::DeviceConnection(_)));
        assert!(matches!(session.state(), ConnectionState::Error { .. }));
    }

    #[tokio::test]
    async fn reconnect_after_error_goes_through_connecting() {
        let transport = Arc::new(MockTransport::failing_connect("refused"));
        let session = session_with(Arc::clone(&transport));
        session.connect().await.unwrap_err();

        *transport.connect_result.lock() = Ok(());
        session.connect().await.unwrap();
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn execute_fails_fast_when_not_connected() {
        let transport = Arc::new(MockTransport::ok());
        let session = session_with(Arc::clone(&transport));

        let err = session.execute(stop_command()).await.unwrap_err();
        assert!(matches!(err, ControlError::DeviceNotConnected(_)));
        // No transport traffic at all.
        assert_eq!(transport.send_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_command_keeps_session_connected() {
        let transport = Arc::new(MockTransport::ok());
        transport.queue_reply(404, "ERROR");
        let session = session_with(Arc::clone(&transport));
        session.connect().await.unwrap();

        let err = session.execute(stop_command()).await.unwrap_err();
        assert!(matches!(err, ControlError::DeviceCommand(_)));
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn transport_fault_moves_session_to_error() {
        let transport = Arc::new(MockTransport::ok());
        transport.queue_fault();
        let session = session_with(Arc::clone(&transport));
        session.connect().await.unwrap();

        let err = session.execute(stop_command()).await.unwrap_err();
        assert!(matches!(err, ControlError::DeviceConnection(_)));
        assert!(matches!(session.state(), ConnectionState::Error { .. }));
    }

    #[tokio::test]
    async fn disconnect_is_noop_when_disconnected() {
        let session = session_with(Arc::new(MockTransport::ok()));
        session.disconnect().await.unwrap();
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn state_changes_are_emitted() {
        use crate::events::{ItemEvent, ProjectEvent, SystemEvent};

        struct RecordingEmitter {
            states: parking_lot::Mutex<Vec<ConnectionState>>,
        }

        impl EventEmitter for RecordingEmitter {
            fn emit_device(&self, event: DeviceEvent) {
                if let DeviceEvent::StateChanged { state, .. } = event {
                    self.states.lock().push(state);
                }
            }
            fn emit_item(&self, _event: ItemEvent) {}
            fn emit_project(&self, _event: ProjectEvent) {}
            fn emit_system(&self, _event: SystemEvent) {}
        }

        let emitter = Arc::new(RecordingEmitter {
            states: parking_lot::Mutex::new(Vec::new()),
        });
        let session = DeviceSession::new(
            test_config("main"),
            Arc::new(MockTransport::ok()),
            Arc::clone(&emitter) as Arc<dyn EventEmitter>,
        );

        session.connect().await.unwrap();
        session.disconnect().await.unwrap();

        let states = emitter.states.lock().clone();
        assert_eq!(
            states,
            vec![
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Disconnecting,
                ConnectionState::Disconnected,
            ]
        );
    }
}
