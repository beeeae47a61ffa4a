//! Playback orchestration.
//!
//! [`PlaybackOrchestrator`] is the service behind every control operation:
//! it resolves items against the current project, dispatches commands through
//! device sessions, and updates the model only with confirmed outcomes.
//!
//! Commands for the same item are serialized through a per-item lock; the
//! lock is held across dispatch, model update, and notification, so observers
//! always see state changes in command order. Different items proceed in
//! parallel.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::device::registry::{DeviceFailure, DeviceRegistry};
use crate::device::session::DeviceSession;
use crate::error::{ControlError, ControlResult};
use crate::events::{EventEmitter, ItemEvent, ItemType, ProjectEvent};
use crate::project::model::{ItemKind, ItemSpec, PlaybackState};
use crate::project::runtime::{LoadOutcome, ProjectRuntime};
use crate::utils::now_millis;

/// One failed item in a bulk operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub item_id: String,
    pub error: String,
}

/// Coordinates project state, device sessions, and event notification.
pub struct PlaybackOrchestrator {
    runtime: Arc<ProjectRuntime>,
    registry: Arc<DeviceRegistry>,
    emitter: Arc<dyn EventEmitter>,
    /// Per-item command serialization.
    item_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PlaybackOrchestrator {
    pub fn new(
        runtime: Arc<ProjectRuntime>,
        registry: Arc<DeviceRegistry>,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            runtime,
            registry,
            emitter,
            item_locks: DashMap::new(),
        }
    }

    fn item_lock(&self, item_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            &self
                .item_locks
                .entry(item_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Resolves an item to its spec and session. Resolution failures leave
    /// the model and observers untouched.
    fn resolve(&self, item_id: &str) -> ControlResult<(ItemSpec, Arc<DeviceSession>)> {
        let spec = self.runtime.item_spec(item_id)?;
        let device_id = spec
            .device_id
            .clone()
            .ok_or_else(|| ControlError::DeviceNotFound(format!("unassigned for item {item_id}")))?;
        let session = self.registry.ensure(&device_id)?;
        Ok((spec, session))
    }

    fn confirm(&self, item_id: &str, item_type: ItemType, state: PlaybackState) {
        // The item can only vanish through unload, which holds no item locks;
        // a failed tag write at that point has nothing left to notify about.
        if self.runtime.set_playback(item_id, state.clone()).is_err() {
            return;
        }
        self.emitter.emit_item(ItemEvent::StateChanged {
            item_id: item_id.to_string(),
            item_type,
            state,
            timestamp: now_millis(),
        });
        if let Some(project_id) = self.runtime.current_id() {
            self.emitter.emit_project(ProjectEvent::StateChanged {
                project_id,
                is_playing: self.runtime.is_playing(),
                timestamp: now_millis(),
            });
        }
    }

    /// Starts playback of an item.
    ///
    /// The playback tag moves to `playing` only after the device confirms.
    /// On a dispatch failure the tag moves to `error`, the notification goes
    /// out, and the error is returned to the caller.
    pub async fn play(&self, item_id: &str) -> ControlResult<()> {
        let lock = self.item_lock(item_id);
        let _guard = lock.lock().await;

        let (spec, session) = self.resolve(item_id)?;
        let item_type = type_of(&spec.kind);

        let result = match &spec.kind {
            ItemKind::Clip {
                media,
                loop_media,
                transition,
            } => {
                session
                    .play_media(
                        spec.channel,
                        spec.layer,
                        media,
                        *loop_media,
                        transition
                            .as_ref()
                            .map(|t| (t.kind.clone(), t.duration_frames)),
                    )
                    .await
            }
            ItemKind::Template {
                template, payload, ..
            } => {
                let data = serde_json::to_string(payload)
                    .map_err(|e| ControlError::Internal(format!("template payload: {e}")))?;
                session
                    .add_template(spec.channel, spec.layer, template, &data, true)
                    .await
            }
        };

        match result {
            Ok(_) => {
                log::info!("[Playout] Playing '{}'", item_id);
                self.confirm(item_id, item_type, PlaybackState::Playing);
                Ok(())
            }
            Err(err) => {
                self.confirm(
                    item_id,
                    item_type,
                    PlaybackState::Error {
                        message: err.to_string(),
                    },
                );
                Err(err)
            }
        }
    }

    /// Stops playback of an item.
    pub async fn stop(&self, item_id: &str) -> ControlResult<()> {
        let lock = self.item_lock(item_id);
        let _guard = lock.lock().await;

        let (spec, session) = self.resolve(item_id)?;
        let item_type = type_of(&spec.kind);

        let result = match &spec.kind {
            ItemKind::Clip { .. } => session.stop_media(spec.channel, spec.layer).await,
            ItemKind::Template { .. } => session.stop_template(spec.channel, spec.layer).await,
        };

        match result {
            Ok(_) => {
                log::info!("[Playout] Stopped '{}'", item_id);
                self.confirm(item_id, item_type, PlaybackState::Stopped);
                Ok(())
            }
            Err(err) => {
                self.confirm(
                    item_id,
                    item_type,
                    PlaybackState::Error {
                        message: err.to_string(),
                    },
                );
                Err(err)
            }
        }
    }

    /// Pushes new key/value data into a playing template.
    ///
    /// Each call produces exactly one device command; repeated updates are
    /// never coalesced. The playback tag is not touched, success or failure.
    pub async fn update_template_data(
        &self,
        item_id: &str,
        data: serde_json::Map<String, serde_json::Value>,
    ) -> ControlResult<()> {
        let lock = self.item_lock(item_id);
        let _guard = lock.lock().await;

        let (spec, session) = self.resolve(item_id)?;
        if !matches!(spec.kind, ItemKind::Template { .. }) {
            return Err(ControlError::NotATemplate(item_id.to_string()));
        }

        let payload = serde_json::to_string(&data)
            .map_err(|e| ControlError::InvalidRequest(format!("bad template data: {e}")))?;
        session
            .update_template(spec.channel, spec.layer, &payload)
            .await?;

        self.runtime.merge_template_payload(item_id, &data)?;
        self.emitter.emit_item(ItemEvent::DataUpdated {
            item_id: item_id.to_string(),
            data,
            timestamp: now_millis(),
        });
        Ok(())
    }

    /// Loads a project and makes it current.
    ///
    /// Loading the already-current project is a no-op and emits nothing.
    pub async fn load_project(&self, project_id: &str) -> ControlResult<LoadOutcome> {
        let outcome = self.runtime.load(project_id).await?;
        if outcome == LoadOutcome::Loaded {
            if let Some(project) = self.runtime.snapshot() {
                self.emitter.emit_project(ProjectEvent::Loaded {
                    project_id: project.id,
                    name: project.name,
                    timestamp: now_millis(),
                });
            }
        }
        Ok(outcome)
    }

    /// Unloads the current project.
    ///
    /// Every playing item gets a best-effort stop first; stop failures are
    /// collected and returned, and never abort the unload.
    pub async fn unload_project(&self, project_id: &str) -> ControlResult<Vec<ItemFailure>> {
        match self.runtime.current_id() {
            Some(current) if current == project_id => {}
            _ => return Err(ControlError::ProjectNotFound(project_id.to_string())),
        }

        let mut failures = Vec::new();
        for item_id in self.runtime.playing_items() {
            if let Err(err) = self.stop(&item_id).await {
                log::warn!("[Playout] Stop during unload failed for '{}': {}", item_id, err);
                failures.push(ItemFailure {
                    item_id,
                    error: err.to_string(),
                });
            }
        }

        self.runtime.clear();
        self.item_locks.clear();
        self.emitter.emit_project(ProjectEvent::Unloaded {
            project_id: project_id.to_string(),
            timestamp: now_millis(),
        });
        Ok(failures)
    }

    /// Connects one device.
    pub async fn connect_device(&self, device_id: &str) -> ControlResult<()> {
        self.registry.ensure(device_id)?.connect().await
    }

    /// Disconnects one device.
    pub async fn disconnect_device(&self, device_id: &str) -> ControlResult<()> {
        self.registry.ensure(device_id)?.disconnect().await
    }

    /// Connects every configured device, collecting failures.
    pub async fn connect_all_devices(&self) -> Vec<DeviceFailure> {
        self.registry.connect_all().await
    }

    /// Disconnects every materialized device session, collecting failures.
    pub async fn disconnect_all_devices(&self) -> Vec<DeviceFailure> {
        self.registry.disconnect_all().await
    }
}

fn type_of(kind: &ItemKind) -> ItemType {
    match kind {
        ItemKind::Clip { .. } => ItemType::Clip,
        ItemKind::Template { .. } => ItemType::Template,
    }
}
