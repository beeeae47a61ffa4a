//! Holder for the currently loaded project.
//!
//! Exactly one project can be current at a time. [`ProjectRuntime`] owns the
//! `Option<Project>` behind an `RwLock`, assembles the tree from a
//! [`ProjectSource`] on load, and exposes the narrow mutations the
//! orchestrator needs (playback tags, template payload merges).

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::model::{
    EventBehavior, ItemBehavior, ItemKind, ItemSpec, PlacedItem, PlaybackState, Project, Row,
    TimelineEvent, Transition,
};
use super::source::{ClipRecord, EventRecord, ProjectSource, TemplateRecord};
use crate::error::{ControlError, ControlResult};

/// Result of a load request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The project was fetched and became current.
    Loaded,
    /// The requested project was already current; nothing happened.
    AlreadyLoaded,
}

/// Owns the current project and its assembly from stored records.
pub struct ProjectRuntime {
    source: Arc<dyn ProjectSource>,
    current: RwLock<Option<Project>>,
}

impl ProjectRuntime {
    /// Creates a runtime with no project loaded.
    pub fn new(source: Arc<dyn ProjectSource>) -> Self {
        Self {
            source,
            current: RwLock::new(None),
        }
    }

    /// Loads a project by id and makes it current.
    ///
    /// Loading the already-current id is an idempotent no-op. Loading a
    /// different id while one is current fails with `ProjectAlreadyLoaded`;
    /// the client must unload first.
    ///
    /// Records are fetched and the tree assembled without holding the lock,
    /// then the result is installed under a short write section. If a
    /// concurrent load won the race, the first writer wins.
    pub async fn load(&self, project_id: &str) -> ControlResult<LoadOutcome> {
        if let Some(outcome) = self.check_current(project_id)? {
            return Ok(outcome);
        }

        let project = self.assemble(project_id).await?;

        let mut guard = self.current.write();
        match guard.as_ref() {
            Some(current) if current.id == project_id => Ok(LoadOutcome::AlreadyLoaded),
            Some(current) => Err(ControlError::ProjectAlreadyLoaded(current.id.clone())),
            None => {
                log::info!(
                    "[Project] Loaded '{}' ({} events)",
                    project.name,
                    project.events.len()
                );
                *guard = Some(project);
                Ok(LoadOutcome::Loaded)
            }
        }
    }

    fn check_current(&self, project_id: &str) -> ControlResult<Option<LoadOutcome>> {
        match self.current.read().as_ref() {
            Some(current) if current.id == project_id => Ok(Some(LoadOutcome::AlreadyLoaded)),
            Some(current) => Err(ControlError::ProjectAlreadyLoaded(current.id.clone())),
            None => Ok(None),
        }
    }

    async fn assemble(&self, project_id: &str) -> ControlResult<Project> {
        let record = self
            .source
            .find_project_by_id(project_id)
            .await
            .map_err(|err| match err {
                super::source::SourceError::UnknownProject(id) => {
                    ControlError::ProjectNotFound(id)
                }
                other => other.into(),
            })?;
        let mut event_records = self.source.find_events_by_project(project_id).await?;
        event_records.sort_by_key(|e| e.event_order);

        let mut events = Vec::with_capacity(event_records.len());
        for event_record in event_records {
            let clips = self.source.find_clips_by_event(&event_record.id).await?;
            let templates = self
                .source
                .find_templates_by_event(&event_record.id)
                .await?;
            events.push(build_event(event_record, clips, templates));
        }

        Ok(Project {
            id: record.id,
            name: record.name,
            description: record.description,
            events,
        })
    }

    /// Clears the current project. Returns the id that was cleared, if any.
    pub fn clear(&self) -> Option<String> {
        let cleared = self.current.write().take().map(|p| p.id);
        if let Some(id) = &cleared {
            log::info!("[Project] Unloaded '{}'", id);
        }
        cleared
    }

    /// Whether a project is currently loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// The id of the current project, if any.
    #[must_use]
    pub fn current_id(&self) -> Option<String> {
        self.current.read().as_ref().map(|p| p.id.clone())
    }

    /// A deep snapshot of the current project for API responses.
    #[must_use]
    pub fn snapshot(&self) -> Option<Project> {
        self.current.read().clone()
    }

    /// Clones an item's spec out of the tree for dispatch.
    pub fn item_spec(&self, item_id: &str) -> ControlResult<ItemSpec> {
        let guard = self.current.read();
        let project = guard.as_ref().ok_or(ControlError::NoProjectLoaded)?;
        project
            .item(item_id)
            .map(|item| item.spec.clone())
            .ok_or_else(|| ControlError::ItemNotFound(item_id.to_string()))
    }

    /// Sets an item's confirmed playback tag.
    pub fn set_playback(&self, item_id: &str, state: PlaybackState) -> ControlResult<()> {
        let mut guard = self.current.write();
        let project = guard.as_mut().ok_or(ControlError::NoProjectLoaded)?;
        if project.set_playback(item_id, state) {
            Ok(())
        } else {
            Err(ControlError::ItemNotFound(item_id.to_string()))
        }
    }

    /// Merges key/value data into a template item's payload.
    pub fn merge_template_payload(
        &self,
        item_id: &str,
        data: &serde_json::Map<String, serde_json::Value>,
    ) -> ControlResult<()> {
        let mut guard = self.current.write();
        let project = guard.as_mut().ok_or(ControlError::NoProjectLoaded)?;
        let item = project
            .item_mut(item_id)
            .ok_or_else(|| ControlError::ItemNotFound(item_id.to_string()))?;
        match &mut item.spec.kind {
            ItemKind::Template { payload, .. } => {
                for (key, value) in data {
                    payload.insert(key.clone(), value.clone());
                }
                Ok(())
            }
            ItemKind::Clip { .. } => Err(ControlError::NotATemplate(item_id.to_string())),
        }
    }

    /// IDs of all items currently playing.
    #[must_use]
    pub fn playing_items(&self) -> Vec<String> {
        self.current
            .read()
            .as_ref()
            .map(|p| p.playing_item_ids())
            .unwrap_or_default()
    }

    /// Whether any item in the current project is playing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.current
            .read()
            .as_ref()
            .map(|p| p.is_playing())
            .unwrap_or(false)
    }
}

fn build_event(
    record: EventRecord,
    clips: Vec<ClipRecord>,
    templates: Vec<TemplateRecord>,
) -> TimelineEvent {
    let behavior = match record.behavior.as_deref() {
        Some("linear") => EventBehavior::Linear,
        Some("sequential") => EventBehavior::Sequential,
        _ => EventBehavior::Parallel,
    };

    let mut rows: BTreeMap<u32, Row> = BTreeMap::new();

    for clip in clips {
        let transition = clip.transition_type.map(|kind| Transition {
            kind,
            duration_frames: clip.transition_duration.unwrap_or(0),
        });
        let spec = ItemSpec {
            id: clip.id.clone(),
            name: clip.name,
            device_id: clip.device_id,
            channel: clip.channel,
            layer: clip.layer,
            kind: ItemKind::Clip {
                media: clip.media,
                loop_media: clip.loop_media,
                transition,
            },
        };
        let behavior = ItemBehavior {
            delay_ms: clip.delay_ms,
            compatibility: None,
        };
        rows.entry(clip.position_row)
            .or_default()
            .items
            .insert(clip.id, PlacedItem::new(spec, behavior));
    }

    for template in templates {
        let spec = ItemSpec {
            id: template.id.clone(),
            name: template.name,
            device_id: template.device_id,
            channel: template.channel,
            layer: template.layer,
            kind: ItemKind::Template {
                template: template.template,
                duration_ms: template.duration_ms,
                payload: template.keyvalue,
            },
        };
        let behavior = ItemBehavior {
            delay_ms: template.delay_ms,
            compatibility: None,
        };
        rows.entry(template.position_row)
            .or_default()
            .items
            .insert(template.id, PlacedItem::new(spec, behavior));
    }

    TimelineEvent {
        id: record.id,
        name: record.name,
        behavior,
        rows,
    }
}
