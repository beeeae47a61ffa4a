//! JSON-file project source.
//!
//! The headless server reads its project library from a single JSON bundle so
//! it can run without a database. The bundle nests clips and templates under
//! their events; this module flattens it into the record shapes the core
//! expects.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cuelist_core::project::{
    ClipRecord, EventRecord, ProjectRecord, ProjectSource, SourceError, SourceResult,
    TemplateRecord,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Bundle {
    projects: Vec<ProjectBundle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectBundle {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    events: Vec<EventBundle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventBundle {
    id: String,
    name: String,
    #[serde(default)]
    event_order: u32,
    #[serde(default)]
    behavior: Option<String>,
    #[serde(default)]
    clips: Vec<ClipBundle>,
    #[serde(default)]
    templates: Vec<TemplateBundle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClipBundle {
    id: String,
    name: String,
    media: String,
    #[serde(default)]
    device_id: Option<String>,
    channel: u16,
    layer: u16,
    #[serde(default)]
    position_row: u32,
    #[serde(default)]
    loop_media: bool,
    #[serde(default)]
    transition_type: Option<String>,
    #[serde(default)]
    transition_duration: Option<u32>,
    #[serde(default)]
    delay_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateBundle {
    id: String,
    name: String,
    template: String,
    #[serde(default)]
    device_id: Option<String>,
    channel: u16,
    layer: u16,
    #[serde(default)]
    position_row: u32,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    keyvalue: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    delay_ms: u64,
}

/// Read-only [`ProjectSource`] backed by a JSON bundle file.
///
/// The file is parsed once at startup; lookups afterwards hit in-memory maps.
pub struct JsonProjectSource {
    projects: HashMap<String, ProjectRecord>,
    events: HashMap<String, Vec<EventRecord>>,
    clips: HashMap<String, Vec<ClipRecord>>,
    templates: HashMap<String, Vec<TemplateRecord>>,
}

impl JsonProjectSource {
    /// Parses the bundle at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project file: {}", path.display()))?;
        let bundle: Bundle = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse project file: {}", path.display()))?;
        Ok(Self::from_bundle(bundle))
    }

    /// An empty source: every project lookup fails.
    pub fn empty() -> Self {
        Self::from_bundle(Bundle {
            projects: Vec::new(),
        })
    }

    fn from_bundle(bundle: Bundle) -> Self {
        let mut projects = HashMap::new();
        let mut events: HashMap<String, Vec<EventRecord>> = HashMap::new();
        let mut clips: HashMap<String, Vec<ClipRecord>> = HashMap::new();
        let mut templates: HashMap<String, Vec<TemplateRecord>> = HashMap::new();

        for project in bundle.projects {
            let project_events = events.entry(project.id.clone()).or_default();
            for event in project.events {
                project_events.push(EventRecord {
                    id: event.id.clone(),
                    project_id: project.id.clone(),
                    name: event.name,
                    event_order: event.event_order,
                    behavior: event.behavior,
                });
                clips.insert(
                    event.id.clone(),
                    event
                        .clips
                        .into_iter()
                        .map(|c| ClipRecord {
                            id: c.id,
                            event_id: event.id.clone(),
                            name: c.name,
                            media: c.media,
                            device_id: c.device_id,
                            channel: c.channel,
                            layer: c.layer,
                            position_row: c.position_row,
                            loop_media: c.loop_media,
                            transition_type: c.transition_type,
                            transition_duration: c.transition_duration,
                            delay_ms: c.delay_ms,
                        })
                        .collect(),
                );
                templates.insert(
                    event.id.clone(),
                    event
                        .templates
                        .into_iter()
                        .map(|t| TemplateRecord {
                            id: t.id,
                            event_id: event.id.clone(),
                            name: t.name,
                            template: t.template,
                            device_id: t.device_id,
                            channel: t.channel,
                            layer: t.layer,
                            position_row: t.position_row,
                            duration_ms: t.duration_ms,
                            keyvalue: t.keyvalue,
                            delay_ms: t.delay_ms,
                        })
                        .collect(),
                );
            }
            projects.insert(
                project.id.clone(),
                ProjectRecord {
                    id: project.id,
                    name: project.name,
                    description: project.description,
                },
            );
        }

        Self {
            projects,
            events,
            clips,
            templates,
        }
    }
}

#[async_trait]
impl ProjectSource for JsonProjectSource {
    async fn find_project_by_id(&self, project_id: &str) -> SourceResult<ProjectRecord> {
        self.projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| SourceError::UnknownProject(project_id.to_string()))
    }

    async fn find_events_by_project(&self, project_id: &str) -> SourceResult<Vec<EventRecord>> {
        Ok(self.events.get(project_id).cloned().unwrap_or_default())
    }

    async fn find_clips_by_event(&self, event_id: &str) -> SourceResult<Vec<ClipRecord>> {
        Ok(self.clips.get(event_id).cloned().unwrap_or_default())
    }

    async fn find_templates_by_event(&self, event_id: &str) -> SourceResult<Vec<TemplateRecord>> {
        Ok(self.templates.get(event_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BUNDLE: &str = r#"{
        "projects": [
            {
                "id": "show-a",
                "name": "Show A",
                "events": [
                    {
                        "id": "ev-1",
                        "name": "Opener",
                        "eventOrder": 0,
                        "clips": [
                            {
                                "id": "clip-1",
                                "name": "Ambience",
                                "media": "AMB",
                                "deviceId": "main",
                                "channel": 1,
                                "layer": 10,
                                "loopMedia": true
                            }
                        ],
                        "templates": [
                            {
                                "id": "tpl-1",
                                "name": "Lower third",
                                "template": "lower-third",
                                "deviceId": "main",
                                "channel": 1,
                                "layer": 20,
                                "positionRow": 1,
                                "keyvalue": { "f0": "Hello" }
                            }
                        ]
                    }
                ]
            }
        ]
    }"#;

    fn source() -> JsonProjectSource {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BUNDLE.as_bytes()).unwrap();
        JsonProjectSource::from_file(file.path()).unwrap()
    }

    #[tokio::test]
    async fn bundle_lookups_resolve() {
        let source = source();

        let project = source.find_project_by_id("show-a").await.unwrap();
        assert_eq!(project.name, "Show A");

        let events = source.find_events_by_project("show-a").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].project_id, "show-a");

        let clips = source.find_clips_by_event("ev-1").await.unwrap();
        assert_eq!(clips.len(), 1);
        assert!(clips[0].loop_media);
        assert_eq!(clips[0].event_id, "ev-1");

        let templates = source.find_templates_by_event("ev-1").await.unwrap();
        assert_eq!(templates[0].keyvalue["f0"], "Hello");
    }

    #[tokio::test]
    async fn unknown_project_is_an_error() {
        let source = source();
        let err = source.find_project_by_id("ghost").await.unwrap_err();
        assert!(matches!(err, SourceError::UnknownProject(_)));
    }

    #[tokio::test]
    async fn empty_source_has_no_projects() {
        let source = JsonProjectSource::empty();
        assert!(source.find_project_by_id("show-a").await.is_err());
    }
}
