//! Persistence seam for project data.
//!
//! The control plane never talks to storage directly. A [`ProjectSource`]
//! implementation (database, JSON bundle, test fake) hands back plain records
//! and the runtime assembles the in-memory tree from them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by a project source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The requested project does not exist in the store.
    #[error("unknown project: {0}")]
    UnknownProject(String),

    /// The store could not be read.
    #[error("read failed: {0}")]
    Read(String),

    /// Stored data did not parse.
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Result alias for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Stored shape of a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Stored shape of a timeline event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub project_id: String,
    pub name: String,
    /// Ordering of the event within the project timeline.
    pub event_order: u32,
    /// `parallel`, `linear`, or `sequential`.
    #[serde(default)]
    pub behavior: Option<String>,
}

/// Stored shape of a clip placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipRecord {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub media: String,
    #[serde(default)]
    pub device_id: Option<String>,
    pub channel: u16,
    pub layer: u16,
    pub position_row: u32,
    #[serde(default)]
    pub loop_media: bool,
    #[serde(default)]
    pub transition_type: Option<String>,
    #[serde(default)]
    pub transition_duration: Option<u32>,
    #[serde(default)]
    pub delay_ms: u64,
}

/// Stored shape of a template placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub device_id: Option<String>,
    pub channel: u16,
    pub layer: u16,
    pub position_row: u32,
    #[serde(default)]
    pub duration_ms: u64,
    /// Key/value payload as stored (JSON object).
    #[serde(default)]
    pub keyvalue: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub delay_ms: u64,
}

/// Read-only access to stored project data.
///
/// Implementations must be cheap to call repeatedly; the runtime fetches all
/// records for a project once per load.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// Looks up a project by id.
    async fn find_project_by_id(&self, project_id: &str) -> SourceResult<ProjectRecord>;

    /// Returns the project's timeline events.
    async fn find_events_by_project(&self, project_id: &str) -> SourceResult<Vec<EventRecord>>;

    /// Returns the clip placements of one timeline event.
    async fn find_clips_by_event(&self, event_id: &str) -> SourceResult<Vec<ClipRecord>>;

    /// Returns the template placements of one timeline event.
    async fn find_templates_by_event(&self, event_id: &str) -> SourceResult<Vec<TemplateRecord>>;
}
