//! In-memory timeline model.
//!
//! A [`Project`] is a tree: timeline events, each holding position-keyed rows,
//! each holding placed items (clips and templates). The tree is assembled once
//! at load time and mutated only through the runtime while a project is
//! current. Everything serializes with camelCase keys so snapshots can be
//! handed to clients as-is.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

/// Confirmed playback state of a placed item.
///
/// The tag only ever reflects device-acknowledged outcomes. There is no
/// "pending" variant: a command in flight leaves the previous tag in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PlaybackState {
    /// Never played since load.
    #[default]
    Idle,
    /// The device confirmed playback is running.
    Playing,
    /// Paused on the device.
    Paused,
    /// The device confirmed playback stopped.
    Stopped,
    /// The last command for this item failed.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl PlaybackState {
    /// Whether this state counts as active playback.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Visual transition applied when a clip starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    /// Transition kind as the device understands it (e.g. `CUT`, `MIX`).
    pub kind: String,
    /// Transition length in frames.
    pub duration_frames: u32,
}

/// What a placed item actually is, with per-kind payload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ItemKind {
    /// A media clip.
    Clip {
        /// Media identifier on the device.
        media: String,
        /// Whether the clip loops.
        #[serde(rename = "loop")]
        loop_media: bool,
        /// Optional transition on play.
        #[serde(skip_serializing_if = "Option::is_none")]
        transition: Option<Transition>,
    },
    /// A graphic template.
    Template {
        /// Template identifier on the device.
        template: String,
        /// Display duration in milliseconds (0 = until stopped).
        duration_ms: u64,
        /// Dynamic key/value payload rendered by the template.
        payload: serde_json::Map<String, serde_json::Value>,
    },
}

/// Addressing and identity of a placed item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSpec {
    /// Stable item identifier, unique within the project.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Device the item plays on. `None` means unassigned; playback fails
    /// with a device resolution error.
    pub device_id: Option<String>,
    /// Device output channel.
    pub channel: u16,
    /// Layer within the channel.
    pub layer: u16,
    /// Clip or template payload.
    #[serde(flatten)]
    pub kind: ItemKind,
}

/// Scheduling behavior of a placed item within its event.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ItemBehavior {
    /// Delay before the item fires when its event runs, in milliseconds.
    pub delay_ms: u64,
    /// Free-form compatibility hints (carried through from the source).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<String>,
}

/// A placed item: spec plus behavior plus live playback state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedItem {
    #[serde(flatten)]
    pub spec: ItemSpec,
    pub behavior: ItemBehavior,
    pub playback: PlaybackState,
}

impl PlacedItem {
    /// Creates a placed item in the idle state.
    #[must_use]
    pub fn new(spec: ItemSpec, behavior: ItemBehavior) -> Self {
        Self {
            spec,
            behavior,
            playback: PlaybackState::Idle,
        }
    }
}

/// How items within a timeline event fire relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum EventBehavior {
    /// All items fire together.
    #[default]
    Parallel,
    /// Items fire row by row.
    Linear,
    /// Items fire one after another.
    Sequential,
}

/// A row within a timeline event, keyed by position.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    /// Items on this row, keyed by item id.
    pub items: HashMap<String, PlacedItem>,
}

/// A timeline event: an ordered set of rows holding placed items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    /// Stable event identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Firing behavior for the event's items.
    pub behavior: EventBehavior,
    /// Rows keyed by position (BTreeMap keeps row order stable).
    pub rows: BTreeMap<u32, Row>,
}

/// Where an item lives inside the project tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLocation {
    pub event_id: String,
    pub row: u32,
}

/// A loaded project: the root of the timeline tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Stable project identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Timeline events in playout order.
    pub events: Vec<TimelineEvent>,
}

impl Project {
    /// Finds where an item lives, walking events then rows.
    #[must_use]
    pub fn find_item(&self, item_id: &str) -> Option<ItemLocation> {
        for event in &self.events {
            for (position, row) in &event.rows {
                if row.items.contains_key(item_id) {
                    return Some(ItemLocation {
                        event_id: event.id.clone(),
                        row: *position,
                    });
                }
            }
        }
        None
    }

    /// Returns the item with the given id, if present.
    #[must_use]
    pub fn item(&self, item_id: &str) -> Option<&PlacedItem> {
        self.events
            .iter()
            .flat_map(|event| event.rows.values())
            .find_map(|row| row.items.get(item_id))
    }

    /// Returns a mutable reference to the item with the given id.
    pub fn item_mut(&mut self, item_id: &str) -> Option<&mut PlacedItem> {
        self.events
            .iter_mut()
            .flat_map(|event| event.rows.values_mut())
            .find_map(|row| row.items.get_mut(item_id))
    }

    /// Sets an item's playback tag. Returns false if the item is unknown.
    pub fn set_playback(&mut self, item_id: &str, state: PlaybackState) -> bool {
        match self.item_mut(item_id) {
            Some(item) => {
                item.playback = state;
                true
            }
            None => false,
        }
    }

    /// IDs of all items currently in the playing state.
    #[must_use]
    pub fn playing_item_ids(&self) -> Vec<String> {
        self.events
            .iter()
            .flat_map(|event| event.rows.values())
            .flat_map(|row| row.items.values())
            .filter(|item| item.playback.is_playing())
            .map(|item| item.spec.id.clone())
            .collect()
    }

    /// Whether any item in the project is playing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.events
            .iter()
            .flat_map(|event| event.rows.values())
            .flat_map(|row| row.items.values())
            .any(|item| item.playback.is_playing())
    }
}
