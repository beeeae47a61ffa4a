//! Project domain: the in-memory timeline model, the persistence seam, and
//! the holder for the currently loaded project.

pub mod model;
pub mod runtime;
pub mod source;

pub use model::{
    EventBehavior, ItemBehavior, ItemKind, ItemLocation, ItemSpec, PlacedItem, PlaybackState,
    Project, Row, TimelineEvent, Transition,
};
pub use runtime::{LoadOutcome, ProjectRuntime};
pub use source::{
    ClipRecord, EventRecord, ProjectRecord, ProjectSource, SourceError, SourceResult,
    TemplateRecord,
};
