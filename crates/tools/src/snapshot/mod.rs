//! Snapshot compaction and delta-diffing engine.
//!
//! `take_snapshot` dumps the full accessibility tree on every automation
//! step; sending that verbatim burns the token budget and mostly repeats
//! the previous step. This module segments the dump into sections, keeps
//! the regions an agent can act on (interactive controls, dialogs, section
//! anchors), enforces a char budget, and diffs consecutive snapshots so
//! unchanged pages cost almost nothing.
//!
//! Everything here is pure, synchronous computation; the only mutable
//! state is the per-session [`SnapshotMemory`] the pipeline updates at the
//! end of each call.

pub mod classify;
pub mod compact;
pub mod delta;
pub mod pipeline;
pub mod section;

pub use classify::{Classifier, MarkerKind};
pub use compact::{compact, Compaction};
pub use delta::{DeltaMode, DELTA_CHANGED, DELTA_NO_CHANGE};
pub use pipeline::{SnapshotMemory, SnapshotOptions, SnapshotPipeline, TRUNCATED_MARKER};
pub use section::Section;
