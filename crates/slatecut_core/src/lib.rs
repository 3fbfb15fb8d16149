//! # Slatecut Core
//!
//! Timeline data model for the Slatecut video editor: tracks, clips,
//! text overlays, transitions and per-clip effects, plus the mutators
//! that keep them consistent (overlap resolution, snapping, splitting,
//! audio detach bookkeeping) and snapshot-based undo/redo.
//!
//! Everything here is pure data manipulation; rendering and export
//! graph compilation live in `slatecut_export`.

pub mod editing;
pub mod error;
pub mod gaps;
pub mod history;
pub mod overlap;
pub mod project;
pub mod snapping;
pub mod split;
pub mod types;

pub use error::{CoreError, Result};
pub use gaps::{detect_gaps, Gap, GAP_EPSILON_US};
pub use history::{Command, History};
pub use overlap::{
    clips_overlap, find_open_position, has_collision, resolve_overlaps, OVERLAP_EPSILON_US,
};
pub use project::{preset_1080p, preset_1080p_60, preset_4k, preset_720p, preset_shorts};
pub use snapping::{apply_snapping, collect_snap_points, find_snap_point, SNAP_THRESHOLD_US};
pub use types::*;
