//! # Slatecut Export
//!
//! Export pipeline for the Slatecut video editor: media probing, gap
//! and transition grouping, compilation of a timeline snapshot into an
//! ffmpeg filter graph, and async execution of the resulting plan with
//! progress reporting and cancellation.
//!
//! The compiler ([`compile::compile`]) is a pure function of the
//! project; it performs no I/O and either returns a complete
//! [`compile::ExportPlan`] or fails before ffmpeg is ever invoked.

pub mod compile;
pub mod engine;
pub mod error;
pub mod graph;
pub mod probe;
pub mod segments;

pub use compile::{compile, ExportInput, ExportPlan, Segment, SegmentKind};
pub use engine::{build_ffmpeg_args, execute, parse_progress, ExportProgress};
pub use error::{ExportError, Result};
pub use graph::{FilterGraph, Node, NodeId, Op, PortRef};
pub use probe::{import_media, probe_media};
pub use segments::{group_segments, EdgeFade, JoinKind, RunPlan, SegmentPlan};
