use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::path::PathBuf;
use uuid::Uuid;

/// Shortest visible duration a clip may have after trims and clamps (0.1s).
pub const MIN_CLIP_DURATION_US: i64 = 100_000;

// ---------------------------------------------------------------------------
// TimeUs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeUs(pub i64);

impl TimeUs {
    pub const ZERO: Self = Self(0);

    pub fn from_seconds(s: f64) -> Self {
        Self((s * 1_000_000.0).round() as i64)
    }

    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }
}

impl Add for TimeUs {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for TimeUs {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<i64> for TimeUs {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<i64> for TimeUs {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self(self.0 / rhs)
    }
}

impl fmt::Display for TimeUs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let total_ms = self.0.unsigned_abs() / 1_000;
        let ms = total_ms % 1_000;
        let secs = (total_ms / 1_000) % 60;
        let mins = (total_ms / 60_000) % 60;
        let hours = total_ms / 3_600_000;
        write!(f, "{sign}{hours:02}:{mins:02}:{secs:02}.{ms:03}")
    }
}

// ---------------------------------------------------------------------------
// AssetKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssetKind {
    Video,
    Audio,
    Image,
}

// ---------------------------------------------------------------------------
// MediaInfo
// ---------------------------------------------------------------------------

/// Probed stream metadata for an imported media file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaInfo {
    pub duration_us: TimeUs,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec: String,
    pub audio_channels: u32,
    pub audio_sample_rate: u32,
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    pub id: Uuid,
    pub name: String,
    pub path: PathBuf,
    pub kind: AssetKind,
    pub info: Option<MediaInfo>,
}

// ---------------------------------------------------------------------------
// TrackKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Image,
    Text,
}

// ---------------------------------------------------------------------------
// CropRect / Transform2D
// ---------------------------------------------------------------------------

/// Percentage-based crop window relative to the source frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CropRect {
    pub x_pct: f64,
    pub y_pct: f64,
    pub width_pct: f64,
    pub height_pct: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform2D {
    pub x_pct: f64,
    pub y_pct: f64,
    pub scale: f64,
    pub rotation_deg: f64,
}

// ---------------------------------------------------------------------------
// Clip
// ---------------------------------------------------------------------------

/// A placed, trimmed instance of a media source on a track.
///
/// The visible interval on the timeline is `[start, start + visible)` where
/// `visible = source_duration - trim_in - trim_out`. A video clip and the
/// audio clip detached from it are two independent records that reference
/// each other only by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clip {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub track_id: Uuid,
    pub name: String,
    pub start_us: TimeUs,
    pub source_duration_us: TimeUs,
    pub trim_in_us: TimeUs,
    pub trim_out_us: TimeUs,
    pub crop: Option<CropRect>,
    pub transform: Option<Transform2D>,
    pub detached_audio_id: Option<Uuid>,
    pub linked_video_id: Option<Uuid>,
    pub audio_muted: bool,
}

impl Clip {
    /// Create an untrimmed, unlinked clip.
    pub fn new(
        asset_id: Uuid,
        track_id: Uuid,
        name: impl Into<String>,
        start_us: TimeUs,
        source_duration_us: TimeUs,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            asset_id,
            track_id,
            name: name.into(),
            start_us,
            source_duration_us,
            trim_in_us: TimeUs::ZERO,
            trim_out_us: TimeUs::ZERO,
            crop: None,
            transform: None,
            detached_audio_id: None,
            linked_video_id: None,
            audio_muted: false,
        }
    }

    pub fn visible_duration_us(&self) -> TimeUs {
        TimeUs(self.source_duration_us.0 - self.trim_in_us.0 - self.trim_out_us.0)
    }

    pub fn end_us(&self) -> TimeUs {
        TimeUs(self.start_us.0 + self.visible_duration_us().0)
    }

    /// Strict interior test: the visible interval contains `t` excluding
    /// both boundaries.
    pub fn contains_interior(&self, t: TimeUs) -> bool {
        t > self.start_us && t < self.end_us()
    }

    /// Clear every audio-link field. Split halves and clips whose stale
    /// links were repaired pass through here.
    pub fn reset_audio_links(&mut self) {
        self.detached_audio_id = None;
        self.linked_video_id = None;
        self.audio_muted = false;
    }
}

// ---------------------------------------------------------------------------
// TextOverlay
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextOverlay {
    pub id: Uuid,
    pub track_id: Uuid,
    pub text: String,
    pub x_pct: f64,
    pub y_pct: f64,
    pub font_size: u32,
    pub color: String,
    pub start_us: TimeUs,
    pub duration_us: TimeUs,
}

impl TextOverlay {
    pub fn end_us(&self) -> TimeUs {
        TimeUs(self.start_us.0 + self.duration_us.0)
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum TransitionKind {
    #[default]
    None,
    Fade,
    Dissolve,
    WipeLeft,
    WipeRight,
}

/// Which side of the target clip the transition sits on. `Start` runs into
/// the clip from its predecessor, `End` runs out of it into its successor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransitionEdge {
    Start,
    End,
}

/// A timed effect at a clip junction, or a fade at a lone clip's edge.
/// At most one transition exists per (clip, edge) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transition {
    pub id: Uuid,
    pub clip_id: Uuid,
    pub edge: TransitionEdge,
    pub kind: TransitionKind,
    pub duration_us: TimeUs,
}

// ---------------------------------------------------------------------------
// ClipEffects
// ---------------------------------------------------------------------------

/// Per-clip color/effect parameters, stored in a side map on the timeline so
/// they survive clip mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipEffects {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub grayscale: bool,
    pub sepia: bool,
    pub blur: f64,
}

impl Default for ClipEffects {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            grayscale: false,
            sepia: false,
            blur: 0.0,
        }
    }
}

impl ClipEffects {
    /// True when every parameter is at its neutral value, i.e. applying the
    /// effects would be a no-op.
    pub fn is_neutral(&self) -> bool {
        self.brightness == 0.0
            && self.contrast == 1.0
            && self.saturation == 1.0
            && !self.grayscale
            && !self.sepia
            && self.blur == 0.0
    }
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: Uuid,
    pub kind: TrackKind,
    pub clips: Vec<Clip>,
    pub muted: bool,
    pub locked: bool,
    pub gain: f64,
}

impl Track {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            clips: Vec::new(),
            muted: false,
            locked: false,
            gain: 1.0,
        }
    }

    pub fn set_gain(&mut self, gain: f64) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    /// Clips ordered by visible start time.
    pub fn sorted_clips(&self) -> Vec<&Clip> {
        let mut clips: Vec<&Clip> = self.clips.iter().collect();
        clips.sort_by_key(|c| c.start_us);
        clips
    }
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// The full editable state: one snapshot unit. Commands clone it, mutate the
/// clone and hand back the new snapshot, so an export can keep reading the
/// one it started from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timeline {
    pub tracks: Vec<Track>,
    pub overlays: Vec<TextOverlay>,
    pub transitions: Vec<Transition>,
    pub effects: HashMap<Uuid, ClipEffects>,
}

// ---------------------------------------------------------------------------
// ProjectSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub sample_rate: u32,
    pub container: String,
    pub output_name: String,
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub settings: ProjectSettings,
    pub assets: Vec<Asset>,
    pub timeline: Timeline,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
