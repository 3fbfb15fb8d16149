use serde::Deserialize;
use slatecut_core::types::{Asset, AssetKind, MediaInfo, TimeUs};
use std::path::Path;
use uuid::Uuid;

use crate::error::{ExportError, Result};

const FFPROBE_ARGS: [&str; 6] = [
    "-v",
    "quiet",
    "-print_format",
    "json",
    "-show_format",
    "-show_streams",
];

const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff", "svg"];
const AUDIO_EXTENSIONS: [&str; 7] = ["mp3", "wav", "flac", "aac", "ogg", "m4a", "wma"];

// ---------------------------------------------------------------------------
// ffprobe JSON document
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ProbeDoc {
    #[serde(default)]
    streams: Vec<StreamDoc>,
    #[serde(default)]
    format: FormatDoc,
}

#[derive(Debug, Deserialize)]
struct StreamDoc {
    #[serde(default)]
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FormatDoc {
    duration: Option<String>,
}

impl ProbeDoc {
    fn stream(&self, kind: &str) -> Option<&StreamDoc> {
        self.streams.iter().find(|s| s.codec_type == kind)
    }

    fn to_info(&self) -> MediaInfo {
        let video = self.stream("video");
        let audio = self.stream("audio");

        MediaInfo {
            duration_us: self
                .format
                .duration
                .as_deref()
                .and_then(|d| d.parse::<f64>().ok())
                .map_or(TimeUs::ZERO, TimeUs::from_seconds),
            width: video.and_then(|s| s.width).unwrap_or_default(),
            height: video.and_then(|s| s.height).unwrap_or_default(),
            fps: video
                .and_then(|s| s.r_frame_rate.as_deref())
                .and_then(parse_frame_rate)
                .unwrap_or_default(),
            codec: video
                .and_then(|s| s.codec_name.clone())
                .or_else(|| audio.and_then(|s| s.codec_name.clone()))
                .unwrap_or_default(),
            audio_channels: audio.and_then(|s| s.channels).unwrap_or_default(),
            audio_sample_rate: audio
                .and_then(|s| s.sample_rate.as_deref())
                .and_then(|r| r.parse().ok())
                .unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run ffprobe on a media file and parse the result into a `MediaInfo`.
pub fn probe_media(path: impl AsRef<Path>) -> Result<MediaInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ExportError::FileNotFound(path.to_path_buf()));
    }

    tracing::debug!(path = %path.display(), "probing media file");

    let output = std::process::Command::new("ffprobe")
        .args(FFPROBE_ARGS)
        .arg(path)
        .output()
        .map_err(|e| ExportError::FfprobeExec(e.to_string()))?;

    if !output.status.success() {
        return Err(ExportError::FfprobeFailed(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }

    let doc: ProbeDoc = serde_json::from_slice(&output.stdout)?;
    Ok(doc.to_info())
}

/// Probe a media file and wrap it as a library `Asset`.
pub fn import_media(path: impl AsRef<Path>) -> Result<Asset> {
    let path = path.as_ref();
    let info = probe_media(path)?;

    let name = path
        .file_name()
        .map_or_else(|| "unknown".to_string(), |n| n.to_string_lossy().into_owned());

    Ok(Asset {
        id: Uuid::new_v4(),
        name,
        path: path.to_path_buf(),
        kind: detect_asset_kind(path, &info),
        info: Some(info),
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Parse an ffprobe frame rate such as "30000/1001", "30/1" or plain "29.97".
fn parse_frame_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => rate.parse().ok(),
    }
}

/// Classify by extension first, then by which streams the probe found.
fn detect_asset_kind(path: &Path, info: &MediaInfo) -> AssetKind {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return AssetKind::Image;
    }
    if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        return AssetKind::Audio;
    }

    if info.width > 0 && info.height > 0 {
        AssetKind::Video
    } else if info.audio_channels > 0 {
        AssetKind::Audio
    } else {
        AssetKind::Video
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
