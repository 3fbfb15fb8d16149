use crate::error::{CoreError, Result};
use crate::types::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

impl Project {
    /// Create an empty project with a fresh id.
    pub fn new(name: impl Into<String>, settings: ProjectSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            settings,
            assets: vec![],
            timeline: Timeline::new(),
        }
    }

    pub fn find_asset(&self, asset_id: Uuid) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == asset_id)
    }

    /// Write the project to disk as pretty-printed JSON, appending the
    /// `.slate` extension when the path lacks it.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = ensure_extension(path.as_ref());
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a project back from a `.slate` file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let project: Project = serde_json::from_str(&data)
            .map_err(|e| CoreError::InvalidProjectFile(format!("{}: {e}", path.display())))?;
        Ok(project)
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            tracks: vec![],
            overlays: vec![],
            transitions: vec![],
            effects: HashMap::new(),
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Full HD (1920x1080) at 30fps, the base every other preset derives from.
pub fn preset_1080p() -> ProjectSettings {
    ProjectSettings {
        width: 1920,
        height: 1080,
        fps: 30.0,
        sample_rate: 48000,
        container: "mp4".to_string(),
        output_name: "export".to_string(),
    }
}

/// Vertical 9:16 (1080x1920) for shorts and reels.
pub fn preset_shorts() -> ProjectSettings {
    ProjectSettings {
        width: 1080,
        height: 1920,
        ..preset_1080p()
    }
}

/// HD (1280x720).
pub fn preset_720p() -> ProjectSettings {
    ProjectSettings {
        width: 1280,
        height: 720,
        ..preset_1080p()
    }
}

/// UHD (3840x2160).
pub fn preset_4k() -> ProjectSettings {
    ProjectSettings {
        width: 3840,
        height: 2160,
        ..preset_1080p()
    }
}

/// Full HD at 60fps.
pub fn preset_1080p_60() -> ProjectSettings {
    ProjectSettings {
        fps: 60.0,
        ..preset_1080p()
    }
}

/// File extension for saved projects.
pub const PROJECT_EXTENSION: &str = "slate";

fn ensure_extension(path: &Path) -> PathBuf {
    if path.extension().and_then(|e| e.to_str()) == Some(PROJECT_EXTENSION) {
        return path.to_path_buf();
    }
    let mut with_ext = path.to_path_buf();
    let mut name = with_ext.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(PROJECT_EXTENSION);
    with_ext.set_file_name(name);
    with_ext
}
