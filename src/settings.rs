//! User settings, stored as JSON in the platform config directory.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not access settings file: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Samples requested for the preview surface unless configured otherwise.
pub const DEFAULT_SAMPLES: u8 = 8;

/// Every field has a default, so old or partial files load fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Recompile on every source change instead of only on request.
    pub realtime_compilation: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Project reopened at start-up when none is given on the command line.
    pub last_project: Option<PathBuf>,
    pub clear_color: [f32; 3],
    /// Samples per pixel for the preview surface; 0 turns multisampling off.
    pub multisampling: u8,
    /// Directory searched for `<name>.obj` when a mesh name is not built in.
    pub mesh_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            realtime_compilation: true,
            window_width: 1280,
            window_height: 720,
            last_project: None,
            clear_color: [0.1, 0.1, 0.1],
            multisampling: DEFAULT_SAMPLES,
            mesh_dir: None,
        }
    }
}

impl Settings {
    /// `<config_dir>/shaderbench/settings.json`, if the platform has a config directory.
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("shaderbench").join("settings.json"))
    }

    /// Loads the settings from their default location, falling back to defaults.
    pub fn load() -> Self {
        Self::path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Loads settings from `path`. A missing file gives the defaults silently, an unreadable or
    /// corrupt one gives the defaults with a warning.
    pub fn load_from(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                log::warn!("Could not read settings \"{}\": {e}", path.display());
                return Self::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            log::warn!("Ignoring invalid settings \"{}\": {e}", path.display());
            Self::default()
        })
    }

    /// Saves to the default location. Failures are logged.
    pub fn save(&self) {
        let Some(path) = Self::path() else {
            log::warn!("No config directory, settings not saved");
            return;
        };
        if let Err(e) = self.save_to(&path) {
            log::warn!("{e}");
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The user mesh directory: the configured one, or `<data_local_dir>/shaderbench/meshes`.
    pub fn mesh_dir(&self) -> Option<PathBuf> {
        self.mesh_dir.clone().or_else(|| {
            dirs::data_local_dir().map(|dir| dir.join("shaderbench").join("meshes"))
        })
    }
}
