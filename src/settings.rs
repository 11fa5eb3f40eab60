//! Persisted "last used" settings.
//!
//! Settings are a flat JSON object. Loading is permissive: a missing or unreadable file
//! gives the defaults, and missing keys default silently. Keys this crate does not know
//! about are carried through untouched so other tools sharing the file keep their values.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name used next to the executable
pub const SETTINGS_FILE: &str = "settings.json";

/// Last-used paths and options, passed explicitly to whatever needs them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// TeknoParrotUi executable
    pub exe: String,
    /// TeknoParrot UserProfiles folder
    pub userprofiles: String,
    /// Output folder for generated `.bat` launchers
    pub output: String,
    /// Pass `--startMinimized` to TeknoParrot
    pub start_minimized: bool,
    /// Extra launcher arguments (whitespace separated)
    pub extra_args: String,
    /// Last selected profile category label
    pub last_category: String,
    /// Last edited INI module
    pub last_ini: String,
    /// ffmpeg executable
    pub ffmpeg_path: String,
    /// Last scanned video folder
    pub last_folder: String,
    /// ISO packer executable
    pub xdvdfs_path: String,
    /// Last scanned ISO folder
    pub iso_folder: String,
    /// HyperSpin `Settings` folder
    pub settings_folder: String,
    /// HyperSpin `PC Games.ini`
    pub pc_ini_file: String,
    /// Root folder holding PC games
    pub pc_games_dir: String,
    /// Drive letter used for the last relocation
    pub drive_letter: String,

    /// Keys written by other tools
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            exe: String::new(),
            userprofiles: String::new(),
            output: String::new(),
            start_minimized: true,
            extra_args: String::new(),
            last_category: "All".to_string(),
            last_ini: String::new(),
            ffmpeg_path: String::new(),
            last_folder: String::new(),
            xdvdfs_path: String::new(),
            iso_folder: String::new(),
            settings_folder: String::new(),
            pc_ini_file: String::new(),
            pc_games_dir: String::new(),
            drive_letter: String::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Default settings location: next to the running executable, else the working directory
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(SETTINGS_FILE)))
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE))
    }

    /// Parse settings from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings, falling back to defaults when the file is missing or unreadable
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no settings file, using defaults");
                return Self::default();
            }
        };

        match Self::from_json(&text) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
                Self::default()
            }
        }
    }

    /// Write settings, replacing the whole file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json + "\n")
            .map_err(|e| Error::io(path.display().to_string(), e.to_string()))?;
        debug!(path = %path.display(), "saved settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.start_minimized);
        assert_eq!(settings.last_category, "All");
        assert!(settings.exe.is_empty());
    }

    #[test]
    fn test_missing_keys_default() {
        let settings = Settings::from_json(r#"{"exe": "C:\\TP\\TeknoParrotUi.exe"}"#).unwrap();
        assert_eq!(settings.exe, "C:\\TP\\TeknoParrotUi.exe");
        assert!(settings.start_minimized);
        assert_eq!(settings.last_category, "All");
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let settings =
            Settings::from_json(r#"{"window_width": 1024, "start_minimized": false}"#).unwrap();
        assert!(!settings.start_minimized);
        assert_eq!(
            settings.extra.get("window_width"),
            Some(&serde_json::json!(1024))
        );

        let json = settings.to_json().unwrap();
        assert!(json.contains("\"window_width\": 1024"));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(
            Settings::from_json("{not json"),
            Err(Error::Json { .. })
        ));
    }
}
