use crate::{core::fx::MasterConfig, error::ConfigError, waveform::DEFAULT_PEAK_COUNT};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rate used by playback and export
    pub sample_rate: u32,
    /// Waveform resolution
    pub waveform_peaks: usize,
    /// Seconds
    pub snap_tolerance: f64,
    pub snap_to_beats: bool,
    /// Seconds
    pub min_project_duration: f64,
    pub master: MasterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            waveform_peaks: DEFAULT_PEAK_COUNT,
            snap_tolerance: 0.1,
            snap_to_beats: false,
            min_project_duration: 3.,
            master: MasterConfig::default(),
        }
    }
}

impl Config {
    /// Load config from disk, falling back to defaults
    pub fn load() -> Self {
        match get_config_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|err| {
                log::debug!("Using default config: {err}");
                Config::default()
            }),
            None => Config::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Save config to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = get_config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Config saved to {}", path.display());
        Ok(())
    }
}

/// Returns the configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "Bytenosis", "Clipmix")
        .map(|proj_dirs| proj_dirs.config_dir().join("config.json"))
}
