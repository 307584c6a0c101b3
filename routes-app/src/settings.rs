//! User settings, stored as JSON in the platform config directory.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use routes_core::{ConfigError, GuidanceConfig};

const SETTINGS_FILE: &str = "settings.json";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot access settings file '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot parse settings file '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid guidance settings")]
    Invalid(#[from] ConfigError),
}

/// Search and nearby lookup parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchSettings {
    /// Region searched around the user
    pub radius_meters: f64,
    pub limit: usize,
    /// Quiet time before a typed query is searched
    pub debounce_ms: u64,
    pub nearby_categories: Vec<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            radius_meters: 5000.0,
            limit: 10,
            debounce_ms: 300,
            nearby_categories: vec![
                "cafe".to_string(),
                "pharmacy".to_string(),
                "bus stop".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub guidance: GuidanceConfig,
    /// WAV file played as the radar cue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beep_path: Option<PathBuf>,
    pub search: SearchSettings,
}

impl Settings {
    /// Default settings file location, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "accessible-routes", "accessible-routes")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields defaults. A file that exists but does not parse,
    /// or holds unusable guidance constants, is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = match path.map(Path::to_owned).or_else(Self::default_path) {
            Some(path) => path,
            None => {
                debug!("No config directory on this platform, using default settings");
                return Ok(Settings::default());
            }
        };

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                return Ok(Settings::default());
            }
            Err(source) => return Err(SettingsError::Io { path, source }),
        };

        let settings: Settings = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?;
        settings.validate()?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.guidance.validate()?;
        Ok(())
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_owned(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|source| SettingsError::Parse {
            path: path.to_owned(),
            source,
        })?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }
}
