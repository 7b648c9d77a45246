use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::clock::DEFAULT_PHASE_SECS;
use crate::error::ConfigError;

pub const MIN_TICK_MS: u64 = 10;
pub const MAX_TICK_MS: u64 = 1000;

/// Startup defaults. Read once; the app never writes it back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub phase_secs: f64,
    pub sound: bool,
    pub keep_awake: bool,
    pub tick_ms: u64,
    pub history: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            phase_secs: DEFAULT_PHASE_SECS,
            sound: false,
            keep_awake: true,
            tick_ms: 50,
            history: true,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_phase_secs(self.phase_secs)?;
        if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&self.tick_ms) {
            return Err(ConfigError::InvalidTickInterval {
                got: self.tick_ms,
                min: MIN_TICK_MS,
                max: MAX_TICK_MS,
            });
        }
        Ok(())
    }
}

pub fn validate_phase_secs(secs: f64) -> Result<f64, ConfigError> {
    if secs.is_finite() && secs > 0.0 {
        Ok(secs)
    } else {
        Err(ConfigError::InvalidPhaseDuration(secs))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "cohere") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("cohere_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when there is no config file.
    pub fn read(&self) -> Result<Option<Config>, ConfigError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let cfg: Config = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        cfg.validate()?;
        Ok(Some(cfg))
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match self.read() {
            Ok(Some(cfg)) => {
                debug!(path = %self.path.display(), "loaded config");
                cfg
            }
            Ok(None) => Config::default(),
            Err(e) => {
                warn!("{e}; using defaults");
                Config::default()
            }
        }
    }
}
