use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A host capability (cue playback, keep-awake) that could not be used.
///
/// These never end a session; callers log them and carry on without the
/// side effect.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("{capability} failed: {source}")]
    Io {
        capability: &'static str,
        #[source]
        source: io::Error,
    },
}

impl CapabilityError {
    pub fn io(capability: &'static str, source: io::Error) -> Self {
        Self::Io { capability, source }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("phase duration must be a positive number of seconds, got {0}")]
    InvalidPhaseDuration(f64),

    #[error("tick interval must be between {min} and {max} ms, got {got}")]
    InvalidTickInterval { got: u64, min: u64, max: u64 },

    #[error("could not read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("session history io: {0}")]
    Io(#[from] io::Error),

    #[error("session history csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("no state directory available for session history")]
    NoStateDir,
}
