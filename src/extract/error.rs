use thiserror::Error;

use crate::catalog::StoreError;
use crate::index::IndexError;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create virtual environment: {stderr}")]
    Environment { stderr: String },

    #[error("Failed to install {requirement}: {stderr}")]
    Install { requirement: String, stderr: String },

    #[error("Introspection failed: {stderr}")]
    Introspection { stderr: String },

    #[error("{step} timed out after {millis}ms")]
    Timeout { step: &'static str, millis: u64 },

    #[error("Invalid introspection output: {0}")]
    InvalidOutput(#[from] serde_json::Error),
}

/// A single version that could not be captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionProbeFailure {
    pub library: String,
    pub version: String,
    pub reason: String,
}

impl std::fmt::Display for VersionProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}=={}: {}", self.library, self.version, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to list versions: {0}")]
    Index(#[from] IndexError),

    #[error("No published versions of {0} are eligible for indexing")]
    NoPublishedVersions(String),

    #[error("Extraction failed for {library}: none of {} versions could be captured", .failures.len())]
    NoVersionsCaptured {
        library: String,
        failures: Vec<VersionProbeFailure>,
    },

    #[error("{0} is already being extracted by another process")]
    AlreadyRunning(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
