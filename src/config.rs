use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

// =============================================================================
// Time-related constants
// =============================================================================

/// An extraction lock older than this is considered abandoned (30 minutes)
pub const EXTRACTION_LOCK_TIMEOUT_MS: i64 = 30 * 60 * 1000;

/// Delay between starting each version probe to avoid hammering the index (10ms)
pub const PROBE_STAGGER_DELAY_MS: u64 = 10;

/// Timeout for a single package index request (30 seconds)
pub const DEFAULT_INDEX_TIMEOUT_MS: u64 = 30_000;

/// Base delay for exponential backoff between index retries
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Timeout for each step of a version probe (venv, install, introspect) (5 minutes)
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5 * 60 * 1000;

/// Number of most recent versions indexed per library
pub const DEFAULT_VERSION_LIMIT: usize = 20;

pub const DEFAULT_PYPI_URL: &str = "https://pypi.org";

/// Top-level configuration, read from `config.json`
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub index: IndexConfig,
    pub extraction: ExtractionConfig,
    /// Extra top-level module → distribution mappings (e.g. `"cv2": "opencv-python"`)
    pub libraries: BTreeMap<String, String>,
}

/// Package index configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PYPI_URL.to_string(),
            timeout_ms: DEFAULT_INDEX_TIMEOUT_MS,
            max_retries: 3,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

/// Signature extraction configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionConfig {
    /// How many of the most recent versions to index; 0 indexes every version
    pub version_limit: usize,
    /// Maximum number of version probes running at once
    pub concurrency: usize,
    /// Interpreter used to create the per-version virtual environments
    pub python: String,
    pub probe_timeout_ms: u64,
    pub include_prereleases: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            version_limit: DEFAULT_VERSION_LIMIT,
            concurrency: 4,
            python: "python3".to_string(),
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            include_prereleases: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Config {
    /// Load the config file at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }
}

/// Returns the path to the data directory for pinpoint.
/// Uses $XDG_DATA_HOME/pinpoint if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/pinpoint,
/// or ./pinpoint if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the signature database.
pub fn db_path() -> PathBuf {
    data_dir().join("signatures.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("pinpoint.log")
}

/// Returns the path to the default config file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("pinpoint")
}
