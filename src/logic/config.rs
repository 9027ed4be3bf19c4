//! Fixer Configuration
//!
//! Tunables for the polling loop, the state probe and both transports.
//! Stored as pretty JSON next to the whitelist; every field has a default so
//! partial files are fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "Config IO Error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Config Parse Error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err)
    }
}

// ============================================================================
// PROBE CONFIG
// ============================================================================

fn default_registry_key() -> String {
    constants::DEFAULT_REGISTRY_KEY.to_string()
}

fn default_registry_value() -> String {
    constants::DEFAULT_REGISTRY_VALUE.to_string()
}

/// Which external flag answers "is the feature on?"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeConfig {
    /// Registry flag under HKEY_CURRENT_USER
    Registry {
        #[serde(default = "default_registry_key")]
        key: String,
        #[serde(default = "default_registry_value")]
        value: String,
    },
    /// Presence of replay buffer temp files
    TempFiles {
        /// Explicit directory; looked up in the registry when absent
        #[serde(default)]
        directory: Option<PathBuf>,
    },
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig::Registry {
            key: default_registry_key(),
            value: default_registry_value(),
        }
    }
}

// ============================================================================
// ENDPOINT CONFIG
// ============================================================================

/// Where the control endpoint's port and secret are published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointSourceKind {
    SharedMemory,
    File,
}

/// Primary transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Use the HTTP transport at all
    pub enabled: bool,
    pub source: EndpointSourceKind,
    /// File mapping name for `SharedMemory`
    pub mapping_name: String,
    /// JSON file for `File`
    pub file: Option<PathBuf>,
    /// Route toggled on the endpoint
    pub path: String,
    /// Request timeout (milliseconds)
    pub timeout_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: EndpointSourceKind::SharedMemory,
            mapping_name: constants::DEFAULT_ENDPOINT_MAPPING.to_string(),
            file: None,
            path: constants::DEFAULT_ENDPOINT_PATH.to_string(),
            timeout_ms: constants::DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

// ============================================================================
// FIXER CONFIG
// ============================================================================

/// Full configuration (loaded from config.json)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixerConfig {
    /// Polling interval (seconds)
    pub tick_interval_secs: u64,
    /// Consecutive needed corrections before backing off
    pub conflict_threshold: u32,
    /// Back-off length (seconds)
    pub backoff_secs: u64,
    /// Whitelist file; env/default when absent
    pub whitelist_path: Option<PathBuf>,
    pub probe: ProbeConfig,
    pub endpoint: EndpointConfig,
    /// Ordered key names for the fallback shortcut
    pub shortcut: Option<Vec<String>>,
    /// Append log output here instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for FixerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: constants::DEFAULT_TICK_INTERVAL_SECS,
            conflict_threshold: constants::DEFAULT_CONFLICT_THRESHOLD,
            backoff_secs: constants::DEFAULT_BACKOFF_SECS,
            whitelist_path: None,
            probe: ProbeConfig::default(),
            endpoint: EndpointConfig::default(),
            shortcut: None,
            log_file: None,
        }
    }
}

impl FixerConfig {
    /// Load from disk. A missing file is the default configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load, validate and apply env overrides. Problems come back as warnings.
    pub fn load_or_default(path: &Path) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();

        let mut config = match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load {:?}: {} - using defaults", path, e);
                warnings.push(format!("Could not load {}: {}", path.display(), e));
                Self::default()
            }
        };

        if let Some(secs) = constants::get_tick_interval_override() {
            config.tick_interval_secs = secs;
        }

        warnings.extend(config.validate());
        (config, warnings)
    }

    /// Write the defaults so users have a file to edit
    pub fn save_default_if_missing(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&Self::default())?;
        fs::write(path, json)?;
        log::info!("Wrote default config to {:?}", path);
        Ok(true)
    }

    /// Clamp out-of-range values, returning a note for each fix
    pub fn validate(&mut self) -> Vec<String> {
        let mut notes = Vec::new();

        if self.tick_interval_secs == 0 {
            notes.push(format!(
                "tick_interval_secs must be positive, using {}",
                constants::DEFAULT_TICK_INTERVAL_SECS
            ));
            self.tick_interval_secs = constants::DEFAULT_TICK_INTERVAL_SECS;
        }

        if self.tick_interval_secs > constants::MAX_TICK_INTERVAL_SECS {
            notes.push(format!(
                "tick_interval_secs {} is too large, using {}",
                self.tick_interval_secs,
                constants::MAX_TICK_INTERVAL_SECS
            ));
            self.tick_interval_secs = constants::MAX_TICK_INTERVAL_SECS;
        }

        if self.backoff_secs > constants::MAX_BACKOFF_SECS {
            notes.push(format!(
                "backoff_secs {} is too large, using {}",
                self.backoff_secs,
                constants::MAX_BACKOFF_SECS
            ));
            self.backoff_secs = constants::MAX_BACKOFF_SECS;
        }

        if self.conflict_threshold < constants::MIN_CONFLICT_THRESHOLD {
            notes.push(format!(
                "conflict_threshold {} is too small, using {}",
                self.conflict_threshold,
                constants::MIN_CONFLICT_THRESHOLD
            ));
            self.conflict_threshold = constants::MIN_CONFLICT_THRESHOLD;
        }

        if self.endpoint.enabled
            && self.endpoint.source == EndpointSourceKind::File
            && self.endpoint.file.is_none()
        {
            notes.push("endpoint source is \"file\" but no file is set, HTTP transport disabled".to_string());
            self.endpoint.enabled = false;
        }

        notes
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Back-off length in whole ticks (rounded up, at least one)
    pub fn backoff_ticks(&self) -> u64 {
        let tick = self.tick_interval_secs.max(1);
        self.backoff_secs.div_ceil(tick).max(1)
    }

    /// Whitelist location: env var, then config, then default
    pub fn whitelist_path(&self) -> PathBuf {
        if std::env::var_os("REPLAY_GUARD_WHITELIST").is_some() {
            return constants::get_whitelist_path();
        }
        self.whitelist_path
            .clone()
            .unwrap_or_else(constants::get_whitelist_path)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FixerConfig::default();
        assert_eq!(config.tick_interval_secs, 10);
        assert_eq!(config.conflict_threshold, 3);
        assert_eq!(config.backoff_ticks(), 30);
        assert!(config.endpoint.enabled);
        assert!(matches!(config.probe, ProbeConfig::Registry { .. }));
    }

    #[test]
    fn test_backoff_ticks_round_up() {
        let config = FixerConfig {
            tick_interval_secs: 7,
            backoff_secs: 15,
            ..Default::default()
        };
        assert_eq!(config.backoff_ticks(), 3);

        let config = FixerConfig {
            backoff_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.backoff_ticks(), 1);
    }

    #[test]
    fn test_validate_clamps_threshold() {
        let mut config = FixerConfig {
            conflict_threshold: 1,
            tick_interval_secs: 0,
            ..Default::default()
        };
        let notes = config.validate();
        assert_eq!(notes.len(), 2);
        assert_eq!(config.conflict_threshold, 2);
        assert_eq!(config.tick_interval_secs, 10);
    }

    #[test]
    fn test_validate_caps_huge_intervals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "tick_interval_secs": 18446744073709551615, "backoff_secs": 18446744073709551615 }"#,
        )
        .unwrap();

        let (config, warnings) = FixerConfig::load_or_default(&path);
        assert_eq!(warnings.len(), 2);
        assert_eq!(config.tick_interval_secs, constants::MAX_TICK_INTERVAL_SECS);
        assert_eq!(config.backoff_secs, constants::MAX_BACKOFF_SECS);
        assert_eq!(config.backoff_ticks(), 7);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "backoff_secs": 60, "probe": { "kind": "temp_files" } }"#).unwrap();

        let config = FixerConfig::load(&path).unwrap();
        assert_eq!(config.backoff_secs, 60);
        assert_eq!(config.tick_interval_secs, 10);
        assert_eq!(config.probe, ProbeConfig::TempFiles { directory: None });
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = FixerConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, FixerConfig::default());
    }

    #[test]
    fn test_invalid_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(FixerConfig::load(&path), Err(ConfigError::ParseError(_))));
        let (config, warnings) = FixerConfig::load_or_default(&path);
        assert_eq!(config.conflict_threshold, 3);
        assert!(!warnings.is_empty());
    }

    #[test]
    fn test_save_default_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.json");
        assert!(FixerConfig::save_default_if_missing(&path).unwrap());
        assert!(!FixerConfig::save_default_if_missing(&path).unwrap());
        assert_eq!(FixerConfig::load(&path).unwrap(), FixerConfig::default());
    }
}
