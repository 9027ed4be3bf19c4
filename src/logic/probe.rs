//! Feature State Probe
//!
//! Answers "is instant replay on right now?" from one external read.
//! A failed read counts as "on": skipping a correction is harmless, a
//! needless toggle is not.

use std::fs;
use std::path::PathBuf;

use crate::constants;
use crate::logic::config::ProbeConfig;
use crate::logic::win32;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The external read failed
    ReadFailed { message: String },
    /// The value exists but carries no data
    EmptyValue,
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::ReadFailed { message } => write!(f, "State read failed: {}", message),
            ProbeError::EmptyValue => write!(f, "State value is empty"),
        }
    }
}

impl std::error::Error for ProbeError {}

// ============================================================================
// PROBE TRAIT
// ============================================================================

pub trait FeatureProbe: Send {
    fn name(&self) -> &'static str;

    /// Raw read, errors included
    fn read_state(&mut self) -> Result<bool, ProbeError>;

    /// Read with the conservative default applied
    fn is_on(&mut self) -> bool {
        match self.read_state() {
            Ok(on) => on,
            Err(e) => {
                log::debug!("{} probe: {} - assuming on", self.name(), e);
                true
            }
        }
    }
}

/// Build the probe named in the config
pub fn from_config(config: &ProbeConfig) -> Box<dyn FeatureProbe> {
    match config {
        ProbeConfig::Registry { key, value } => Box::new(RegistryProbe::new(key, value)),
        ProbeConfig::TempFiles { directory } => Box::new(TempFileProbe::new(directory.clone())),
    }
}

// ============================================================================
// REGISTRY PROBE
// ============================================================================

/// Registry flag; on when the first byte is non-zero
pub struct RegistryProbe {
    key: String,
    value: String,
}

impl RegistryProbe {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl FeatureProbe for RegistryProbe {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn read_state(&mut self) -> Result<bool, ProbeError> {
        let data = win32::read_registry_value(&self.key, &self.value)
            .map_err(|message| ProbeError::ReadFailed { message })?;
        flag_from_bytes(&data)
    }
}

fn flag_from_bytes(data: &[u8]) -> Result<bool, ProbeError> {
    data.first().map(|b| *b != 0).ok_or(ProbeError::EmptyValue)
}

// ============================================================================
// TEMP FILE PROBE
// ============================================================================

/// On while the replay buffer temp files (`Sha*.tmp`) exist
pub struct TempFileProbe {
    directory: Option<PathBuf>,
}

impl TempFileProbe {
    pub fn new(directory: Option<PathBuf>) -> Self {
        Self { directory }
    }

    fn resolve_directory(&self) -> Result<PathBuf, ProbeError> {
        if let Some(dir) = &self.directory {
            return Ok(dir.clone());
        }

        let data = win32::read_registry_value(constants::DEFAULT_REGISTRY_KEY, constants::DEFAULT_TEMP_PATH_VALUE)
            .map_err(|message| ProbeError::ReadFailed { message })?;
        let base = win32::decode_wide(&data);
        if base.is_empty() {
            return Err(ProbeError::EmptyValue);
        }
        Ok(PathBuf::from(base).join(constants::TEMP_FILES_SUBDIR))
    }
}

impl FeatureProbe for TempFileProbe {
    fn name(&self) -> &'static str {
        "temp_files"
    }

    fn read_state(&mut self) -> Result<bool, ProbeError> {
        let dir = self.resolve_directory()?;
        let entries = fs::read_dir(&dir).map_err(|e| ProbeError::ReadFailed {
            message: format!("{}: {}", dir.display(), e),
        })?;

        let found = entries.flatten().any(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with("Sha") && name.ends_with(".tmp")
        });
        Ok(found)
    }
}

// ============================================================================
// TESTS
// ============================================================================
