//! Endpoint Discovery
//!
//! The host application publishes `{"port": .., "secret": ".."}` in a named
//! file mapping. A plain JSON file works too.

use std::fs;
use std::path::PathBuf;

use crate::logic::config::{EndpointConfig, EndpointSourceKind};
use crate::logic::win32;

use super::types::{ActuatorError, Endpoint};

pub trait EndpointSource: Send {
    fn discover(&mut self) -> Result<Endpoint, ActuatorError>;
}

/// Parse the published endpoint record
pub fn parse_endpoint(text: &str) -> Result<Endpoint, ActuatorError> {
    let endpoint: Endpoint = serde_json::from_str(text.trim()).map_err(|e| {
        ActuatorError::EndpointUnavailable {
            message: format!("bad endpoint record: {}", e),
        }
    })?;

    if endpoint.port == 0 || endpoint.secret.is_empty() {
        return Err(ActuatorError::EndpointUnavailable {
            message: "endpoint record has no port or secret".to_string(),
        });
    }
    Ok(endpoint)
}

/// Source named in the config. `None` when no usable source is configured.
pub fn from_config(config: &EndpointConfig) -> Option<Box<dyn EndpointSource>> {
    match config.source {
        EndpointSourceKind::SharedMemory => {
            Some(Box::new(SharedMemoryEndpoint::new(&config.mapping_name)))
        }
        EndpointSourceKind::File => config
            .file
            .clone()
            .map(|path| Box::new(FileEndpoint::new(path)) as Box<dyn EndpointSource>),
    }
}

// ============================================================================
// SHARED MEMORY
// ============================================================================

pub struct SharedMemoryEndpoint {
    mapping_name: String,
}

impl SharedMemoryEndpoint {
    pub fn new(mapping_name: &str) -> Self {
        Self {
            mapping_name: mapping_name.to_string(),
        }
    }
}

impl EndpointSource for SharedMemoryEndpoint {
    fn discover(&mut self) -> Result<Endpoint, ActuatorError> {
        let text = win32::read_shared_string(&self.mapping_name)
            .map_err(|message| ActuatorError::EndpointUnavailable { message })?;
        parse_endpoint(&text)
    }
}

// ============================================================================
// FILE
// ============================================================================

pub struct FileEndpoint {
    path: PathBuf,
}

impl FileEndpoint {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl EndpointSource for FileEndpoint {
    fn discover(&mut self) -> Result<Endpoint, ActuatorError> {
        let text = fs::read_to_string(&self.path).map_err(|e| ActuatorError::EndpointUnavailable {
            message: format!("{}: {}", self.path.display(), e),
        })?;
        parse_endpoint(&text)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint() {
        let endpoint = parse_endpoint(r#" {"port": 53211, "secret": "ABCDEF"} "#).unwrap();
        assert_eq!(endpoint.port, 53211);
        assert_eq!(endpoint.secret, "ABCDEF");
    }

    #[test]
    fn test_parse_endpoint_rejects_incomplete() {
        assert!(parse_endpoint(r#"{"port": 0, "secret": "x"}"#).is_err());
        assert!(parse_endpoint(r#"{"port": 80, "secret": ""}"#).is_err());
        assert!(parse_endpoint("garbage").is_err());
    }

    #[test]
    fn test_file_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("endpoint.json");
        let mut source = FileEndpoint::new(path.clone());
        assert!(source.discover().is_err());

        fs::write(&path, r#"{"port": 8080, "secret": "s3cr3t"}"#).unwrap();
        assert_eq!(
            source.discover().unwrap(),
            Endpoint { port: 8080, secret: "s3cr3t".to_string() }
        );
    }

    #[test]
    fn test_file_source_needs_path() {
        let config = EndpointConfig {
            source: EndpointSourceKind::File,
            file: None,
            ..Default::default()
        };
        assert!(from_config(&config).is_none());
    }
}
