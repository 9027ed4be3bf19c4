//! Corrective Actuator
//!
//! Flips the feature through an ordered list of transports: the local HTTP
//! endpoint first, the keyboard shortcut as fallback. The first transport
//! that succeeds ends the attempt. Nothing is verified here; the next tick's
//! probe does that.

pub mod types;
pub mod discovery;
pub mod http;
pub mod keys;

use std::time::Duration;

use crate::logic::config::FixerConfig;

pub use types::{ActuatorError, Endpoint};
pub use http::HttpTransport;
pub use keys::{KeySender, KeyTransport, Shortcut, SystemKeySender};

/// One way of flipping the feature
pub trait Transport: Send {
    fn name(&self) -> &'static str;

    fn try_toggle(&mut self, desired_on: bool) -> Result<(), ActuatorError>;
}

pub struct CorrectiveActuator {
    transports: Vec<Box<dyn Transport>>,
}

impl CorrectiveActuator {
    pub fn new(transports: Vec<Box<dyn Transport>>) -> Self {
        Self { transports }
    }

    /// No transports; toggling only logs
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// HTTP (when enabled and discoverable) then keyboard
    pub fn from_config(config: &FixerConfig) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let mut transports: Vec<Box<dyn Transport>> = Vec::new();

        if config.endpoint.enabled {
            match discovery::from_config(&config.endpoint) {
                Some(source) => transports.push(Box::new(HttpTransport::new(
                    source,
                    &config.endpoint.path,
                    Duration::from_millis(config.endpoint.timeout_ms),
                ))),
                None => warnings.push("No endpoint source configured, HTTP transport disabled".to_string()),
            }
        }

        let (shortcut, warning) = Shortcut::from_config(config.shortcut.as_deref());
        warnings.extend(warning);
        transports.push(Box::new(KeyTransport::new(shortcut, Box::new(SystemKeySender))));

        (Self::new(transports), warnings)
    }

    pub fn transport_names(&self) -> Vec<&'static str> {
        self.transports.iter().map(|t| t.name()).collect()
    }

    /// Try each transport in order until one succeeds
    pub fn toggle(&mut self, desired_on: bool) {
        for transport in self.transports.iter_mut() {
            match transport.try_toggle(desired_on) {
                Ok(()) => {
                    log::info!(
                        "Toggled instant replay {} via {}",
                        if desired_on { "on" } else { "off" },
                        transport.name()
                    );
                    return;
                }
                Err(e) => {
                    log::warn!("{} transport failed: {}", transport.name(), e);
                }
            }
        }

        log::error!("All transports failed, will re-check next tick");
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::config::{EndpointConfig, EndpointSourceKind};
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Scripted {
        name: &'static str,
        fail: bool,
        calls: Arc<Mutex<Vec<(&'static str, bool)>>>,
    }

    impl Transport for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        fn try_toggle(&mut self, desired_on: bool) -> Result<(), ActuatorError> {
            self.calls.lock().push((self.name, desired_on));
            if self.fail {
                Err(ActuatorError::NetworkError { message: "timed out".to_string() })
            } else {
                Ok(())
            }
        }
    }

    fn actuator(primary_fails: bool, fallback_fails: bool) -> (CorrectiveActuator, Arc<Mutex<Vec<(&'static str, bool)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let transports: Vec<Box<dyn Transport>> = vec![
            Box::new(Scripted { name: "primary", fail: primary_fails, calls: calls.clone() }),
            Box::new(Scripted { name: "fallback", fail: fallback_fails, calls: calls.clone() }),
        ];
        (CorrectiveActuator::new(transports), calls)
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let (mut actuator, calls) = actuator(false, false);
        actuator.toggle(true);
        assert_eq!(*calls.lock(), vec![("primary", true)]);
    }

    #[test]
    fn test_fallback_runs_once_on_failure() {
        let (mut actuator, calls) = actuator(true, false);
        actuator.toggle(false);
        assert_eq!(*calls.lock(), vec![("primary", false), ("fallback", false)]);
    }

    #[test]
    fn test_total_failure_is_swallowed() {
        let (mut actuator, calls) = actuator(true, true);
        actuator.toggle(true);
        assert_eq!(calls.lock().len(), 2);
    }

    #[test]
    fn test_from_config_order() {
        let (actuator, warnings) = CorrectiveActuator::from_config(&FixerConfig::default());
        assert_eq!(actuator.transport_names(), vec!["http", "keyboard"]);
        assert!(warnings.is_empty());

        let config = FixerConfig {
            endpoint: EndpointConfig { enabled: false, ..Default::default() },
            shortcut: Some(vec!["bogus".to_string()]),
            ..Default::default()
        };
        let (actuator, warnings) = CorrectiveActuator::from_config(&config);
        assert_eq!(actuator.transport_names(), vec!["keyboard"]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_from_config_file_source_without_path() {
        let config = FixerConfig {
            endpoint: EndpointConfig {
                source: EndpointSourceKind::File,
                file: None,
                ..Default::default()
            },
            ..Default::default()
        };
        let (actuator, warnings) = CorrectiveActuator::from_config(&config);
        assert_eq!(actuator.transport_names(), vec!["keyboard"]);
        assert_eq!(warnings.len(), 1);
    }
}
