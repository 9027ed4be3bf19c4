//! Actuator Types
//!
//! Shared data structures + errors for both transports.

use serde::{Deserialize, Serialize};

// ============================================================================
// ENDPOINT
// ============================================================================

/// Discovered control endpoint (published by the host application)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub port: u16,
    pub secret: String,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorError {
    /// Port/secret could not be discovered
    EndpointUnavailable { message: String },
    /// Request never got an HTTP answer
    NetworkError { message: String },
    /// Endpoint answered with a non-success status
    HttpStatus { code: u16 },
    /// Key name we can't translate
    InvalidKey { name: String },
    /// Synthesized input was rejected
    InputFailed { message: String },
}

impl std::fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActuatorError::EndpointUnavailable { message } => write!(f, "Endpoint unavailable: {}", message),
            ActuatorError::NetworkError { message } => write!(f, "Network error: {}", message),
            ActuatorError::HttpStatus { code } => write!(f, "Endpoint returned HTTP {}", code),
            ActuatorError::InvalidKey { name } => write!(f, "Unknown key '{}'", name),
            ActuatorError::InputFailed { message } => write!(f, "Input failed: {}", message),
        }
    }
}

impl std::error::Error for ActuatorError {}
