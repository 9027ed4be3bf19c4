//! HTTP Transport
//!
//! Sets the feature through the host application's local control endpoint.
//! The discovered endpoint is cached until a request fails.

use std::time::Duration;

use crate::constants::SECURITY_COOKIE_HEADER;

use super::discovery::EndpointSource;
use super::types::{ActuatorError, Endpoint};
use super::Transport;

const LOCAL_HOST: &str = "127.0.0.1";

pub struct HttpTransport {
    source: Box<dyn EndpointSource>,
    cached: Option<Endpoint>,
    agent: ureq::Agent,
    path: String,
}

impl HttpTransport {
    pub fn new(source: Box<dyn EndpointSource>, path: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            source,
            cached: None,
            agent,
            path: path.to_string(),
        }
    }

    fn endpoint(&mut self) -> Result<Endpoint, ActuatorError> {
        if let Some(endpoint) = &self.cached {
            return Ok(endpoint.clone());
        }

        let endpoint = self.source.discover()?;
        log::debug!("Discovered control endpoint on port {}", endpoint.port);
        self.cached = Some(endpoint.clone());
        Ok(endpoint)
    }

    fn url(&self, endpoint: &Endpoint) -> String {
        format!("http://{}:{}{}", LOCAL_HOST, endpoint.port, self.path)
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    fn try_toggle(&mut self, desired_on: bool) -> Result<(), ActuatorError> {
        let endpoint = self.endpoint()?;
        let url = self.url(&endpoint);

        let response = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .set(SECURITY_COOKIE_HEADER, &endpoint.secret)
            .send_string(&serde_json::json!({ "status": desired_on }).to_string());

        match response {
            Ok(resp) => {
                log::debug!("Control endpoint answered {}", resp.status());
                Ok(())
            }
            Err(ureq::Error::Status(code, _)) => {
                self.cached = None;
                Err(ActuatorError::HttpStatus { code })
            }
            Err(e) => {
                self.cached = None;
                Err(ActuatorError::NetworkError { message: e.to_string() })
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
