//! References to host services and the port used to call them

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for malformed service references
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceRefError {
    #[error("service must have the form 'domain/service', got '{0}'")]
    InvalidFormat(String),
}

/// A `domain/service` reference to a host service (e.g., "notify/mobile_app")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceRef {
    domain: String,
    service: String,
}

impl ServiceRef {
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
    ) -> Result<Self, ServiceRefError> {
        let domain = domain.into();
        let service = service.into();
        let valid = |s: &str| !s.is_empty() && !s.contains(['/', ' ']);
        if !valid(&domain) || !valid(&service) {
            return Err(ServiceRefError::InvalidFormat(format!("{domain}/{service}")));
        }
        Ok(Self { domain, service })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

impl FromStr for ServiceRef {
    type Err = ServiceRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 {
            return Err(ServiceRefError::InvalidFormat(s.to_string()));
        }
        Self::new(parts[0], parts[1])
    }
}

impl TryFrom<String> for ServiceRef {
    type Error = ServiceRefError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ServiceRef> for String {
    fn from(service: ServiceRef) -> String {
        service.to_string()
    }
}

impl fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.service)
    }
}

/// Errors that can occur when calling a host service
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service not found: {0}")]
    NotFound(ServiceRef),

    #[error("service call failed: {0}")]
    CallFailed(String),

    #[error("invalid service data: {0}")]
    InvalidData(String),
}

/// Port for invoking host services (control actions, notify targets)
///
/// Calls are fire-and-forget from the rules' point of view: the result only
/// reports whether the host accepted the call, not whether the device acted.
#[async_trait]
pub trait ServiceCaller: Send + Sync {
    async fn call_service(
        &self,
        service: &ServiceRef,
        data: serde_json::Value,
    ) -> Result<(), ServiceError>;
}
