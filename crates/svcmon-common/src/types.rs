//! Core domain types used throughout the service monitor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Service identifier - uniquely identifies a registered service.
///
/// # Example
/// ```
/// use svcmon_common::ServiceId;
///
/// let id = ServiceId::from("storage");
/// assert_eq!(id.as_str(), "storage");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(String);

impl ServiceId {
    /// Creates a new ServiceId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the service ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServiceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ServiceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport protocol used to reach a service's management endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

/// Health status of a registered service.
///
/// Only `Running` and `Doubtful` services are probed by the monitor.
/// `Failed` is terminal for monitoring purposes: the monitor sets it when a
/// service exhausts its ping attempts and never probes it again. `Shutdown`
/// is set externally when a service deregisters cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    #[default]
    Running,
    /// One or more consecutive probes failed, but the service still has
    /// attempts left to recover.
    Doubtful,
    Failed,
    Shutdown,
}

impl ServiceStatus {
    /// Whether the monitor should probe a service in this status.
    pub fn is_monitorable(&self) -> bool {
        matches!(self, ServiceStatus::Running | ServiceStatus::Doubtful)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Running => write!(f, "running"),
            ServiceStatus::Doubtful => write!(f, "doubtful"),
            ServiceStatus::Failed => write!(f, "failed"),
            ServiceStatus::Shutdown => write!(f, "shutdown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_id_display() {
        let id = ServiceId::from("coap-south");
        assert_eq!(id.to_string(), "coap-south");
        assert_eq!(id.as_str(), "coap-south");
    }

    #[test]
    fn test_monitorable_statuses() {
        assert!(ServiceStatus::Running.is_monitorable());
        assert!(ServiceStatus::Doubtful.is_monitorable());
        assert!(!ServiceStatus::Failed.is_monitorable());
        assert!(!ServiceStatus::Shutdown.is_monitorable());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ServiceStatus::Doubtful).unwrap();
        assert_eq!(json, "\"doubtful\"");

        let decoded: ServiceStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(decoded, ServiceStatus::Running);
    }

    #[test]
    fn test_protocol_display() {
        assert_eq!(Protocol::Http.to_string(), "http");
        assert_eq!(Protocol::Https.to_string(), "https");
    }
}
