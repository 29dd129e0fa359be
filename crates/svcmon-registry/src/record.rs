//! The per-service registry record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use svcmon_common::{Protocol, ServiceId, ServiceStatus};

/// A registered service as the registry stores it.
///
/// The monitor holds a transient copy of this each round; it never creates
/// or deletes records, only writes `status`/`check_count` updates back
/// through the registry.
///
/// `check_count` is the consecutive-failure counter. It is meaningful only
/// while `status` is `Running` or `Doubtful`: a fresh or re-registered
/// record starts at 0, each failed probe increments it, and any successful
/// probe resets it to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub id: ServiceId,

    /// Human-readable service name, used in audit events.
    pub name: String,

    /// Network address of the service host (hostname or IP).
    pub address: String,

    /// Port of the management API the liveness endpoint lives on.
    pub management_port: u16,

    /// Port the service's data API listens on. Carried for completeness;
    /// the detector only talks to the management port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_port: Option<u16>,

    #[serde(default)]
    pub protocol: Protocol,

    #[serde(default)]
    pub status: ServiceStatus,

    #[serde(default)]
    pub check_count: u32,

    #[serde(default = "Utc::now")]
    pub registered_at: DateTime<Utc>,
}

impl ServiceRecord {
    /// Creates a record for a newly registered service.
    pub fn new(
        id: impl Into<ServiceId>,
        name: impl Into<String>,
        address: impl Into<String>,
        management_port: u16,
        protocol: Protocol,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            management_port,
            service_port: None,
            protocol,
            status: ServiceStatus::Running,
            check_count: 0,
            registered_at: Utc::now(),
        }
    }

    /// Sets the data-plane port.
    pub fn with_service_port(mut self, port: u16) -> Self {
        self.service_port = Some(port);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_monitorable() {
        let record = ServiceRecord::new("svc-1", "storage", "localhost", 8081, Protocol::Http);
        assert_eq!(record.status, ServiceStatus::Running);
        assert_eq!(record.check_count, 0);
        assert!(record.status.is_monitorable());
    }

    #[test]
    fn test_record_json_defaults() {
        // A seed file only needs connection info; status and counters default.
        let json = r#"{
            "id": "svc-1",
            "name": "storage",
            "address": "127.0.0.1",
            "managementPort": 8081
        }"#;
        let record: ServiceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, ServiceStatus::Running);
        assert_eq!(record.check_count, 0);
        assert_eq!(record.protocol, Protocol::Http);
        assert!(record.service_port.is_none());
    }
}
