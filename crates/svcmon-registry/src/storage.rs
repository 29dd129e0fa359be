//! Thread-safe in-memory storage for the service registry.

use crate::record::ServiceRecord;
use dashmap::DashMap;
use std::sync::Arc;
use svcmon_common::{RegistryError, RegistryResult, ServiceId, ServiceStatus};
use tracing::info;

/// In-memory service registry.
///
/// Cloning is cheap: all clones share the same underlying map, so the
/// monitor task and registration handlers can each hold one. DashMap gives
/// interior mutability, so every method takes `&self`.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: Arc<DashMap<ServiceId, ServiceRecord>>,
}

impl ServiceRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            services: Arc::new(DashMap::new()),
        }
    }

    /// Registers a service, or re-registers it under an existing id.
    ///
    /// Re-registration re-enters the record into monitoring: status goes
    /// back to `Running` and the consecutive-failure counter restarts,
    /// whatever the previous record held.
    pub fn register(&self, mut record: ServiceRecord) {
        record.status = ServiceStatus::Running;
        record.check_count = 0;

        if self.services.insert(record.id.clone(), record.clone()).is_some() {
            info!(service = %record.id, "Re-registered service");
        } else {
            info!(service = %record.id, name = %record.name, "Registered new service");
        }
    }

    /// Returns a copy of a single record.
    pub fn get(&self, id: &ServiceId) -> Option<ServiceRecord> {
        self.services.get(id).map(|entry| entry.clone())
    }

    /// Returns a snapshot of every registered service.
    pub fn all(&self) -> Vec<ServiceRecord> {
        self.services.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Returns a snapshot of the services the monitor should probe this
    /// round (status `Running` or `Doubtful`).
    pub fn monitorable(&self) -> Vec<ServiceRecord> {
        self.services
            .iter()
            .filter(|entry| entry.status.is_monitorable())
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Writes a probe-driven health update back to a record.
    pub fn update_health(
        &self,
        id: &ServiceId,
        status: ServiceStatus,
        check_count: u32,
    ) -> RegistryResult<()> {
        let mut entry = self
            .services
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound { id: id.clone() })?;
        entry.status = status;
        entry.check_count = check_count;
        Ok(())
    }

    /// Marks a service permanently failed. The record stays in the registry
    /// so its terminal state remains visible, but the monitor will no longer
    /// probe it.
    pub fn mark_as_failed(&self, id: &ServiceId) -> RegistryResult<()> {
        let mut entry = self
            .services
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound { id: id.clone() })?;
        entry.status = ServiceStatus::Failed;
        info!(service = %id, name = %entry.name, "Marked service as failed");
        Ok(())
    }

    /// Removes a service from the registry.
    pub fn unregister(&self, id: &ServiceId) -> RegistryResult<ServiceRecord> {
        let (_, record) = self
            .services
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound { id: id.clone() })?;
        info!(service = %id, "Unregistered service");
        Ok(record)
    }

    /// Number of registered services, in any status.
    pub fn count(&self) -> usize {
        self.services.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcmon_common::Protocol;

    fn record(id: &str) -> ServiceRecord {
        ServiceRecord::new(id, id, "localhost", 8081, Protocol::Http)
    }

    #[test]
    fn test_register_and_get() {
        let registry = ServiceRegistry::new();
        registry.register(record("svc-1"));

        let fetched = registry.get(&ServiceId::from("svc-1")).unwrap();
        assert_eq!(fetched.name, "svc-1");
        assert_eq!(fetched.status, ServiceStatus::Running);
    }

    #[test]
    fn test_monitorable_filters_terminal_statuses() {
        let registry = ServiceRegistry::new();
        registry.register(record("running"));
        registry.register(record("doubtful"));
        registry.register(record("failed"));

        registry
            .update_health(&ServiceId::from("doubtful"), ServiceStatus::Doubtful, 3)
            .unwrap();
        registry.mark_as_failed(&ServiceId::from("failed")).unwrap();

        let monitorable = registry.monitorable();
        assert_eq!(monitorable.len(), 2);
        assert!(monitorable.iter().all(|r| r.status.is_monitorable()));
    }

    #[test]
    fn test_update_health_missing_service() {
        let registry = ServiceRegistry::new();
        let result = registry.update_health(&ServiceId::from("ghost"), ServiceStatus::Doubtful, 1);
        assert!(matches!(result, Err(RegistryError::NotFound { .. })));
    }

    #[test]
    fn test_mark_as_failed_keeps_record() {
        let registry = ServiceRegistry::new();
        registry.register(record("svc-1"));
        registry.mark_as_failed(&ServiceId::from("svc-1")).unwrap();

        let fetched = registry.get(&ServiceId::from("svc-1")).unwrap();
        assert_eq!(fetched.status, ServiceStatus::Failed);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_reregistration_resets_health_tracking() {
        let registry = ServiceRegistry::new();
        let id = ServiceId::from("svc-1");

        registry.register(record("svc-1"));
        registry.update_health(&id, ServiceStatus::Doubtful, 9).unwrap();
        registry.mark_as_failed(&id).unwrap();

        // The service comes back (e.g. restarted and re-registered).
        registry.register(record("svc-1"));

        let fetched = registry.get(&id).unwrap();
        assert_eq!(fetched.status, ServiceStatus::Running);
        assert_eq!(fetched.check_count, 0);
    }

    #[test]
    fn test_unregister() {
        let registry = ServiceRegistry::new();
        registry.register(record("svc-1"));

        registry.unregister(&ServiceId::from("svc-1")).unwrap();
        assert!(registry.get(&ServiceId::from("svc-1")).is_none());
        assert!(registry.unregister(&ServiceId::from("svc-1")).is_err());
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        use tokio::task;

        let registry = ServiceRegistry::new();
        let mut handles = vec![];

        for i in 0..10 {
            let registry = registry.clone();
            handles.push(task::spawn(async move {
                registry.register(record(&format!("svc-{}", i)));
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.count(), 10);
    }
}
