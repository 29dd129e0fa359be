//! The registry seam the monitor consumes.

use crate::record::ServiceRecord;
use crate::storage::ServiceRegistry;
use async_trait::async_trait;
use svcmon_common::{RegistryResult, ServiceId, ServiceStatus};

/// Read/write view of the registry, as seen by the failure detector.
///
/// The monitor never enumerates or mutates anything beyond this trait:
/// it reads a snapshot of monitorable services each round and writes
/// probe-driven status updates back. Keeping the seam narrow lets tests
/// substitute a scripted registry without touching the monitor loop.
#[async_trait]
pub trait RegistryView: Send + Sync {
    /// Snapshot of services whose status is `Running` or `Doubtful`.
    ///
    /// The snapshot is stable for the duration of a round: concurrent
    /// registry mutation affects the next round, not the one in flight.
    async fn list_monitorable_services(&self) -> Vec<ServiceRecord>;

    /// Writes a status/check_count update for one service.
    async fn update_status(
        &self,
        id: &ServiceId,
        status: ServiceStatus,
        check_count: u32,
    ) -> RegistryResult<()>;

    /// Marks a service permanently failed.
    async fn mark_as_failed(&self, id: &ServiceId) -> RegistryResult<()>;
}

#[async_trait]
impl RegistryView for ServiceRegistry {
    async fn list_monitorable_services(&self) -> Vec<ServiceRecord> {
        self.monitorable()
    }

    async fn update_status(
        &self,
        id: &ServiceId,
        status: ServiceStatus,
        check_count: u32,
    ) -> RegistryResult<()> {
        self.update_health(id, status, check_count)
    }

    async fn mark_as_failed(&self, id: &ServiceId) -> RegistryResult<()> {
        ServiceRegistry::mark_as_failed(self, id)
    }
}
