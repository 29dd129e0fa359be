//! The monitor loop.
//!
//! A single background task owns the round schedule: snapshot the
//! monitorable services, probe them concurrently, apply the transition
//! function, write results back, evict and audit on threshold breach, then
//! sleep. `stop` cancels the in-progress sleep or the next round's start;
//! work already committed in a partial round stands.

use crate::audit::{AuditSink, SERVICE_FAILURE};
use crate::config::{ConfigStore, MonitorConfig};
use crate::probe::{HealthProbe, HttpHealthProbe, ProbeOutcome};
use crate::transition::apply_probe;
use crate::{MonitorError, MonitorResult};
use std::sync::Arc;
use svcmon_registry::{RegistryView, ServiceRecord};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The failure detector.
///
/// Explicitly constructed and owned; multiple instances (e.g. in tests) do
/// not collide. `start` loads the thresholds and launches the loop task,
/// `stop` cancels it and waits for the cancellation to be acknowledged.
pub struct ServiceMonitor {
    registry: Arc<dyn RegistryView>,
    config_store: Arc<dyn ConfigStore>,
    audit: Arc<dyn AuditSink>,
    probe: Arc<dyn HealthProbe>,
    config: Option<MonitorConfig>,
    cancel_token: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl ServiceMonitor {
    /// Creates a monitor probing over HTTP.
    pub fn new(
        registry: Arc<dyn RegistryView>,
        config_store: Arc<dyn ConfigStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            registry,
            config_store,
            audit,
            probe: Arc::new(HttpHealthProbe::new()),
            config: None,
            cancel_token: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Replaces the probe implementation. Tests use this to script outcomes.
    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Effective thresholds, available after a successful `start`.
    pub fn config(&self) -> Option<MonitorConfig> {
        self.config
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Loads and validates the thresholds, then launches the loop task.
    ///
    /// Fails with `MonitorError::Config` if the stored values cannot be
    /// parsed; the loop never runs with unvalidated thresholds.
    pub async fn start(&mut self) -> MonitorResult<()> {
        if self.task_handle.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }

        let config = MonitorConfig::load(self.config_store.as_ref()).await?;
        self.config = Some(config);

        self.cancel_token = CancellationToken::new();
        let token = self.cancel_token.clone();
        let registry = Arc::clone(&self.registry);
        let audit = Arc::clone(&self.audit);
        let probe = Arc::clone(&self.probe);

        self.task_handle = Some(tokio::spawn(async move {
            monitor_loop(registry, audit, probe, config, token).await;
        }));

        info!(
            sleep_interval = config.sleep_interval.as_secs(),
            ping_timeout = config.ping_timeout.as_secs(),
            max_attempts = config.max_attempts,
            "Service monitor started"
        );
        Ok(())
    }

    /// Cancels the loop and waits until it has wound down.
    ///
    /// Returns promptly even when called mid-sleep: the inter-round sleep is
    /// a cancellation point, and in-flight probes are bounded by the ping
    /// timeout.
    pub async fn stop(&mut self) -> MonitorResult<()> {
        let handle = self.task_handle.take().ok_or(MonitorError::NotRunning)?;
        self.cancel_token.cancel();

        if let Err(e) = handle.await {
            if e.is_panic() {
                error!(error = %e, "monitor loop panicked");
            }
        }

        info!("Service monitor stopped");
        Ok(())
    }
}

impl Drop for ServiceMonitor {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn monitor_loop(
    registry: Arc<dyn RegistryView>,
    audit: Arc<dyn AuditSink>,
    probe: Arc<dyn HealthProbe>,
    config: MonitorConfig,
    cancel_token: CancellationToken,
) {
    let mut round: u64 = 0;
    loop {
        round += 1;
        debug!(
            round,
            sleep_interval = config.sleep_interval.as_secs(),
            ping_timeout = config.ping_timeout.as_secs(),
            max_attempts = config.max_attempts,
            "Starting service monitoring round"
        );

        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = run_round(&registry, &audit, &probe, &config) => {}
        }

        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = tokio::time::sleep(config.sleep_interval) => {}
        }
    }
    debug!(round, "Monitor loop cancelled");
}

/// One full pass over the monitorable services.
///
/// Probes run concurrently; one service's failure never affects the
/// others. Registry write failures and audit failures are logged and
/// swallowed - the next round re-derives state from the registry.
async fn run_round(
    registry: &Arc<dyn RegistryView>,
    audit: &Arc<dyn AuditSink>,
    probe: &Arc<dyn HealthProbe>,
    config: &MonitorConfig,
) {
    let services = registry.list_monitorable_services().await;

    let mut probes: JoinSet<(ServiceRecord, ProbeOutcome)> = JoinSet::new();
    for record in services {
        if !record.status.is_monitorable() {
            continue;
        }
        let probe = Arc::clone(probe);
        let ping_timeout = config.ping_timeout;
        probes.spawn(async move {
            let outcome = probe.probe(&record, ping_timeout).await;
            (record, outcome)
        });
    }

    while let Some(joined) = probes.join_next().await {
        let (record, outcome) = match joined {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "probe task failed to complete");
                continue;
            }
        };

        let Some(transition) =
            apply_probe(record.status, record.check_count, &outcome, config.max_attempts)
        else {
            continue;
        };

        match &outcome {
            ProbeOutcome::Healthy { uptime_secs } => {
                debug!(service = %record.id, uptime_secs, "service is healthy");
            }
            ProbeOutcome::Unhealthy { reason } => {
                info!(
                    service = %record.id,
                    check_count = transition.check_count,
                    reason = %reason,
                    "marked service as doubtful"
                );
            }
        }

        if let Err(e) = registry
            .update_status(&record.id, transition.status, transition.check_count)
            .await
        {
            warn!(service = %record.id, error = %e, "failed to write health update");
        }

        if transition.evict {
            match registry.mark_as_failed(&record.id).await {
                Ok(()) => info!(
                    service = %record.id,
                    name = %record.name,
                    check_count = transition.check_count,
                    "evicted unresponsive service"
                ),
                Err(e) => warn!(service = %record.id, error = %e, "failed to mark service failed"),
            }

            let details = serde_json::json!({ "name": record.name });
            if let Err(e) = audit.failure(SERVICE_FAILURE, details).await {
                warn!(service = %record.name, error = %e, "failed to audit service failure");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::config::{MemoryConfigStore, CONFIG_CATEGORY};
    use svcmon_registry::ServiceRegistry;

    fn monitor_with(store: MemoryConfigStore) -> ServiceMonitor {
        ServiceMonitor::new(
            Arc::new(ServiceRegistry::new()),
            Arc::new(store),
            Arc::new(MemoryAuditSink::new()),
        )
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let mut monitor = monitor_with(MemoryConfigStore::new());

        monitor.start().await.unwrap();
        assert!(monitor.is_running());
        assert!(matches!(
            monitor.start().await,
            Err(MonitorError::AlreadyRunning)
        ));

        monitor.stop().await.unwrap();
        assert!(!monitor.is_running());
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let mut monitor = monitor_with(MemoryConfigStore::new());
        assert!(matches!(monitor.stop().await, Err(MonitorError::NotRunning)));
    }

    #[tokio::test]
    async fn test_unparsable_config_is_fatal_to_start() {
        let store = MemoryConfigStore::new();
        store.set_item(CONFIG_CATEGORY, "max_attempts", "lots");

        let mut monitor = monitor_with(store);
        assert!(matches!(
            monitor.start().await,
            Err(MonitorError::Config(_))
        ));
        assert!(!monitor.is_running());
        assert!(monitor.config().is_none());
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let mut monitor = monitor_with(MemoryConfigStore::new());

        monitor.start().await.unwrap();
        monitor.stop().await.unwrap();
        monitor.start().await.unwrap();
        assert!(monitor.is_running());
        monitor.stop().await.unwrap();
    }
}
