//! Audit sink collaborator.
//!
//! The monitor emits one audit record per eviction. The sink may itself
//! fail; the monitor logs and swallows such failures, so no implementation
//! here needs to be reliable - only honest about errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use svcmon_common::AuditResult;
use tracing::warn;

/// Audit event code for a service marked failed by the monitor.
pub const SERVICE_FAILURE: &str = "SRVFL";

/// One recorded audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub code: String,
    pub details: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// Destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Emits a failure event with a JSON details payload.
    async fn failure(&self, code: &str, details: serde_json::Value) -> AuditResult<()>;
}

/// Audit sink that writes events to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

impl LogAuditSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn failure(&self, code: &str, details: serde_json::Value) -> AuditResult<()> {
        warn!(code, details = %details, "audit failure event");
        Ok(())
    }
}

/// Audit sink that captures events in memory, for tests and diagnostics.
#[derive(Clone, Default)]
pub struct MemoryAuditSink {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn failure(&self, code: &str, details: serde_json::Value) -> AuditResult<()> {
        self.events.write().push(AuditEvent {
            code: code.to_string(),
            details,
            recorded_at: Utc::now(),
        });
        Ok(())
    }
}
