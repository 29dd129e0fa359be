//! # svcmon-monitor
//!
//! The failure detector for the service registry.
//!
//! A single background task probes every `Running`/`Doubtful` service over
//! HTTP once per round, applies a small per-service state machine, and
//! marks services that exhaust their ping attempts as `Failed`, emitting an
//! audit record for each eviction.
//!
//! This crate provides:
//! - `HealthProbe` / `HttpHealthProbe`: one bounded-timeout liveness request
//! - `apply_probe`: the pure status-transition function
//! - `MonitorConfig` and the `ConfigStore` collaborator
//! - `AuditSink` collaborator with logging and in-memory implementations
//! - `ServiceMonitor`: the owned loop object with `start`/`stop`

pub mod audit;
pub mod config;
pub mod monitor;
pub mod probe;
pub mod transition;

pub use audit::{AuditEvent, AuditSink, LogAuditSink, MemoryAuditSink, SERVICE_FAILURE};
pub use config::{ConfigStore, FileConfigStore, MemoryConfigStore, MonitorConfig};
pub use monitor::ServiceMonitor;
pub use probe::{HealthProbe, HttpHealthProbe, ProbeFailure, ProbeOutcome};
pub use transition::{apply_probe, Transition};

use svcmon_common::ConfigError;
use thiserror::Error;

/// Errors surfaced by the monitor's lifecycle entry points.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Thresholds could not be loaded or parsed; the loop will not run.
    #[error("monitor configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("monitor is already running")]
    AlreadyRunning,

    #[error("monitor is not running")]
    NotRunning,
}

/// Result type for monitor lifecycle operations.
pub type MonitorResult<T> = std::result::Result<T, MonitorError>;
