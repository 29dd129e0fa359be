//! Error types for the service monitor collaborators.
//!
//! Each external collaborator (configuration store, registry, audit sink)
//! gets its own error enum so callers can decide per-concern whether a
//! failure is fatal. Probe failures are deliberately not represented here:
//! they are a classification, not an error, and live with the probe itself.

use crate::types::ServiceId;
use thiserror::Error;

/// Errors from the configuration store collaborator.
///
/// Any of these is fatal to `ServiceMonitor::start` - the loop must not run
/// with unvalidated thresholds.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration item missing: {category}/{item}")]
    MissingItem { category: String, item: String },

    #[error("configuration item '{item}' has non-integer value '{value}'")]
    InvalidValue { item: String, value: String },

    #[error("configuration store error: {0}")]
    Store(String),

    #[error("configuration store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Errors from registry write-backs.
///
/// The monitor treats these as best-effort: a failed write is logged and the
/// state is re-derived on the next round from whatever the registry holds.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("service not found: {id}")]
    NotFound { id: ServiceId },
}

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Errors from the audit sink collaborator.
///
/// Always logged and swallowed by the monitor; an audit failure never aborts
/// a round.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("audit sink rejected event: {0}")]
    Sink(String),
}

/// Result type for audit operations.
pub type AuditResult<T> = std::result::Result<T, AuditError>;
