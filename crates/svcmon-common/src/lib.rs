//! # svcmon-common
//!
//! Core domain types and error taxonomy shared by the service monitor crates.
//!
//! This crate provides:
//! - Service identity and status types (`ServiceId`, `ServiceStatus`)
//! - The probe transport protocol (`Protocol`)
//! - Error enums for the external collaborators (config store, registry, audit)

pub mod errors;
pub mod types;

pub use errors::{AuditError, AuditResult, ConfigError, ConfigResult, RegistryError, RegistryResult};
pub use types::{Protocol, ServiceId, ServiceStatus};
