//! # svcmon-registry
//!
//! Service registry for the failure detector.
//!
//! This crate provides:
//! - `ServiceRecord`: the per-service record the registry owns
//! - `ServiceRegistry`: thread-safe in-memory storage (DashMap)
//! - `RegistryView`: the narrow read/write seam the monitor consumes
//!
//! Registration and deregistration are driven externally; the monitor only
//! enumerates monitorable services and writes health updates back.

pub mod record;
pub mod storage;
pub mod view;

pub use record::ServiceRecord;
pub use storage::ServiceRegistry;
pub use view::RegistryView;
