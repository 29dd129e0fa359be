//! The per-service health state machine.
//!
//! A pure function of (current status, current check_count, probe outcome).
//! The scheduler owns no per-service timers; it just applies this after
//! every probe, which keeps the transition rules independently testable.

use crate::probe::ProbeOutcome;
use svcmon_common::ServiceStatus;

/// Result of applying one probe outcome to a service's health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: ServiceStatus,
    pub check_count: u32,
    /// True when the service has exhausted its attempts and must be marked
    /// failed and audited.
    pub evict: bool,
}

/// Applies a probe outcome to a service's current health state.
///
/// Returns `None` for services that are not under monitoring (`Failed`,
/// `Shutdown`): those must not be probed, and nothing mutates them.
///
/// The eviction comparison is strictly greater-than: a service sitting at
/// exactly `max_attempts` consecutive failures is still `Doubtful`; only
/// the next failure evicts it.
pub fn apply_probe(
    status: ServiceStatus,
    check_count: u32,
    outcome: &ProbeOutcome,
    max_attempts: u32,
) -> Option<Transition> {
    if !status.is_monitorable() {
        return None;
    }

    if outcome.is_healthy() {
        return Some(Transition {
            status: ServiceStatus::Running,
            check_count: 1,
            evict: false,
        });
    }

    let next_count = check_count.saturating_add(1);
    Some(Transition {
        status: ServiceStatus::Doubtful,
        check_count: next_count,
        evict: next_count > max_attempts,
    })
}
