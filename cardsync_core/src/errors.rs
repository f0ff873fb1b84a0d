//! The error taxonomy for `cardsync_core`.
//!
//! Per the source spec's propagation policy: `InvalidOperation`,
//! `AlreadyApplied`, and `EntityTombstoned` are *silent* — they describe
//! expected consequences of concurrent, late, or duplicated delivery, and
//! are surfaced as a `false` return from [`crate::engine::OTEngine::apply`],
//! never as an `Err`. [`RejectReason`] exists purely so callers and
//! `tracing` spans can distinguish *why* `apply` returned `false` without
//! the core raising a structured error for something that is not a failure.
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    InvalidOperation,
    AlreadyApplied,
    EntityTombstoned,
}
impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::InvalidOperation => "invalid operation",
            RejectReason::AlreadyApplied => "already applied",
            RejectReason::EntityTombstoned => "entity tombstoned",
        };
        write!(f, "{s}")
    }
}
