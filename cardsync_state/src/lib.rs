#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
//! Versioned, checksum-protected state snapshots.
//!
//! A [`StateSnapshot`] wraps an opaque, caller-supplied `Data` payload with
//! the bookkeeping `cardsync_replication`'s `StateManager` needs to keep a
//! history DAG: a vector-clock version, an optional parent version, and a
//! digest over the canonically serialized data.

pub mod checksum;
pub mod error;
pub mod snapshot;

pub use checksum::Checksum;
pub use error::{StateError, StateResult};
pub use snapshot::{SnapshotId, StateSnapshot};
