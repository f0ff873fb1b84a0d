//! Structured errors for `cardsync_state`.
//!
//! Per the source spec's error taxonomy (§7), these two variants are the
//! only ones that surface as `Err`: everything else in this core (rejected
//! operations, tombstoned entities) is silent by design. Both are fatal at
//! the call site — there is no retry story inside this crate.

use snafu::{Location, prelude::*};

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StateError {
    #[snafu(display("no snapshot registered under id {id} ({location})"))]
    StateNotFound {
        id: String,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("snapshot {id} failed checksum validation ({location})"))]
    InvalidChecksum {
        id: String,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to serialize snapshot data: {source}"))]
    Serialize {
        source: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },
}
