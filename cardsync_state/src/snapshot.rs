//! `(id, version, parentVersion?, timestamp, data, checksum)` — a versioned,
//! checksum-protected immutable view of replicated state (spec.md §3).

use cardsync_core::VectorClock;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use uuid::Uuid;

use crate::checksum::Checksum;
use crate::error::{SerializeSnafu, StateResult};

/// A content-free unique snapshot handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(String);
impl SnapshotId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<String> for SnapshotId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
impl From<&str> for SnapshotId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A versioned, checksum-protected view of caller-opaque `Data`.
///
/// Snapshots are never mutated in place: every transition through
/// `cardsync_replication::StateManager` produces a new one linked to its
/// parent by `parent_version`, never rewrites an existing entry.
/// Also the §6 point-3 wire shape for snapshot exchange: a peer serializes
/// one of these as `{id, version, parentVersion, timestamp, data,
/// checksum}` and re-injects it via `StateManager::merge_remote_state`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateSnapshot<Data> {
    pub id: SnapshotId,
    pub version: VectorClock,
    #[serde(rename = "parentVersion")]
    pub parent_version: Option<VectorClock>,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
    pub data: Data,
    pub checksum: Checksum,
}
impl<Data: Serialize> StateSnapshot<Data> {
    pub fn new(
        id: SnapshotId,
        version: VectorClock,
        parent_version: Option<VectorClock>,
        timestamp_ms: u64,
        data: Data,
    ) -> StateResult<Self> {
        let checksum = Checksum::of_json_bytes(&data).context(SerializeSnafu)?;
        Ok(Self {
            id,
            version,
            parent_version,
            timestamp_ms,
            data,
            checksum,
        })
    }

    /// Recomputes the digest over `self.data` and compares it to the stored
    /// checksum. `false` means the snapshot was tampered with after creation.
    pub fn validate_checksum(&self) -> bool {
        match Checksum::of_json_bytes(&self.data) {
            Ok(recomputed) => recomputed == self.checksum,
            Err(_) => false,
        }
    }
}
