//! Applies, transforms, and deduplicates operations; owns tombstones, the
//! applied set, and the residual buffer.
//!
//! One `OTEngine` per replica. It never mutates domain state itself — that
//! is [`cardsync_state`]/[`cardsync_replication`]'s job — it is only the
//! gatekeeper for whether the host should proceed with applying an
//! operation to its `StateManager`.

use std::time::{SystemTime, UNIX_EPOCH};

use ahash::{AHashMap, AHashSet};
use tracing::{debug, warn};

use crate::{
    clock::{ClockOrdering, VectorClock},
    errors::RejectReason,
    model::{self, EntityId, Operation, OperationId},
    transform::TransformMatrix,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tombstone {
    pub entity_id: EntityId,
    pub deleted_at_ms: u64,
    pub deleted_by: crate::clock::ClientId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct EngineStats {
    pub applied_operations: usize,
    pub buffered_residuals: usize,
    pub tombstones: usize,
    pub registered_pairs: usize,
}

pub struct OTEngine {
    matrix: TransformMatrix,
    applied: AHashSet<OperationId>,
    tombstones: AHashMap<EntityId, Tombstone>,
    buffer: Vec<Operation>,
}
impl OTEngine {
    pub fn new() -> Self {
        Self {
            matrix: TransformMatrix::with_default_functions(),
            applied: AHashSet::new(),
            tombstones: AHashMap::new(),
            buffer: Vec::new(),
        }
    }

    /// Transform `op` against every operation in `concurrent_ops` believed
    /// to be concurrent with it, skipping any that are already applied or
    /// whose entity is tombstoned. Pure except for appending to the residual
    /// buffer; does **not** apply `op`.
    pub fn transform(&mut self, op: &Operation, concurrent_ops: &[Operation]) -> Operation {
        let mut current = op.clone();
        for other in concurrent_ops {
            if self.applied.contains(&other.id()) {
                continue;
            }
            if let Some(entity) = other.entity_id() {
                if self.tombstones.contains_key(&entity) {
                    continue;
                }
            }
            let transform_fn = self.matrix.lookup(current.kind(), other.kind());
            let outcome = transform_fn(&current, other);
            current = outcome.transformed;
            if let Some(residual) = outcome.residual {
                self.buffer.push(residual);
            }
        }
        current
    }

    /// Accept `op` into the applied set, returning `true` iff it was newly
    /// accepted. Rejects silently (returns `false`, never an `Err`) on
    /// structural invalidity, duplicate identity, or a tombstoned entity.
    pub fn apply(&mut self, op: &Operation) -> bool {
        if !model::validate(op) {
            let reasons = model::validation_errors(op);
            warn!(
                client = %op.client_id,
                reason = ?RejectReason::InvalidOperation,
                detail = reasons.as_ref().map(ToString::to_string),
                "rejecting operation"
            );
            return false;
        }
        let id = op.id();
        if self.applied.contains(&id) {
            debug!(client = %op.client_id, reason = ?RejectReason::AlreadyApplied, "rejecting operation");
            return false;
        }
        if let Some(entity) = op.entity_id() {
            if self.tombstones.contains_key(&entity) {
                debug!(client = %op.client_id, reason = ?RejectReason::EntityTombstoned, "rejecting operation");
                return false;
            }
        }
        self.applied.insert(id);
        true
    }

    /// Tombstones `entity_id`, stamping the deletion with the current wall
    /// clock time (the engine is the sole authority on "now", matching
    /// `StateManager`'s own internal timestamping for snapshots).
    pub fn add_tombstone(&mut self, entity_id: EntityId, deleted_by: crate::clock::ClientId) {
        let deleted_at_ms = now_ms();
        debug!(?entity_id, %deleted_by, deleted_at_ms, "entity tombstoned");
        self.tombstones.insert(
            entity_id.clone(),
            Tombstone {
                entity_id,
                deleted_at_ms,
                deleted_by,
            },
        );
    }

    pub fn is_tombstoned(&self, entity_id: &EntityId) -> bool {
        self.tombstones.contains_key(entity_id)
    }

    pub fn compare_vector_clocks(&self, a: &VectorClock, b: &VectorClock) -> ClockOrdering {
        a.compare(b)
    }

    pub fn get_buffer(&self) -> &[Operation] {
        &self.buffer
    }

    pub fn clear_buffer(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.buffer)
    }

    /// Clears `applied`, `tombstones`, and `buffer`; keeps the transform
    /// matrix, since it is immutable and construction-time only.
    pub fn reset(&mut self) {
        self.applied.clear();
        self.tombstones.clear();
        self.buffer.clear();
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            applied_operations: self.applied.len(),
            buffered_residuals: self.buffer.len(),
            tombstones: self.tombstones.len(),
            registered_pairs: self.matrix.registered_count(),
        }
    }
}
impl Default for OTEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_millis() as u64
}
