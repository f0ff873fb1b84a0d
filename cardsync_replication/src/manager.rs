//! `StateManager<Data>` — one replica's view of versioned, checksum-protected
//! game state, plus the DAG of historical snapshots it accumulates.

use std::time::{SystemTime, UNIX_EPOCH};

use ahash::AHashMap;
use cardsync_core::{ClientId, ClockOrdering, VectorClock};
use cardsync_state::{SnapshotId, StateResult, StateSnapshot};
use serde::Serialize;
use smallvec::SmallVec;
use snafu::prelude::*;
use tracing::debug;

use cardsync_state::error::{InvalidChecksumSnafu, StateNotFoundSnafu};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryMetadata {
    pub state_count: usize,
    pub has_head: bool,
}

/// One replica's view of the replicated state: the full set of snapshots it
/// has ever seen, a `head` pointer to the latest one, and the merged
/// vector clock reflecting every counter this replica has observed.
pub struct StateManager<Data> {
    client_id: ClientId,
    snapshots: AHashMap<SnapshotId, StateSnapshot<Data>>,
    /// `parentVersion -> version` edges, indexed by the parent's id, for
    /// DAG traversal. Most snapshots have at most a couple of direct
    /// children (forks from concurrent local/remote edits), so a small
    /// inline buffer avoids a heap allocation in the common case.
    children: AHashMap<SnapshotId, SmallVec<[SnapshotId; 4]>>,
    head: Option<SnapshotId>,
    clock: VectorClock,
}

impl<Data: Clone + Serialize> StateManager<Data> {
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            snapshots: AHashMap::new(),
            children: AHashMap::new(),
            head: None,
            clock: VectorClock::new(),
        }
    }

    pub fn get_client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Builds a root snapshot with `version = {clientId: 0}` and
    /// `parentVersion = None`, registers it, and sets `head`.
    pub fn create_state(&mut self, data: Data, id: Option<SnapshotId>) -> StateResult<&StateSnapshot<Data>> {
        let id = id.unwrap_or_else(SnapshotId::generate);
        let snapshot = StateSnapshot::new(id.clone(), VectorClock::new(), None, now_ms(), data)?;
        self.register(snapshot);
        self.head = Some(id.clone());
        debug!(%id, "head set by create_state");
        Ok(self.snapshots.get(&id).expect("just inserted"))
    }

    /// Deep-copies `fromId`'s data, runs `mutator` against the copy,
    /// increments this replica's own counter, and registers the result as a
    /// new snapshot linked to the parent. The parent itself is never
    /// mutated.
    pub fn update_state(
        &mut self,
        from_id: &SnapshotId,
        mutator: impl FnOnce(&mut Data),
    ) -> StateResult<&StateSnapshot<Data>> {
        let parent = self
            .snapshots
            .get(from_id)
            .with_context(|| StateNotFoundSnafu {
                id: from_id.as_str().to_owned(),
            })?;
        let mut draft = parent.data.clone();
        let parent_version = parent.version.clone();
        mutator(&mut draft);

        self.clock.increment(&self.client_id);
        let version = self.clock.clone();
        let id = SnapshotId::generate();
        let snapshot = StateSnapshot::new(id.clone(), version, Some(parent_version), now_ms(), draft)?;
        self.register_with_parent(snapshot, from_id.clone());
        self.head = Some(id.clone());
        debug!(%id, parent = %from_id, "head set by update_state");
        Ok(self.snapshots.get(&id).expect("just inserted"))
    }

    /// Validates the incoming checksum, merges it into the history DAG, and
    /// advances `head` according to the deterministic head-update rule.
    pub fn merge_remote_state(&mut self, remote: StateSnapshot<Data>) -> StateResult<&StateSnapshot<Data>> {
        ensure!(
            remote.validate_checksum(),
            InvalidChecksumSnafu {
                id: remote.id.as_str().to_owned(),
            }
        );
        if self.snapshots.contains_key(&remote.id) {
            return Ok(self.snapshots.get(&remote.id).expect("just checked"));
        }

        let id = remote.id.clone();
        self.clock = self.clock.merge(&remote.version);

        let should_advance_head = match &self.head {
            None => true,
            Some(head_id) => {
                let head = self.snapshots.get(head_id).expect("head always registered");
                match remote.version.compare(&head.version) {
                    ClockOrdering::Greater => remote.timestamp_ms >= head.timestamp_ms,
                    ClockOrdering::Concurrent => {
                        remote.timestamp_ms > head.timestamp_ms
                            || (remote.timestamp_ms == head.timestamp_ms && remote.id.as_str() < head_id.as_str())
                    }
                    ClockOrdering::Less | ClockOrdering::Equal => false,
                }
            }
        };

        let parent_id = remote.parent_version.clone().and_then(|parent_version| {
            self.snapshots
                .values()
                .find(|s| s.version == parent_version)
                .map(|s| s.id.clone())
        });
        match parent_id {
            Some(parent_id) => self.register_with_parent(remote, parent_id),
            None => self.register(remote),
        }

        if should_advance_head {
            self.head = Some(id.clone());
            debug!(%id, "head set by merge_remote_state");
        }
        Ok(self.snapshots.get(&id).expect("just inserted"))
    }

    /// Exact match first; otherwise the snapshot with the largest version
    /// that is `Less` or `Equal` to `version`. This keeps the
    /// ancestor-fallback behavior rather than a strict exact-or-null read.
    pub fn get_state_at_version(&self, version: &VectorClock) -> Option<&StateSnapshot<Data>> {
        let mut best: Option<&StateSnapshot<Data>> = None;
        for snapshot in self.snapshots.values() {
            let ord = snapshot.version.compare(version);
            if ord != ClockOrdering::Less && ord != ClockOrdering::Equal {
                continue;
            }
            best = match best {
                None => Some(snapshot),
                Some(current) => match snapshot.version.compare(&current.version) {
                    ClockOrdering::Greater => Some(snapshot),
                    ClockOrdering::Concurrent => {
                        if snapshot.timestamp_ms > current.timestamp_ms
                            || (snapshot.timestamp_ms == current.timestamp_ms
                                && snapshot.id.as_str() < current.id.as_str())
                        {
                            Some(snapshot)
                        } else {
                            Some(current)
                        }
                    }
                    _ => Some(current),
                },
            };
        }
        best
    }

    pub fn validate_checksum(&self, snapshot: &StateSnapshot<Data>) -> bool {
        snapshot.validate_checksum()
    }

    /// All snapshots ordered by timestamp, ties broken by id for a stable
    /// order across calls.
    pub fn get_history(&self) -> Vec<&StateSnapshot<Data>> {
        let mut all: Vec<&StateSnapshot<Data>> = self.snapshots.values().collect();
        all.sort_by(|a, b| a.timestamp_ms.cmp(&b.timestamp_ms).then_with(|| a.id.as_str().cmp(b.id.as_str())));
        all
    }

    pub fn get_history_metadata(&self) -> HistoryMetadata {
        HistoryMetadata {
            state_count: self.snapshots.len(),
            has_head: self.head.is_some(),
        }
    }

    pub fn head(&self) -> Option<&StateSnapshot<Data>> {
        self.head.as_ref().and_then(|id| self.snapshots.get(id))
    }

    /// Direct children of `id` in the history DAG, i.e. snapshots whose
    /// `parent_version` matches `id`'s version.
    pub fn children_of(&self, id: &SnapshotId) -> &[SnapshotId] {
        self.children.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn clear_history(&mut self) {
        self.snapshots.clear();
        self.children.clear();
        self.head = None;
    }

    fn register(&mut self, snapshot: StateSnapshot<Data>) {
        self.snapshots.insert(snapshot.id.clone(), snapshot);
    }

    fn register_with_parent(&mut self, snapshot: StateSnapshot<Data>, parent_id: SnapshotId) {
        let id = snapshot.id.clone();
        self.snapshots.insert(id.clone(), snapshot);
        self.children.entry(parent_id).or_default().push(id);
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardsync_state::SnapshotId;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Board {
        life: i64,
    }

    fn manager() -> StateManager<Board> {
        StateManager::new(ClientId::from("c1"))
    }

    #[test]
    fn create_state_sets_head_with_zero_version() {
        let mut mgr = manager();
        let snapshot = mgr.create_state(Board { life: 20 }, None).unwrap();
        assert!(snapshot.version.is_zero());
        assert!(snapshot.parent_version.is_none());
        let head_id = snapshot.id.clone();
        assert_eq!(mgr.head().unwrap().id, head_id);
    }

    #[test]
    fn update_state_does_not_mutate_parent() {
        let mut mgr = manager();
        let root_id = mgr.create_state(Board { life: 20 }, None).unwrap().id.clone();
        mgr.update_state(&root_id, |draft| draft.life -= 3).unwrap();
        let root = mgr.snapshots.get(&root_id).unwrap();
        assert_eq!(root.data.life, 20);
        assert_eq!(mgr.head().unwrap().data.life, 17);
    }

    #[test]
    fn update_state_unknown_parent_is_state_not_found() {
        let mut mgr = manager();
        let result = mgr.update_state(&SnapshotId::from("missing"), |draft| draft.life -= 1);
        assert!(matches!(result, Err(cardsync_state::StateError::StateNotFound { .. })));
    }

    // Vector-clock monotonicity on self (spec.md §8).
    #[test]
    fn repeated_updates_strictly_advance_own_clock() {
        let mut mgr = manager();
        let root_id = mgr.create_state(Board { life: 20 }, None).unwrap().id.clone();
        let v1 = mgr.update_state(&root_id, |d| d.life -= 1).unwrap().version.clone();
        let second_id = mgr.head().unwrap().id.clone();
        let v2 = mgr.update_state(&second_id, |d| d.life -= 1).unwrap().version.clone();
        assert_eq!(v1.compare(&v2), ClockOrdering::Less);
    }

    #[test]
    fn merge_remote_rejects_bad_checksum() {
        let mut mgr = manager();
        let mut remote = StateSnapshot::new(
            SnapshotId::generate(),
            VectorClock::new(),
            None,
            500,
            Board { life: 20 },
        )
        .unwrap();
        remote.data.life = 999; // checksum no longer matches data
        let result = mgr.merge_remote_state(remote);
        assert!(matches!(result, Err(cardsync_state::StateError::InvalidChecksum { .. })));
    }

    #[test]
    fn merge_remote_is_idempotent_on_known_id() {
        let mut mgr = manager();
        let remote = StateSnapshot::new(
            SnapshotId::from("remote-1"),
            VectorClock::new(),
            None,
            500,
            Board { life: 20 },
        )
        .unwrap();
        mgr.merge_remote_state(remote.clone()).unwrap();
        let before = mgr.get_history_metadata();
        mgr.merge_remote_state(remote).unwrap();
        assert_eq!(mgr.get_history_metadata(), before);
    }

    #[test]
    fn merge_remote_advances_head_when_strictly_newer() {
        let mut mgr = manager();
        mgr.create_state(Board { life: 20 }, Some(SnapshotId::from("local-root"))).unwrap();
        let remote_clock = VectorClock::from_pairs([(ClientId::from("c2"), 1)]);
        let remote = StateSnapshot::new(
            SnapshotId::from("remote-1"),
            remote_clock,
            None,
            u64::MAX,
            Board { life: 15 },
        )
        .unwrap();
        mgr.merge_remote_state(remote).unwrap();
        assert_eq!(mgr.head().unwrap().id, SnapshotId::from("remote-1"));
    }

    #[test]
    fn get_state_at_version_falls_back_to_nearest_ancestor() {
        let mut mgr = manager();
        let root_id = mgr.create_state(Board { life: 20 }, None).unwrap().id.clone();
        mgr.update_state(&root_id, |d| d.life -= 1).unwrap();
        let query = mgr.clock.with_incremented(&ClientId::from("c1"));
        let found = mgr.get_state_at_version(&query).unwrap();
        assert_eq!(found.id, mgr.head().unwrap().id);
    }

    #[test]
    fn clear_history_empties_everything() {
        let mut mgr = manager();
        mgr.create_state(Board { life: 20 }, None).unwrap();
        mgr.clear_history();
        assert_eq!(mgr.get_history_metadata().state_count, 0);
        assert!(mgr.head().is_none());
    }

    // Convergence (spec.md §8, T1): wires OTEngine's transform/apply together
    // with StateManager's copy-on-write updates across two independently
    // processed delivery orders and checks they land on the same board.
    mod convergence {
        use super::*;
        use cardsync_core::model::{MoveCardPayload, OperationPayload, Zone};
        use cardsync_core::{OTEngine, Operation};
        use maplit::hashmap;
        use proptest::prelude::*;

        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        struct Board {
            card_zone: std::collections::HashMap<String, Zone>,
        }

        fn move_op(client: &str, ts: u64, to: Zone) -> Operation {
            Operation::new(
                ClientId::from(client),
                ts,
                VectorClock::new(),
                OperationPayload::MoveCard(MoveCardPayload {
                    card_id: "card1".to_owned(),
                    from: Zone::Hand,
                    to,
                }),
            )
        }

        /// Processes `local` then transformed-`remote` through a fresh
        /// engine/manager pair and returns the resulting zone for "card1".
        fn process(local: &Operation, remote: &Operation) -> Zone {
            let mut engine = OTEngine::new();
            let mut mgr: StateManager<Board> = StateManager::new(ClientId::from("observer"));
            let root_id = mgr
                .create_state(
                    Board {
                        card_zone: hashmap! { "card1".to_owned() => Zone::Hand },
                    },
                    None,
                )
                .unwrap()
                .id
                .clone();

            assert!(engine.apply(local));
            let transformed_remote = engine.transform(remote, std::slice::from_ref(local));
            assert!(engine.apply(&transformed_remote));

            let OperationPayload::MoveCard(p) = &transformed_remote.payload else {
                panic!("expected MoveCard")
            };
            let to = p.to;
            mgr.update_state(&root_id, |draft| {
                draft.card_zone.insert("card1".to_owned(), to);
            })
            .unwrap();
            mgr.head().unwrap().data.card_zone["card1"]
        }

        proptest! {
            #[test]
            fn both_delivery_orders_converge_on_the_same_zone(
                ts1 in 0u64..10_000, ts2 in 0u64..10_000,
            ) {
                let op1 = move_op("c1", ts1, Zone::Battlefield);
                let op2 = move_op("c2", ts2, Zone::Graveyard);

                let from_c1_first = process(&op1, &op2);
                let from_c2_first = process(&op2, &op1);
                prop_assert_eq!(from_c1_first, from_c2_first);
            }
        }
    }
}
