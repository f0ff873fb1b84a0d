//! Per-client logical counters used to partial-order operations and snapshots.
//!
//! Missing entries read as zero, so two clocks with disjoint client sets are
//! still comparable (unlike the teacher's fixed-arity group vector, which
//! treats mismatched lengths as incomparable).

use std::{cmp, collections::BTreeMap, fmt};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// An opaque, short, replica-identifying string.
///
/// Modeled on `flotsync_utils::IString`: an immutable, cheaply cloned wrapper
/// so it can be used as a map key and copied into every operation and
/// snapshot it touches without repeated heap churn at each clone site.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(Box<str>);

impl ClientId {
    pub fn new(s: impl Into<Box<str>>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self(Box::from(value))
    }
}
impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self(value.into_boxed_str())
    }
}
impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({:?})", self.0)
    }
}
impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The "happened-before" order between two [`VectorClock`]s.
///
/// Named `ClockOrdering` rather than reusing `cmp::Ordering` because a
/// fourth case, `Concurrent`, is a first-class outcome here, not an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClockOrdering {
    /// `a` happened strictly before `b`.
    Less,
    /// `a == b` (every entry equal).
    Equal,
    /// `a` happened strictly after `b`.
    Greater,
    /// `a` and `b` each dominate the other on some client.
    Concurrent,
}
impl ClockOrdering {
    pub const fn reverse(self) -> ClockOrdering {
        match self {
            ClockOrdering::Less => ClockOrdering::Greater,
            ClockOrdering::Greater => ClockOrdering::Less,
            other => other,
        }
    }
}
impl From<cmp::Ordering> for ClockOrdering {
    fn from(value: cmp::Ordering) -> Self {
        match value {
            cmp::Ordering::Less => ClockOrdering::Less,
            cmp::Ordering::Equal => ClockOrdering::Equal,
            cmp::Ordering::Greater => ClockOrdering::Greater,
        }
    }
}

/// A map from [`ClientId`] to a non-negative, monotonically-increasing counter.
///
/// Entries absent from the map are implicitly zero, so a freshly constructed
/// `VectorClock::default()` compares `Equal` to any other empty clock and
/// `Less` than any clock with at least one positive entry.
#[derive(Clone, Debug, Default, Eq, Serialize, Deserialize)]
pub struct VectorClock(AHashMap<ClientId, u64>);

impl VectorClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I: IntoIterator<Item = (ClientId, u64)>>(pairs: I) -> Self {
        Self(pairs.into_iter().filter(|(_, v)| *v != 0).collect())
    }

    /// The counter for `client`, or zero if absent.
    pub fn get(&self, client: &ClientId) -> u64 {
        self.0.get(client).copied().unwrap_or(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.values().all(|v| *v == 0)
    }

    /// Bump `client`'s counter by one, inserting it at `1` if absent.
    pub fn increment(&mut self, client: &ClientId) {
        let entry = self.0.entry(client.clone()).or_insert(0);
        *entry = entry.checked_add(1).expect("vector clock counter overflow");
    }

    pub fn with_incremented(&self, client: &ClientId) -> Self {
        let mut next = self.clone();
        next.increment(client);
        next
    }

    /// Pointwise maximum of every client present in either clock.
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.0.clone();
        for (client, value) in &other.0 {
            let entry = merged.entry(client.clone()).or_insert(0);
            *entry = (*entry).max(*value);
        }
        Self(merged)
    }

    /// The happened-before relationship between `self` and `other`.
    pub fn compare(&self, other: &Self) -> ClockOrdering {
        let mut has_less = false;
        let mut has_greater = false;
        for client in self.0.keys().chain(other.0.keys()) {
            match self.get(client).cmp(&other.get(client)) {
                cmp::Ordering::Less => has_less = true,
                cmp::Ordering::Greater => has_greater = true,
                cmp::Ordering::Equal => {}
            }
            if has_less && has_greater {
                return ClockOrdering::Concurrent;
            }
        }
        match (has_less, has_greater) {
            (false, false) => ClockOrdering::Equal,
            (true, false) => ClockOrdering::Less,
            (false, true) => ClockOrdering::Greater,
            (true, true) => ClockOrdering::Concurrent,
        }
    }

    /// A stable, sorted view of the clock's entries, for display and for
    /// deterministic iteration in tests.
    fn sorted_entries(&self) -> BTreeMap<&str, u64> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v)).collect()
    }
}
impl PartialEq for VectorClock {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == ClockOrdering::Equal
    }
}
impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "⟨")?;
        let mut first = true;
        for (client, value) in self.sorted_entries() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{client}:{value}")?;
        }
        write!(f, "⟩")
    }
}
