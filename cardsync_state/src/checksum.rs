//! A digest over the canonical serialization of a snapshot's data.
//!
//! Picked as SHA-256 over `serde_json::to_vec`: `serde_json` already
//! serializes struct fields in declaration order and map keys are sorted by
//! `BTreeMap`/`#[serde(flatten)]` convention throughout this workspace, so
//! two replicas holding structurally equal data always hash to the same
//! bytes regardless of process or allocation history.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A SHA-256 digest, hex-encoded for Debug/Display/serde so it travels
/// legibly across the wire and in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    pub fn of_json_bytes<T: Serialize>(data: &T) -> serde_json::Result<Self> {
        let bytes = serde_json::to_vec(data)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hasher.finalize();
        Ok(Self(hex_encode(&digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.0)
    }
}
impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(out, "{byte:02x}").expect("writing to a String never fails");
    }
    out
}


impl PartialEq<str> for Checksum {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
