//! The replicated state manager: versioned snapshots, copy-on-write
//! updates, remote merge, and the history DAG they form.

pub mod manager;

pub use manager::{HistoryMetadata, StateManager};
