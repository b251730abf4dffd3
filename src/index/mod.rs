//! Reverse-index and node synchronization
//!
//! Keeps the per-value index documents and the derived company and
//! capability nodes consistent with contact documents. Membership changes
//! are computed as set differences against the previous contact state and
//! applied as one atomic batch.

pub mod graph_sync;
pub mod sync;

pub use sync::{ReverseIndexer, SyncReport};
