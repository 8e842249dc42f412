//! Work distribution and resumption
//!
//! - `WorkQueue`: shared queue with exclusive claims and a `join` wait
//! - `QueueSnapshotStore`: durable snapshot of unclaimed work for resuming

mod snapshot;
mod work_queue;

pub use snapshot::{QueueSnapshotStore, SNAPSHOT_VERSION};
pub use work_queue::{Claim, WorkQueue};
