//! Snapshots and reports returned through [`SupervisorHandle`](crate::SupervisorHandle).

use std::time::Duration;

use crate::workers::{SlotId, WorkerId, WorkerState};

/// Point-in-time view of the pool.
#[derive(Debug, Clone)]
pub struct PoolStatus {
    /// Generation new workers are spawned with.
    pub generation: u64,
    /// Configured pool size.
    pub target: usize,
    /// Slot workers, ordered by slot.
    pub workers: Vec<WorkerStatus>,
    /// Workers asked to exit that have not exited yet.
    pub draining: Vec<WorkerId>,
    /// Slots given up on.
    pub aborted: Vec<SlotId>,
    /// Progress of the running reload.
    pub reload: Option<ReloadProgress>,
    /// A stop is in progress.
    pub stopping: bool,
}

impl PoolStatus {
    /// Number of slots with a worker.
    pub fn live(&self) -> usize {
        self.workers.len()
    }
}

/// One slot worker.
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub id: WorkerId,
    pub slot: SlotId,
    pub pid: Option<u32>,
    pub state: WorkerState,
    pub generation: u64,
    /// Failures in the slot's current window.
    pub failures: u32,
}

/// Progress of a rolling reload.
#[derive(Debug, Clone)]
pub struct ReloadProgress {
    pub generation: u64,
    /// Slots still queued.
    pub pending: usize,
    pub replaced: usize,
    /// Slot being replaced right now.
    pub current: Option<SlotId>,
}

/// Outcome of a completed reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadReport {
    pub generation: u64,
    /// Slots whose worker was replaced.
    pub replaced: usize,
    /// Slots that needed no replacement or vanished meanwhile.
    pub skipped: usize,
}

/// Outcome of a stop that finished within its grace period.
#[derive(Debug, Clone)]
pub struct StopReport {
    /// Slot workers that were asked to exit.
    pub workers: usize,
    pub forced: bool,
    pub elapsed: Duration,
}

/// Why the control loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A stop request completed.
    Stopped,
    /// Every worker exited on its own with status 0.
    Retired,
    /// The pool emptied and at least one slot was aborted.
    Exhausted,
}
