use tokio::time::Instant;

use crate::policies::{FailurePolicy, FailureWindow};
use crate::workers::{SlotId, WorkerHandle};

/// One pool position: its current worker and its failure history.
///
/// The failure window belongs to the slot, so it survives respawns of the
/// worker occupying it.
pub(super) struct Slot {
    pub id: SlotId,
    pub worker: WorkerHandle,
    pub failures: FailureWindow,
}

impl Slot {
    pub fn new(worker: WorkerHandle, policy: FailurePolicy, now: Instant) -> Self {
        Self {
            id: worker.slot(),
            worker,
            failures: FailureWindow::new(policy, now),
        }
    }
}

/// A worker that was asked to exit and has not exited yet.
pub(super) struct Draining {
    pub handle: WorkerHandle,
    /// When to escalate to a kill; `None` once killed or under a stop deadline.
    pub kill_at: Option<Instant>,
}
