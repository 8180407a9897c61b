use std::collections::VecDeque;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::config::ConfigSnapshot;
use crate::error::ReloadError;
use crate::workers::{SlotId, WorkerHandle, WorkerId};

use super::status::ReloadReport;

/// State of a rolling reload: a queue of slots and at most one step in flight.
pub(super) struct RollingReload {
    pub target: ConfigSnapshot,
    /// Snapshot restored for future spawns if the reload fails.
    pub previous: ConfigSnapshot,
    pub queue: VecDeque<SlotId>,
    pub step: Option<ReloadStep>,
    pub replaced: usize,
    pub skipped: usize,
    pub reply: Option<oneshot::Sender<Result<ReloadReport, ReloadError>>>,
}

impl RollingReload {
    pub fn new(
        target: ConfigSnapshot,
        previous: ConfigSnapshot,
        queue: VecDeque<SlotId>,
        reply: Option<oneshot::Sender<Result<ReloadReport, ReloadError>>>,
    ) -> Self {
        Self {
            target,
            previous,
            queue,
            step: None,
            replaced: 0,
            skipped: 0,
            reply,
        }
    }

    /// Id of the replacement currently awaited, if any.
    pub fn replacement_id(&self) -> Option<WorkerId> {
        self.step
            .as_ref()
            .and_then(|s| s.replacement.as_ref())
            .map(WorkerHandle::id)
    }

    pub fn report(&self) -> ReloadReport {
        ReloadReport {
            generation: self.target.generation(),
            replaced: self.replaced,
            skipped: self.skipped,
        }
    }
}

/// Replacement of one slot.
///
/// With a replacement present, `deadline` is its readiness deadline;
/// without one, the step is waiting to retry at `deadline`.
pub(super) struct ReloadStep {
    pub slot: SlotId,
    pub predecessor: WorkerId,
    pub attempt: u32,
    pub replacement: Option<WorkerHandle>,
    pub deadline: Instant,
}
