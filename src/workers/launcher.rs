//! # Launching worker processes
//!
//! The supervisor never creates processes itself. It asks a [`Launcher`]
//! for a [`WorkerProcess`] and hands it a [`WorkerNotifier`]; the launcher
//! reports readiness and exit through the notifier. Notifications land in
//! the supervisor's control loop as [`WorkerSignal`] messages, tagged with
//! the worker id, so late reports from replaced workers can be recognised
//! and ignored.
//!
//! ```text
//! Supervisor ──launch(spec, notifier)──► Launcher ──► WorkerProcess
//!      ▲                                                   │
//!      └──────── WorkerSignal { worker, Ready|Exited } ◄───┘ (notifier)
//! ```

use tokio::sync::mpsc;

use crate::config::ConfigSnapshot;
use crate::error::SpawnError;
use crate::workers::{ExitStatus, SlotId, WorkerId};

/// What to start.
#[derive(Debug, Clone, Copy)]
pub struct LaunchSpec<'a> {
    /// Id assigned to the new worker.
    pub worker: WorkerId,
    /// Slot it will occupy.
    pub slot: SlotId,
    /// Config the worker must run.
    pub config: &'a ConfigSnapshot,
    /// Debug status port, if debugging is enabled.
    pub debug_port: Option<u16>,
}

/// Creates worker processes. This is the opaque worker entry point.
pub trait Launcher: Send + Sync + 'static {
    /// Starts one worker.
    ///
    /// Implementations must call [`WorkerNotifier::ready`] once the worker
    /// accepts connections and [`WorkerNotifier::exited`] exactly once when
    /// it terminates.
    fn launch(
        &self,
        spec: LaunchSpec<'_>,
        notifier: WorkerNotifier,
    ) -> Result<Box<dyn WorkerProcess>, SpawnError>;
}

/// Control surface of one running worker.
pub trait WorkerProcess: Send + 'static {
    /// OS process id, if there is one.
    fn pid(&self) -> Option<u32>;

    /// Ask the worker to stop accepting, finish in-flight work and exit 0.
    fn disconnect(&mut self);

    /// Terminate the worker immediately.
    fn kill(&mut self);
}

/// Kind of a worker notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// The worker accepts connections.
    Ready,
    /// The worker terminated.
    Exited(ExitStatus),
}

/// Notification delivered to the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSignal {
    pub worker: WorkerId,
    pub kind: SignalKind,
}

impl WorkerSignal {
    pub fn ready(worker: WorkerId) -> Self {
        Self {
            worker,
            kind: SignalKind::Ready,
        }
    }

    pub fn exited(worker: WorkerId, status: ExitStatus) -> Self {
        Self {
            worker,
            kind: SignalKind::Exited(status),
        }
    }
}

/// Reports readiness and exit of one worker to its supervisor.
#[derive(Debug, Clone)]
pub struct WorkerNotifier {
    worker: WorkerId,
    tx: mpsc::UnboundedSender<WorkerSignal>,
}

impl WorkerNotifier {
    pub(crate) fn new(worker: WorkerId, tx: mpsc::UnboundedSender<WorkerSignal>) -> Self {
        Self { worker, tx }
    }

    /// Worker this notifier belongs to.
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// The worker is listening.
    pub fn ready(&self) {
        let _ = self.tx.send(WorkerSignal::ready(self.worker));
    }

    /// The worker terminated with `status`.
    pub fn exited(&self, status: ExitStatus) {
        let _ = self.tx.send(WorkerSignal::exited(self.worker, status));
    }
}
