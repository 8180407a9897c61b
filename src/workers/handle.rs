//! # WorkerHandle
//!
//! Master-side record of one worker process: identity, the config snapshot
//! it was spawned with, its lifecycle state and whether the supervisor asked
//! it to exit.
//!
//! ```text
//! spawn ─► Spawning ──ready──► Running ──exit──► Exited
//!              └──────────────exit───────────────┘
//! ```
//!
//! An exit counts as a failure only when nobody asked for it and the status
//! is not a clean `0`.

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::ConfigSnapshot;
use crate::error::SpawnError;
use crate::workers::{
    ExitStatus, LaunchSpec, Launcher, SlotId, WorkerId, WorkerNotifier, WorkerProcess,
    WorkerSignal,
};

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Process created, not yet listening.
    Spawning,
    /// Listening.
    Running,
    /// Terminated.
    Exited,
}

/// Exit the supervisor asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitRequest {
    Disconnect,
    Kill,
}

/// Classification of a finished worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Requested by the supervisor, or a clean exit 0.
    Voluntary,
    /// Anything else.
    Failure,
}

/// Master-side handle of one worker process.
pub struct WorkerHandle {
    id: WorkerId,
    slot: SlotId,
    config: ConfigSnapshot,
    process: Option<Box<dyn WorkerProcess>>,
    pid: Option<u32>,
    state: WorkerState,
    exit_request: Option<ExitRequest>,
    spawned_at: Instant,
}

impl WorkerHandle {
    /// Launches a worker for `slot` running `config`.
    pub(crate) fn spawn(
        launcher: &dyn Launcher,
        id: WorkerId,
        slot: SlotId,
        config: ConfigSnapshot,
        debug_port: Option<u16>,
        signals: &mpsc::UnboundedSender<WorkerSignal>,
        now: Instant,
    ) -> Result<Self, SpawnError> {
        let spec = LaunchSpec {
            worker: id,
            slot,
            config: &config,
            debug_port,
        };
        let process = launcher.launch(spec, WorkerNotifier::new(id, signals.clone()))?;
        let pid = process.pid();

        Ok(Self {
            id,
            slot,
            config,
            process: Some(process),
            pid,
            state: WorkerState::Spawning,
            exit_request: None,
            spawned_at: now,
        })
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Snapshot the worker was spawned with.
    pub fn config(&self) -> &ConfigSnapshot {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.config.generation()
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn exit_request(&self) -> Option<ExitRequest> {
        self.exit_request
    }

    pub fn spawned_at(&self) -> Instant {
        self.spawned_at
    }

    /// `Spawning → Running`; returns `false` if the worker was not spawning.
    pub(crate) fn mark_ready(&mut self) -> bool {
        if self.state != WorkerState::Spawning {
            return false;
        }
        self.state = WorkerState::Running;
        true
    }

    /// Records the exit, releases the process and classifies the exit.
    pub(crate) fn mark_exited(&mut self, status: ExitStatus) -> ExitKind {
        self.state = WorkerState::Exited;
        self.process = None;
        if self.exit_request.is_some() || status.success() {
            ExitKind::Voluntary
        } else {
            ExitKind::Failure
        }
    }

    /// Asks the worker to finish in-flight work and exit.
    ///
    /// Returns `false` (and does nothing) if an exit was already requested
    /// or the process is gone.
    pub fn disconnect(&mut self) -> bool {
        if self.exit_request.is_some() {
            return false;
        }
        let Some(process) = self.process.as_mut() else {
            return false;
        };
        self.exit_request = Some(ExitRequest::Disconnect);
        process.disconnect();
        true
    }

    /// Terminates the worker immediately.
    ///
    /// Escalates a pending disconnect. Returns `false` (and does nothing) if
    /// the worker was already killed or the process is gone.
    pub fn kill(&mut self) -> bool {
        if self.exit_request == Some(ExitRequest::Kill) {
            return false;
        }
        let Some(process) = self.process.as_mut() else {
            return false;
        };
        self.exit_request = Some(ExitRequest::Kill);
        process.kill();
        true
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .field("generation", &self.generation())
            .field("pid", &self.pid)
            .field("state", &self.state)
            .field("exit_request", &self.exit_request)
            .finish()
    }
}
