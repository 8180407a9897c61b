//! Master side of worker processes.
//!
//! - [`WorkerHandle`]: one worker's identity, config snapshot and lifecycle
//! - [`Launcher`] / [`WorkerProcess`]: how processes are created and controlled
//! - [`ProcessLauncher`]: the OS implementation (tokio child processes)
//! - [`SharedListener`]: the port every worker accepts on
//! - [`protocol`]: JSON-lines messages and environment variable names

mod handle;
mod id;
mod launcher;
mod listener;
mod process;
pub mod protocol;

#[cfg(test)]
pub(crate) mod fake;

pub use handle::{ExitKind, ExitRequest, WorkerHandle, WorkerState};
pub use id::{ExitStatus, SlotId, WorkerId};
pub use launcher::{LaunchSpec, Launcher, SignalKind, WorkerNotifier, WorkerProcess, WorkerSignal};
pub use listener::SharedListener;
pub use process::ProcessLauncher;
