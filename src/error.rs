//! Error types used by the workvisor master, its workers and the config layer.
//!
//! - [`SupervisorError`]: failures of the supervisor itself (start, stop, closed handle).
//! - [`SpawnError`]: a worker process could not be created.
//! - [`CrashError`]: a worker exited on its own with a failure status.
//! - [`ReloadError`]: a rolling reload was rejected, timed out or cancelled.
//! - [`ConfigError`]: the server configuration could not be loaded.
//! - [`WorkerError`]: failures inside a worker process.
//!
//! Every enum offers `as_label` (stable snake_case label for logs).

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::workers::{ExitStatus, SlotId, WorkerId};

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// A worker could not be spawned while starting the pool.
    #[error("failed to spawn worker for slot {slot}: {source}")]
    Spawn {
        /// Slot the worker was meant for.
        slot: SlotId,
        /// Underlying spawn failure.
        #[source]
        source: SpawnError,
    },

    /// A rolling reload did not complete.
    #[error(transparent)]
    Reload(#[from] ReloadError),

    /// Graceful stop exceeded its grace period; the listed workers were killed.
    #[error("stop timeout {grace:?} exceeded; killed: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Workers that had to be killed.
        stuck: Vec<WorkerId>,
    },

    /// Supervisor settings are unusable.
    #[error("invalid supervisor config: {0}")]
    InvalidConfig(String),

    /// The control loop has exited; the handle is stale.
    #[error("supervisor is not running")]
    Closed,
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use workvisor::SupervisorError;
    ///
    /// assert_eq!(SupervisorError::Closed.as_label(), "supervisor_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::Spawn { .. } => "supervisor_spawn_failed",
            SupervisorError::Reload(e) => e.as_label(),
            SupervisorError::GraceExceeded { .. } => "supervisor_grace_exceeded",
            SupervisorError::InvalidConfig(_) => "supervisor_invalid_config",
            SupervisorError::Closed => "supervisor_closed",
        }
    }
}

/// # A worker process could not be created.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The OS refused to start the program.
    #[error("cannot start {program}: {source}")]
    Io {
        /// Program that was executed.
        program: PathBuf,
        /// OS error.
        #[source]
        source: io::Error,
    },

    /// The config snapshot could not be encoded for the worker.
    #[error("cannot encode worker config: {0}")]
    Encode(#[from] serde_json::Error),

    /// Launcher-specific failure.
    #[error("{0}")]
    Launcher(String),
}

impl SpawnError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SpawnError::Io { .. } => "spawn_io",
            SpawnError::Encode(_) => "spawn_encode",
            SpawnError::Launcher(_) => "spawn_launcher",
        }
    }
}

/// # A worker exited without being asked to.
///
/// Crashes are recoverable: the failure policy decides between respawn and abort.
/// The value travels as the reason of crash and abort events.
#[derive(Error, Debug, Clone)]
#[error("worker {worker} (slot {slot}) exited with {status}; failures in window: {failures}")]
pub struct CrashError {
    /// Worker that exited.
    pub worker: WorkerId,
    /// Slot it occupied.
    pub slot: SlotId,
    /// Exit status as reported by the OS.
    pub status: ExitStatus,
    /// Failure count after recording this crash.
    pub failures: u32,
}

/// # A rolling reload did not complete.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ReloadError {
    /// Another reload is still replacing workers.
    #[error("a reload is already in progress")]
    InProgress,

    /// A replacement never became ready.
    #[error("replacement for slot {slot} not ready after {attempts} attempt(s) of {timeout:?}")]
    Timeout {
        /// Slot being replaced.
        slot: SlotId,
        /// Attempts made.
        attempts: u32,
        /// Readiness timeout per attempt.
        timeout: Duration,
    },

    /// A replacement could not be spawned.
    #[error("cannot spawn replacement for slot {slot}: {source}")]
    Spawn {
        /// Slot being replaced.
        slot: SlotId,
        /// Underlying spawn failure.
        #[source]
        source: SpawnError,
    },

    /// The reload was cancelled by a stop request.
    #[error("reload cancelled")]
    Cancelled,

    /// The pool is stopping; no reload can start.
    #[error("supervisor is stopping")]
    Stopping,
}

impl ReloadError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use workvisor::ReloadError;
    ///
    /// assert_eq!(ReloadError::InProgress.as_label(), "reload_in_progress");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ReloadError::InProgress => "reload_in_progress",
            ReloadError::Timeout { .. } => "reload_timeout",
            ReloadError::Spawn { .. } => "reload_spawn_failed",
            ReloadError::Cancelled => "reload_cancelled",
            ReloadError::Stopping => "reload_stopping",
        }
    }
}

/// # The server configuration could not be loaded.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: io::Error,
    },

    /// The file is not valid JSON for [`ServerConfig`](crate::ServerConfig).
    #[error("cannot parse config {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::Invalid(_) => "config_invalid",
        }
    }
}

/// # Failures inside a worker process.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// A required environment variable is missing or malformed.
    #[error("bad worker environment {var}: {reason}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The config passed by the master could not be decoded.
    #[error("cannot decode worker config: {0}")]
    Config(#[from] serde_json::Error),

    /// The listening socket could not be obtained.
    #[error("cannot obtain listener: {0}")]
    Listen(#[source] io::Error),

    /// IPC with the master failed.
    #[error("master channel: {0}")]
    Ipc(#[source] io::Error),

    /// The entry point failed while serving.
    #[error("serve failed: {0}")]
    Serve(String),
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Env { .. } => "worker_env",
            WorkerError::Config(_) => "worker_config",
            WorkerError::Listen(_) => "worker_listen",
            WorkerError::Ipc(_) => "worker_ipc",
            WorkerError::Serve(_) => "worker_serve",
        }
    }
}
