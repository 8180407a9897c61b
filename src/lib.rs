//! # workvisor
//!
//! **Workvisor** is a static file server whose master process supervises a
//! pool of worker processes that share one listening port.
//!
//! The master never serves requests. It binds the port, spawns one worker
//! per slot, respawns crashed workers within a failure budget, replaces
//! workers one at a time when the configuration is reloaded, and stops
//! them gracefully or forcibly on request.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!            ┌──────────────────────┐
//!            │  SupervisorHandle(s) │  reload / stop / status / wait
//!            └──────────┬───────────┘
//!                       ▼ commands (mpsc)
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  control loop (one task)                                          │
//! │  - Pool: slots, failure windows, rolling reload, stop             │
//! │  - ticker: periodic failure-window reset                          │
//! │  - deadlines: ready timeout, retry delay, drain grace, stop grace │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!   ┌──────────┐       ┌──────────┐       ┌──────────┐         │
//!   │ worker 1 │       │ worker 2 │       │ worker N │         │ publishes
//!   │ (slot 0) │       │ (slot 1) │       │ (slot …) │         │ events
//!   └────┬─────┘       └────┬─────┘       └────┬─────┘         │
//!        │ ready / exit     │                  │               │
//!        └──────────────────┴──── signals ─────┘               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                          ┌────────┼────────┐
//!                          ▼        ▼        ▼
//!                      LogWriter  sub2 …   subN
//! ```
//!
//! ### Slot lifecycle
//! ```text
//! spawn ─► Spawning ──ready──► Running ──exit──┬─ asked to exit ──► drained
//!                                              ├─ exit 0         ──► slot retired
//!                                              └─ crash ─► FailureWindow::record_failure
//!                                                            ├─ Respawn ─► spawn
//!                                                            └─ Abort   ─► slot removed
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Supervision**   | Worker pool, crash respawn, rolling reload, graceful stop.   | [`Supervisor`], [`SupervisorHandle`]       |
//! | **Policies**      | Failure budget per slot, reload step retries.                | [`FailurePolicy`], [`RetryPolicy`]         |
//! | **Workers**       | Process launching, shared port, master/worker protocol.      | [`Launcher`], [`ProcessLauncher`], [`protocol`] |
//! | **Subscriber API**| Hook into pool events (logging, alerting).                   | [`Subscribe`], [`LogWriter`]               |
//! | **Errors**        | Typed errors for spawn, crash, reload and stop.              | [`SupervisorError`], [`ReloadError`]       |
//! | **Configuration** | JSON server config and derived supervisor settings.          | [`ServerConfig`], [`SupervisorConfig`]     |
//! | **Worker side**   | Environment decoding, IPC, static file entry point.          | [`child::Serve`], [`serve::StaticFiles`]   |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use workvisor::{
//!     ConfigSnapshot, LogWriter, ProcessLauncher, ServerConfig, SharedListener, Supervisor,
//!     SupervisorConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = ServerConfig::load(None)?;
//!     let listener = SharedListener::bind(&server.listen_addr())?;
//!     let launcher = ProcessLauncher::current_exe()?.with_listener(&listener);
//!
//!     let sup = Supervisor::builder(SupervisorConfig::from_server(&server))
//!         .with_subscriber(Arc::new(LogWriter::new()))
//!         .build();
//!     let handle = sup.start(Arc::new(launcher), ConfigSnapshot::new(server.clone())).await?;
//!
//!     // Later: roll every worker over to a new config.
//!     let report = handle.reload(ConfigSnapshot::new(server)).await?;
//!     println!("replaced {} workers", report.replaced);
//!
//!     handle.stop(false).await?;
//!     handle.wait().await;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod workers;

pub mod child;
pub mod logging;
pub mod serve;

// ---- Public re-exports ----

pub use config::{ConfigSnapshot, ServerConfig, SupervisionConfig, WorkerCount};
pub use core::{
    ControlSignal, ControlSignals, LoopExit, PoolStatus, ReloadProgress, ReloadReport,
    StopReport, Supervisor, SupervisorBuilder, SupervisorConfig, SupervisorHandle, WorkerStatus,
};
pub use error::{ConfigError, CrashError, ReloadError, SpawnError, SupervisorError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use policies::{Decision, FailurePolicy, FailureWindow, Jitter, RetryPolicy};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use workers::protocol;
pub use workers::{
    ExitKind, ExitRequest, ExitStatus, LaunchSpec, Launcher, ProcessLauncher, SharedListener,
    SignalKind, SlotId, WorkerHandle, WorkerId, WorkerNotifier, WorkerProcess, WorkerSignal,
    WorkerState,
};
