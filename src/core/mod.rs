//! Runtime core: the worker pool and its control loop.
//!
//! The public entry point is [`Supervisor`]; a running supervisor is driven
//! through a [`SupervisorHandle`].
//!
//! Internal modules:
//! - [`pool`]: slot bookkeeping, crash respawns, rolling reload and stop;
//! - [`supervisor`]: control loop and subscriber fan-out wiring;
//! - [`slot`] / [`reload`]: state owned by the pool;
//! - [`signals`]: OS signal mapping for the master process.

mod builder;
mod config;
mod handle;
mod pool;
mod reload;
mod signals;
mod slot;
mod status;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use handle::SupervisorHandle;
pub use signals::{ControlSignal, ControlSignals};
pub use status::{LoopExit, PoolStatus, ReloadProgress, ReloadReport, StopReport, WorkerStatus};
pub use supervisor::Supervisor;
