//! # Worker side of the master/worker contract
//!
//! A worker process is started by the master with its identity and config
//! in the environment (see [`protocol`](crate::workers::protocol)). [`run`]:
//!
//! ```text
//! WorkerEnv::from_env()
//!   ├─ listener: inherited fd (WORKVISOR_LISTEN_FD) or bind host:port
//!   ├─ watch stdin: disconnect / EOF ─┐
//!   ├─ SIGTERM / SIGINT ──────────────┼─► shutdown token
//!   ├─ debug listener (optional)      │
//!   ├─ stdout: {"type":"ready"}       │
//!   └─ Serve::serve(listener, shutdown) ◄┘  ─► Ok: exit 0, Err: exit 1
//! ```

mod debug;
mod env;
mod ipc;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::WorkerError;

pub use env::WorkerEnv;

/// Entry point run inside each worker.
///
/// Implementations accept on `listener` until `shutdown` is cancelled, then
/// stop accepting and finish in-flight connections before returning.
#[async_trait]
pub trait Serve: Send + Sync + 'static {
    async fn serve(&self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), WorkerError>;
}

/// Runs a worker: decode the environment, build the entry point with
/// `make`, announce readiness and serve until told to stop.
pub async fn run<S, F>(make: F) -> Result<(), WorkerError>
where
    S: Serve,
    F: FnOnce(&WorkerEnv) -> S,
{
    let env = WorkerEnv::from_env()?;
    let entry = make(&env);
    let listener = listener(&env)?;
    let addr = listener.local_addr().ok();

    let shutdown = CancellationToken::new();
    ipc::watch_stdin(shutdown.clone());
    tokio::spawn(watch_terminate(shutdown.clone()));

    if let Some(port) = env.debug_port {
        match TcpListener::bind(("127.0.0.1", port)).await {
            Ok(l) => {
                tokio::spawn(debug::serve_debug(
                    l,
                    debug::DebugStatus::of(&env),
                    shutdown.clone(),
                ));
            }
            Err(e) => warn!(port, error = %e, "debug listener unavailable"),
        }
    }

    ipc::announce_ready(&mut tokio::io::stdout(), addr).await?;
    info!(
        worker = env.worker.get(),
        slot = env.slot.index(),
        generation = env.generation(),
        addr = ?addr,
        "worker ready"
    );

    let res = entry.serve(listener, shutdown).await;
    info!(worker = env.worker.get(), "worker exiting");
    res
}

fn listener(env: &WorkerEnv) -> Result<TcpListener, WorkerError> {
    let std_listener = match env.listen_fd {
        #[cfg(unix)]
        Some(fd) => {
            use std::os::fd::FromRawFd;
            // SAFETY: the master passes a listening socket it keeps open for
            // the worker's lifetime; this process owns its inherited copy.
            unsafe { std::net::TcpListener::from_raw_fd(fd) }
        }
        _ => std::net::TcpListener::bind(env.config().listen_addr()).map_err(WorkerError::Listen)?,
    };
    std_listener.set_nonblocking(true).map_err(WorkerError::Listen)?;
    TcpListener::from_std(std_listener).map_err(WorkerError::Listen)
}

/// SIGTERM and SIGINT (the terminal sends it to the whole process group)
/// start a graceful shutdown of this worker.
#[cfg(unix)]
async fn watch_terminate(shutdown: CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut term, mut int) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(t), Ok(i)) => (t, i),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "cannot listen for termination signals");
            return;
        }
    };
    tokio::select! {
        _ = shutdown.cancelled() => return,
        _ = term.recv() => info!("SIGTERM received"),
        _ = int.recv() => info!("SIGINT received"),
    }
    shutdown.cancel();
}

#[cfg(not(unix))]
async fn watch_terminate(shutdown: CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        res = tokio::signal::ctrl_c() => {
            if res.is_ok() {
                shutdown.cancel();
            }
        }
    }
}
