use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::config::ConfigSnapshot;
use crate::error::{ReloadError, SupervisorError};
use crate::events::{Bus, Event};

use super::status::{LoopExit, PoolStatus, ReloadReport, StopReport};

/// Requests processed by the control loop.
pub(crate) enum Command {
    Reload {
        config: ConfigSnapshot,
        reply: oneshot::Sender<Result<ReloadReport, ReloadError>>,
    },
    Stop {
        force: bool,
        reply: oneshot::Sender<Result<StopReport, SupervisorError>>,
    },
    Status {
        reply: oneshot::Sender<PoolStatus>,
    },
}

/// Cloneable handle to a running supervisor.
///
/// Dropping every handle stops the pool gracefully.
#[derive(Clone)]
pub struct SupervisorHandle {
    tx: mpsc::Sender<Command>,
    bus: Bus,
    exit: watch::Receiver<Option<LoopExit>>,
}

impl SupervisorHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<Command>,
        bus: Bus,
        exit: watch::Receiver<Option<LoopExit>>,
    ) -> Self {
        Self { tx, bus, exit }
    }

    /// Replaces every worker, one at a time, with one running `config`.
    ///
    /// Resolves when the last slot has been replaced or the reload failed.
    /// A reload requested while another one runs fails with
    /// [`ReloadError::InProgress`].
    pub async fn reload(&self, config: ConfigSnapshot) -> Result<ReloadReport, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Reload { config, reply }).await?;
        let res = rx.await.map_err(|_| SupervisorError::Closed)?;
        Ok(res?)
    }

    /// Stops every worker; `force` kills instead of disconnecting.
    ///
    /// Resolves once no worker process is left.
    pub async fn stop(&self, force: bool) -> Result<StopReport, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stop { force, reply }).await?;
        rx.await.map_err(|_| SupervisorError::Closed)?
    }

    /// Current pool snapshot.
    pub async fn status(&self) -> Result<PoolStatus, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status { reply }).await?;
        rx.await.map_err(|_| SupervisorError::Closed)
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Waits until the control loop has ended and subscribers are flushed.
    pub async fn wait(&self) -> LoopExit {
        let mut rx = self.exit.clone();
        let exit = match rx.wait_for(Option::is_some).await {
            Ok(seen) => *seen,
            Err(_) => None,
        };
        exit.unwrap_or(LoopExit::Stopped)
    }

    /// `true` once the control loop no longer accepts commands.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, cmd: Command) -> Result<(), SupervisorError> {
        self.tx.send(cmd).await.map_err(|_| SupervisorError::Closed)
    }
}

impl std::fmt::Debug for SupervisorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorHandle")
            .field("closed", &self.tx.is_closed())
            .field("exit", &*self.exit.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_shows_loop_state() {
        let (tx, rx) = mpsc::channel(1);
        let (_exit_tx, exit) = watch::channel(Some(LoopExit::Stopped));
        let handle = SupervisorHandle::new(tx, Bus::new(4), exit);
        drop(rx);

        let text = format!("{handle:?}");
        assert!(text.contains("closed: true"));
        assert!(text.contains("Stopped"));
    }
}
