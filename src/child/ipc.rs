use std::io::{self, BufRead};
use std::net::SocketAddr;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::WorkerError;
use crate::workers::protocol::{MasterMessage, WorkerMessage};

/// Tells the master this worker is accepting connections.
pub(crate) async fn announce_ready<W>(out: &mut W, addr: Option<SocketAddr>) -> Result<(), WorkerError>
where
    W: AsyncWrite + Unpin,
{
    let line = WorkerMessage::Ready {
        addr: addr.map(|a| a.to_string()),
    }
    .to_line()
    .map_err(|e| WorkerError::Ipc(io::Error::other(e)))?;

    out.write_all(line.as_bytes()).await.map_err(WorkerError::Ipc)?;
    out.flush().await.map_err(WorkerError::Ipc)
}

/// Watches the master's channel on stdin from a dedicated thread.
///
/// A blocking thread is used so that a pending read never holds up the
/// runtime when the worker exits for another reason.
pub(crate) fn watch_stdin(shutdown: CancellationToken) {
    let spawned = std::thread::Builder::new()
        .name("master-ipc".into())
        .spawn(move || watch_master(io::stdin().lock(), shutdown));
    if let Err(e) = spawned {
        warn!(error = %e, "cannot watch master channel");
    }
}

/// Cancels `shutdown` on a disconnect message or when the master's end of
/// the channel closes.
pub(crate) fn watch_master<R: BufRead>(input: R, shutdown: CancellationToken) {
    for line in input.lines() {
        if shutdown.is_cancelled() {
            return;
        }
        match line {
            Ok(line) => match MasterMessage::from_line(&line) {
                Ok(MasterMessage::Disconnect) => {
                    info!("disconnect requested by master");
                    shutdown.cancel();
                    return;
                }
                Err(e) => debug!(error = %e, line = %line, "ignoring master message"),
            },
            Err(e) => {
                warn!(error = %e, "master channel failed");
                shutdown.cancel();
                return;
            }
        }
    }
    info!("master channel closed");
    shutdown.cancel();
}
