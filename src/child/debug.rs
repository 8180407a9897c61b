use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::WorkerEnv;

/// Line written to every debug connection.
#[derive(Debug, Serialize)]
pub(crate) struct DebugStatus {
    pub worker: u64,
    pub slot: usize,
    pub generation: u64,
    pub pid: u32,
}

impl DebugStatus {
    pub fn of(env: &WorkerEnv) -> Self {
        Self {
            worker: env.worker.get(),
            slot: env.slot.index(),
            generation: env.generation(),
            pid: std::process::id(),
        }
    }
}

/// Answers each connection with one JSON status line until `shutdown`.
pub(crate) async fn serve_debug(listener: TcpListener, status: DebugStatus, shutdown: CancellationToken) {
    let mut line = match serde_json::to_string(&status) {
        Ok(l) => l,
        Err(e) => {
            warn!(error = %e, "cannot encode debug status");
            return;
        }
    };
    line.push('\n');

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            res = listener.accept() => match res {
                Ok((mut sock, peer)) => {
                    if let Err(e) = sock.write_all(line.as_bytes()).await {
                        debug!(%peer, error = %e, "debug client went away");
                    }
                    let _ = sock.shutdown().await;
                }
                Err(e) => warn!(error = %e, "debug accept failed"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    use super::*;

    #[tokio::test]
    async fn answers_with_status_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token = CancellationToken::new();
        let status = DebugStatus {
            worker: 4,
            slot: 1,
            generation: 2,
            pid: 99,
        };
        let server = tokio::spawn(serve_debug(listener, status, token.clone()));

        let mut sock = TcpStream::connect(addr).await.unwrap();
        let mut text = String::new();
        sock.read_to_string(&mut text).await.unwrap();

        let v: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(v["worker"], 4);
        assert_eq!(v["slot"], 1);
        assert_eq!(v["generation"], 2);

        token.cancel();
        server.await.unwrap();
    }
}
