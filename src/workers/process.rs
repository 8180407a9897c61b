//! # OS process launcher
//!
//! [`ProcessLauncher`] runs the worker program (by default this executable
//! with the hidden `worker` subcommand) with:
//! - the config snapshot and identity in `WORKVISOR_*` environment variables,
//! - the shared listener descriptor,
//! - stdin/stdout piped for the JSON-lines protocol, stderr inherited.
//!
//! Per worker two tasks run: a **watcher** that owns the child, forwards
//! disconnect/kill requests and reports the exit status; and a **reader**
//! that turns `ready` lines from stdout into notifications.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::SpawnError;
use crate::workers::protocol::{self, MasterMessage, WorkerMessage};
use crate::workers::{
    ExitStatus, LaunchSpec, Launcher, SharedListener, WorkerNotifier, WorkerProcess,
};

/// Launches workers as child processes.
#[derive(Debug)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
    listen_fd: Option<i32>,
}

impl ProcessLauncher {
    /// Runs `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            listen_fd: None,
        }
    }

    /// Runs the current executable as `<exe> worker`.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?).arg("worker"))
    }

    /// Appends an argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Passes the shared listener to every worker.
    ///
    /// The listener must outlive the launcher's workers. On non-unix
    /// targets workers bind `host:port` themselves and this is a no-op.
    pub fn with_listener(mut self, listener: &SharedListener) -> Self {
        #[cfg(unix)]
        {
            self.listen_fd = Some(listener.raw_fd());
        }
        #[cfg(not(unix))]
        let _ = listener;
        self
    }

    fn command(&self, spec: &LaunchSpec<'_>) -> Result<Command, SpawnError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env(protocol::ENV_CONFIG, spec.config.to_json()?)
            .env(protocol::ENV_GENERATION, spec.config.generation().to_string())
            .env(protocol::ENV_WORKER_ID, spec.worker.get().to_string())
            .env(protocol::ENV_SLOT, spec.slot.index().to_string())
            .env_remove(protocol::ENV_LISTEN_FD)
            .env_remove(protocol::ENV_DEBUG_PORT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(fd) = self.listen_fd {
            cmd.env(protocol::ENV_LISTEN_FD, fd.to_string());
        }
        if let Some(port) = spec.debug_port {
            cmd.env(protocol::ENV_DEBUG_PORT, port.to_string());
        }
        Ok(cmd)
    }
}

impl Launcher for ProcessLauncher {
    fn launch(
        &self,
        spec: LaunchSpec<'_>,
        notifier: WorkerNotifier,
    ) -> Result<Box<dyn WorkerProcess>, SpawnError> {
        let mut child = self
            .command(&spec)?
            .spawn()
            .map_err(|source| SpawnError::Io {
                program: self.program.clone(),
                source,
            })?;

        let pid = child.id();
        let stdin = child.stdin.take();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(read_messages(stdout, notifier.clone()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(watch(child, stdin, rx, notifier));

        Ok(Box::new(ChildProcess { pid, control: tx }))
    }
}

#[derive(Debug, Clone, Copy)]
enum Control {
    Disconnect,
    Kill,
}

struct ChildProcess {
    pid: Option<u32>,
    control: mpsc::UnboundedSender<Control>,
}

impl WorkerProcess for ChildProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn disconnect(&mut self) {
        let _ = self.control.send(Control::Disconnect);
    }

    fn kill(&mut self) {
        let _ = self.control.send(Control::Kill);
    }
}

/// Owns the child until it exits. A dropped control channel kills it.
async fn watch(
    mut child: Child,
    mut stdin: Option<ChildStdin>,
    mut control: mpsc::UnboundedReceiver<Control>,
    notifier: WorkerNotifier,
) {
    let mut control_open = true;
    let status = loop {
        tokio::select! {
            res = child.wait() => break res,
            msg = control.recv(), if control_open => match msg {
                Some(Control::Disconnect) => {
                    if let Some(mut pipe) = stdin.take() {
                        send_disconnect(&mut pipe).await;
                    }
                }
                Some(Control::Kill) => {
                    let _ = child.start_kill();
                }
                None => {
                    control_open = false;
                    let _ = child.start_kill();
                }
            },
        }
    };

    let status = match status {
        Ok(st) => ExitStatus::from(st),
        Err(e) => {
            warn!(worker = notifier.worker().get(), error = %e, "cannot collect worker exit status");
            ExitStatus::default()
        }
    };
    notifier.exited(status);
}

/// Writes the disconnect line, then closes stdin by dropping it.
async fn send_disconnect(pipe: &mut ChildStdin) {
    let line = match MasterMessage::Disconnect.to_line() {
        Ok(l) => l,
        Err(e) => {
            warn!(error = %e, "cannot encode disconnect message");
            return;
        }
    };
    if let Err(e) = pipe.write_all(line.as_bytes()).await {
        debug!(error = %e, "worker stdin closed before disconnect");
        return;
    }
    let _ = pipe.flush().await;
}

async fn read_messages(stdout: ChildStdout, notifier: WorkerNotifier) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match WorkerMessage::from_line(&line) {
                Ok(WorkerMessage::Ready { .. }) => notifier.ready(),
                Err(e) => {
                    debug!(worker = notifier.worker().get(), error = %e, line = %line, "ignoring worker output")
                }
            },
            Ok(None) => break,
            Err(e) => {
                debug!(worker = notifier.worker().get(), error = %e, "worker stdout read failed");
                break;
            }
        }
    }
}
