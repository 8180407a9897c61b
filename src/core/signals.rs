//! # OS signals that control the master.
//!
//! **Unix platforms:**
//! - `SIGINT`, `SIGTERM`: graceful stop
//! - `SIGQUIT`: forced stop
//! - `SIGHUP`: reload the configuration
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]: graceful stop
//!
//! Listeners are registered once in [`ControlSignals::new`], so a signal
//! arriving between two `recv` calls is not lost.

use std::io;

/// What an OS signal asks the master to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Stop,
    ForceStop,
    Reload,
}

/// Persistent OS signal listeners.
#[cfg(unix)]
pub struct ControlSignals {
    int: tokio::signal::unix::Signal,
    term: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
    hup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ControlSignals {
    /// Registers the listeners. Must be called inside a tokio runtime.
    pub fn new() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            int: signal(SignalKind::interrupt())?,
            term: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
            hup: signal(SignalKind::hangup())?,
        })
    }

    /// Next signal; `None` once every listener is closed.
    pub async fn recv(&mut self) -> Option<ControlSignal> {
        tokio::select! {
            Some(()) = self.int.recv() => Some(ControlSignal::Stop),
            Some(()) = self.term.recv() => Some(ControlSignal::Stop),
            Some(()) = self.quit.recv() => Some(ControlSignal::ForceStop),
            Some(()) = self.hup.recv() => Some(ControlSignal::Reload),
            else => None,
        }
    }
}

/// Persistent OS signal listeners.
#[cfg(not(unix))]
pub struct ControlSignals(());

#[cfg(not(unix))]
impl ControlSignals {
    pub fn new() -> io::Result<Self> {
        Ok(Self(()))
    }

    /// Next signal; `None` if Ctrl-C cannot be listened for.
    pub async fn recv(&mut self) -> Option<ControlSignal> {
        tokio::signal::ctrl_c().await.ok().map(|()| ControlSignal::Stop)
    }
}
