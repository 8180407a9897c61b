//! Listening socket shared by every worker.
//!
//! The master binds once and clears `FD_CLOEXEC`, so each spawned worker
//! inherits the descriptor and accepts on the same port. The kernel spreads
//! incoming connections across the accepting processes.

use std::io;
use std::net::{SocketAddr, TcpListener};

/// A bound TCP listener whose descriptor survives `exec`.
#[derive(Debug)]
pub struct SharedListener {
    inner: TcpListener,
}

impl SharedListener {
    /// Binds `addr` (e.g. `0.0.0.0:8080`) and marks it inheritable.
    pub fn bind(addr: &str) -> io::Result<Self> {
        let inner = TcpListener::bind(addr)?;
        #[cfg(unix)]
        make_inheritable(&inner)?;
        Ok(Self { inner })
    }

    /// Actual bound address (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Descriptor number to pass to workers.
    #[cfg(unix)]
    pub fn raw_fd(&self) -> std::os::fd::RawFd {
        use std::os::fd::AsRawFd;
        self.inner.as_raw_fd()
    }
}

#[cfg(unix)]
fn make_inheritable(listener: &TcpListener) -> io::Result<()> {
    use nix::fcntl::{FcntlArg, FdFlag, fcntl};

    fcntl(listener, FcntlArg::F_SETFD(FdFlag::empty()))?;
    Ok(())
}
