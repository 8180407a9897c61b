//! Master pid file and signalling a running master.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// What `reload` / `stop` ask of a running master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterSignal {
    Reload,
    Stop,
    ForceStop,
}

/// Pid file of the running master; removed on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Writes this process's pid to `path`.
    ///
    /// Refuses to overwrite the pid file of a master that is still alive.
    pub fn create(path: &Path) -> Result<Self> {
        if let Ok(pid) = read(path)
            && pid != std::process::id()
            && is_running(pid)
        {
            bail!(
                "a master is already running (pid {pid}, pid file {})",
                path.display()
            );
        }
        fs::write(path, format!("{}\n", std::process::id()))
            .with_context(|| format!("cannot write pid file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Reads the pid recorded in `path`.
pub fn read(path: &Path) -> Result<u32> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read pid file {}", path.display()))?;
    let pid: u32 = raw
        .trim()
        .parse()
        .with_context(|| format!("pid file {} is malformed", path.display()))?;
    if pid == 0 {
        bail!("pid file {} holds pid 0", path.display());
    }
    Ok(pid)
}

/// Sends `sig` to the master recorded in `path`; returns its pid.
pub fn signal_master(path: &Path, sig: MasterSignal) -> Result<u32> {
    let pid = read(path)?;
    send(pid, sig)?;
    Ok(pid)
}

#[cfg(unix)]
fn send(pid: u32, sig: MasterSignal) -> Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let signal = match sig {
        MasterSignal::Reload => Signal::SIGHUP,
        MasterSignal::Stop => Signal::SIGTERM,
        MasterSignal::ForceStop => Signal::SIGQUIT,
    };
    kill(Pid::from_raw(pid as i32), signal)
        .with_context(|| format!("cannot send {signal:?} to master pid {pid}"))?;
    Ok(())
}

#[cfg(not(unix))]
fn send(pid: u32, _sig: MasterSignal) -> Result<()> {
    bail!("signalling master pid {pid} is only supported on unix")
}

#[cfg(unix)]
fn is_running(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
fn is_running(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_then_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.pid");

        let pid = PidFile::create(&path).unwrap();
        assert_eq!(read(&path).unwrap(), std::process::id());

        drop(pid);
        assert!(!path.exists());
    }

    #[test]
    fn stale_pid_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.pid");
        fs::write(&path, "garbage").unwrap();

        let _pid = PidFile::create(&path).unwrap();
        assert_eq!(read(&path).unwrap(), std::process::id());
    }

    #[test]
    fn malformed_pid_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.pid");

        assert!(read(&path).is_err());
        fs::write(&path, "0\n").unwrap();
        assert!(read(&path).is_err());
        assert!(signal_master(&path, MasterSignal::Reload).is_err());
    }
}
