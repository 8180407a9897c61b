//! Identifiers and exit status of worker processes.

use std::fmt;

/// Identity of one worker process, assigned by the supervisor.
///
/// Ids grow monotonically with spawn order, so comparing two ids tells which
/// worker is older. An id is never reused by the same supervisor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub(crate) u64);

impl WorkerId {
    /// Raw numeric value (passed to the worker as `WORKVISOR_WORKER_ID`).
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for WorkerId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Logical position in the pool.
///
/// A slot outlives the processes that occupy it: a respawned or reloaded
/// worker takes over the slot of its predecessor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    /// Zero-based index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for SlotId {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

/// How a worker process ended.
///
/// Exactly one of `code` and `signal` is normally set; both are `None` when
/// the status could not be collected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct ExitStatus {
    /// Exit code, when the process exited on its own.
    pub code: Option<i32>,
    /// Terminating signal, when the process was killed.
    pub signal: Option<i32>,
}

impl ExitStatus {
    /// Status of a process that exited with `code`.
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Status of a process terminated by `signal`.
    pub fn signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// `true` for exit code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(st: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            st.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: st.code(),
            signal,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(c), _) => write!(f, "code {c}"),
            (None, Some(s)) => write!(f, "signal {s}"),
            (None, None) => f.write_str("unknown status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_ids_order_by_spawn() {
        assert!(WorkerId(3) < WorkerId(10));
        assert_eq!(WorkerId(7).to_string(), "7");
    }

    #[test]
    fn exit_status_display() {
        assert!(ExitStatus::code(0).success());
        assert!(!ExitStatus::code(2).success());
        assert!(!ExitStatus::signal(9).success());
        assert_eq!(ExitStatus::signal(9).to_string(), "signal 9");
        assert_eq!(ExitStatus::default().to_string(), "unknown status");
    }
}
