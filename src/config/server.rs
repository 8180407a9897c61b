//! # JSON server configuration.
//!
//! Every struct is `#[serde(default)]`, so a file only needs the keys it
//! changes; the rest is merged from the defaults at every nesting level.
//!
//! ```json
//! {
//!   "root": "./public",
//!   "port": 8080,
//!   "workers": "auto",
//!   "supervision": { "max_failures": 5 }
//! }
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory served by the workers.
    #[serde(alias = "path")]
    pub root: PathBuf,
    /// Interface to listen on.
    pub host: String,
    /// Port shared by all workers (`0` picks an ephemeral port).
    pub port: u16,
    /// Pool size: `"auto"` (one per CPU) or a fixed number.
    pub workers: WorkerCount,
    /// Expose a per-worker debug status listener.
    pub debug: bool,
    /// Base port for debug listeners; slot `n` listens on `debug_port + n`.
    pub debug_port: u16,
    /// Supervision tunables.
    pub supervision: SupervisionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: WorkerCount::Auto,
            debug: false,
            debug_port: 9229,
            supervision: SupervisionConfig::default(),
        }
    }
}

/// Supervision tunables, all durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisionConfig {
    /// Length of the failure-counting window.
    pub failure_window_ms: u64,
    /// Failures tolerated inside one window; one more aborts the slot.
    pub max_failures: u32,
    /// How long a reload replacement may take to report ready.
    pub ready_timeout_ms: u64,
    /// Attempts per reload step before the reload fails.
    pub reload_attempts: u32,
    /// Base delay between reload step attempts.
    pub reload_retry_delay_ms: u64,
    /// Grace period for draining workers and for graceful stop.
    pub grace_ms: u64,
    /// Keep running when only part of the pool could be spawned at start.
    pub degraded_start: bool,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self {
            failure_window_ms: 60_000,
            max_failures: 10,
            ready_timeout_ms: 10_000,
            reload_attempts: 3,
            reload_retry_delay_ms: 250,
            grace_ms: 30_000,
            degraded_start: false,
        }
    }
}

impl ServerConfig {
    /// Loads the config from `path`, or returns the defaults when `path` is `None`.
    ///
    /// The result is validated before it is returned.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads and decodes a config file without validating it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Decodes a config from JSON text.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == WorkerCount::Fixed(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        let s = &self.supervision;
        if s.failure_window_ms == 0 {
            return Err(ConfigError::Invalid(
                "supervision.failure_window_ms must be positive".into(),
            ));
        }
        if s.ready_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "supervision.ready_timeout_ms must be positive".into(),
            ));
        }
        if s.reload_attempts == 0 {
            return Err(ConfigError::Invalid(
                "supervision.reload_attempts must be at least 1".into(),
            ));
        }
        if self.debug {
            let last = u32::from(self.debug_port) + self.workers.resolve() as u32;
            if last > u32::from(u16::MAX) {
                return Err(ConfigError::Invalid(format!(
                    "debug_port {} leaves no room for {} workers",
                    self.debug_port,
                    self.workers.resolve()
                )));
            }
        }
        Ok(())
    }

    /// `host:port` string for binding the shared listener.
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Requested pool size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "WorkerCountRepr", into = "WorkerCountRepr")]
pub enum WorkerCount {
    /// One worker per available CPU.
    #[default]
    Auto,
    /// Exactly this many workers.
    Fixed(usize),
}

impl WorkerCount {
    /// Concrete number of workers (at least 1 for `Auto`).
    pub fn resolve(self) -> usize {
        match self {
            WorkerCount::Auto => num_cpus::get().max(1),
            WorkerCount::Fixed(n) => n,
        }
    }
}

impl FromStr for WorkerCount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(WorkerCount::Auto);
        }
        s.parse::<usize>()
            .map(WorkerCount::Fixed)
            .map_err(|_| format!("expected \"auto\" or a number, got {s:?}"))
    }
}

impl fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerCount::Auto => f.write_str("auto"),
            WorkerCount::Fixed(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WorkerCountRepr {
    Count(usize),
    Word(String),
}

impl TryFrom<WorkerCountRepr> for WorkerCount {
    type Error = String;

    fn try_from(repr: WorkerCountRepr) -> Result<Self, Self::Error> {
        match repr {
            WorkerCountRepr::Count(n) => Ok(WorkerCount::Fixed(n)),
            WorkerCountRepr::Word(w) => w.parse(),
        }
    }
}

impl From<WorkerCount> for WorkerCountRepr {
    fn from(c: WorkerCount) -> Self {
        match c {
            WorkerCount::Auto => WorkerCountRepr::Word("auto".to_string()),
            WorkerCount::Fixed(n) => WorkerCountRepr::Count(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_merges_over_defaults() {
        let cfg = ServerConfig::from_json(
            r#"{ "port": 9000, "workers": 3, "supervision": { "max_failures": 4 } }"#,
        )
        .unwrap();

        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.workers, WorkerCount::Fixed(3));
        assert_eq!(cfg.supervision.max_failures, 4);
        assert_eq!(cfg.supervision.failure_window_ms, 60_000);
        assert_eq!(cfg.host, "0.0.0.0");
    }

    #[test]
    fn path_alias_and_auto_workers() {
        let cfg = ServerConfig::from_json(r#"{ "path": "/srv/www", "workers": "auto" }"#).unwrap();
        assert_eq!(cfg.root, PathBuf::from("/srv/www"));
        assert_eq!(cfg.workers, WorkerCount::Auto);
        assert!(cfg.workers.resolve() >= 1);
    }

    #[test]
    fn rejects_unknown_worker_word() {
        assert!(ServerConfig::from_json(r#"{ "workers": "many" }"#).is_err());
    }

    #[test]
    fn validate_catches_zero_workers() {
        let cfg = ServerConfig {
            workers: WorkerCount::Fixed(0),
            ..ServerConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.as_label(), "config_invalid");
    }

    #[test]
    fn load_reports_read_and_parse_errors() {
        let missing = ServerConfig::load(Some(Path::new("/nonexistent/workvisor.json")));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{{ not json").unwrap();
        let bad = ServerConfig::load(Some(f.path()));
        assert!(matches!(bad, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn load_without_path_gives_defaults() {
        let cfg = ServerConfig::load(None).unwrap();
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn worker_count_round_trips_through_json() {
        let cfg = ServerConfig {
            workers: WorkerCount::Fixed(2),
            ..ServerConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains(r#""workers":2"#));
        assert_eq!(ServerConfig::from_json(&json).unwrap(), cfg);
    }

    #[test]
    fn listen_addr_brackets_ipv6() {
        let cfg = ServerConfig {
            host: "::1".into(),
            port: 80,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.listen_addr(), "[::1]:80");
    }
}
