//! Logging setup shared by the master and its workers.
//!
//! Everything goes to stderr: worker stdout carries the IPC protocol, and
//! workers inherit the master's stderr so both end up in one stream.
//!
//! # Environment Variables
//!
//! - `WORKVISOR_LOG` - log filter (overrides `RUST_LOG`)
//! - `WORKVISOR_LOG_FORMAT` - output format: pretty, compact, json
//! - `RUST_LOG` - standard filter (fallback)
//!
//! # Example
//!
//! ```no_run
//! use workvisor::logging::{LogConfig, LogFormat, init};
//!
//! init(LogConfig::default().with_format(LogFormat::Json).with_env_overrides());
//! ```

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human-readable output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "full" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "unknown log format '{s}', expected pretty, compact or json"
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

/// Logging configuration; pass to [`init`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base level when no filter is set (default: INFO).
    pub level: Level,
    pub format: LogFormat,
    /// `EnvFilter` directives; override `level` when set.
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Level from a `-v` count: 0 → info, 1 → debug, 2+ → trace.
    pub fn from_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Applies `WORKVISOR_LOG` / `RUST_LOG` (only if no filter is set yet)
    /// and `WORKVISOR_LOG_FORMAT`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, get: impl Fn(&str) -> Option<String>) -> Self {
        if self.filter.is_none() {
            self.filter = get("WORKVISOR_LOG").or_else(|| get("RUST_LOG"));
        }
        if let Some(raw) = get("WORKVISOR_LOG_FORMAT")
            && let Ok(format) = raw.parse()
        {
            self.format = format;
        }
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.as_str().to_lowercase());
        match &self.filter {
            Some(f) => EnvFilter::try_new(f).unwrap_or_else(|_| {
                eprintln!("warning: invalid log filter '{f}', using {}", self.level);
                fallback()
            }),
            None => fallback(),
        }
    }
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init(config: LogConfig) {
    let filter = config.build_filter();
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("warning: logging already initialised: {e}");
    }
}
