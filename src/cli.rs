//! Command line interface.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use workvisor::logging::LogFormat;
use workvisor::{ConfigError, ServerConfig, WorkerCount};

pub const DEFAULT_PID_FILE: &str = "workvisor.pid";

#[derive(Parser, Debug)]
#[command(name = "workvisor", version, about = "Static file server with a supervised worker pool")]
pub struct Cli {
    /// More output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format: pretty, compact or json.
    #[arg(long, global = true, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the master and its workers in the foreground.
    Serve(ServeArgs),

    /// Ask a running master to reload its config (SIGHUP).
    Reload {
        #[arg(long, default_value = DEFAULT_PID_FILE)]
        pid_file: PathBuf,
    },

    /// Ask a running master to stop (SIGTERM, or SIGQUIT with --force).
    Stop {
        /// Kill workers instead of letting them finish requests.
        #[arg(long)]
        force: bool,
        #[arg(long, default_value = DEFAULT_PID_FILE)]
        pid_file: PathBuf,
    },

    /// Worker process entry point (started by the master).
    #[command(hide = true)]
    Worker,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// JSON config file; defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of workers, or "auto" for one per CPU.
    #[arg(short, long)]
    pub workers: Option<WorkerCount>,

    /// Directory to serve.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Port to listen on.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable per-worker debug status listeners.
    #[arg(long)]
    pub debug: bool,

    /// Where the master records its pid.
    #[arg(long, default_value = DEFAULT_PID_FILE)]
    pub pid_file: PathBuf,
}

impl ServeArgs {
    /// Reads the config file (if any), applies command line overrides and
    /// validates the result. Called at startup and on every reload.
    pub fn load_config(&self) -> Result<ServerConfig, ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(workers) = self.workers {
            cfg.workers = workers;
        }
        if let Some(root) = &self.root {
            cfg.root = root.clone();
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if self.debug {
            cfg.debug = true;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_overrides_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.json");
        std::fs::write(&path, r#"{"port": 9000, "workers": 4, "root": "/srv"}"#).unwrap();

        let cli = Cli::try_parse_from([
            "workvisor",
            "-vv",
            "serve",
            "--config",
            path.to_str().unwrap(),
            "--workers",
            "2",
            "--debug",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);

        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        let cfg = args.load_config().unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.workers, WorkerCount::Fixed(2));
        assert_eq!(cfg.root, PathBuf::from("/srv"));
        assert!(cfg.debug);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let cli = Cli::try_parse_from(["workvisor", "serve", "--workers", "0"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert!(matches!(args.load_config(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn stop_flags() {
        let cli = Cli::try_parse_from(["workvisor", "stop", "--force", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Command::Stop { force, pid_file } => {
                assert!(force);
                assert_eq!(pid_file, PathBuf::from(DEFAULT_PID_FILE));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
