use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, error, info, warn};

use workvisor::logging::{self, LogConfig};
use workvisor::serve::StaticFiles;
use workvisor::{
    ConfigSnapshot, ControlSignal, ControlSignals, LogWriter, LoopExit, ProcessLauncher,
    ServerConfig, SharedListener, Supervisor, SupervisorConfig, SupervisorError, SupervisorHandle,
    child,
};

mod cli;
mod pidfile;

use cli::{Cli, Command, ServeArgs};
use pidfile::{MasterSignal, PidFile};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(
        LogConfig::from_verbosity(cli.verbose)
            .with_format(cli.log_format)
            .with_env_overrides(),
    );

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Reload { pid_file } => notify(&pid_file, MasterSignal::Reload),
        Command::Stop { force, pid_file } => {
            let sig = if force {
                MasterSignal::ForceStop
            } else {
                MasterSignal::Stop
            };
            notify(&pid_file, sig)
        }
        Command::Worker => {
            child::run(|env| StaticFiles::new(env.config().root.clone()))
                .await
                .context("worker failed")
        }
    }
}

fn notify(pid_file: &Path, sig: MasterSignal) -> Result<()> {
    let pid = pidfile::signal_master(pid_file, sig)?;
    println!("sent {sig:?} to master (pid {pid})");
    Ok(())
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = args.load_config().context("cannot load configuration")?;
    let listener = SharedListener::bind(&config.listen_addr())
        .with_context(|| format!("cannot listen on {}", config.listen_addr()))?;
    let _pid = PidFile::create(&args.pid_file)?;

    let launcher = ProcessLauncher::current_exe()
        .context("cannot locate own executable")?
        .with_listener(&listener);
    let sup_cfg = SupervisorConfig::from_server(&config);
    let workers = sup_cfg.workers;
    let mut signals = ControlSignals::new().context("cannot install signal handlers")?;

    let sup = Supervisor::builder(sup_cfg)
        .with_subscriber(Arc::new(LogWriter::new()))
        .build();
    let handle = sup
        .start(Arc::new(launcher), ConfigSnapshot::new(config.clone()))
        .await
        .context("cannot start worker pool")?;
    info!(
        addr = %listener.local_addr()?,
        root = %config.root.display(),
        workers,
        pid = std::process::id(),
        "master running"
    );

    let mut signals_open = true;
    let exit = loop {
        tokio::select! {
            exit = handle.wait() => break exit,
            sig = signals.recv(), if signals_open => match sig {
                Some(ControlSignal::Reload) => reload(&handle, &args, &config),
                Some(ControlSignal::Stop) => stop(&handle, false),
                Some(ControlSignal::ForceStop) => stop(&handle, true),
                None => {
                    warn!("signal listeners closed; stopping");
                    signals_open = false;
                    stop(&handle, false);
                }
            },
        }
    };

    match exit {
        LoopExit::Stopped => {
            info!("master stopped");
            Ok(())
        }
        LoopExit::Retired => {
            info!("every worker exited on its own; master stopped");
            Ok(())
        }
        LoopExit::Exhausted => bail!("every worker slot failed; giving up"),
    }
}

/// Re-reads the config and rolls the pool over to it in the background.
///
/// Settings bound at startup (address, pool size) only change on restart.
fn reload(handle: &SupervisorHandle, args: &ServeArgs, started: &ServerConfig) {
    let next = match args.load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, label = e.as_label(), "reload skipped; keeping current config");
            return;
        }
    };
    if next.listen_addr() != started.listen_addr() || next.workers != started.workers {
        warn!("address and worker count changes need a restart; ignoring them");
    }

    let snapshot = ConfigSnapshot::new(next);
    let generation = snapshot.generation();
    info!(generation, "reloading");

    let handle = handle.clone();
    tokio::spawn(async move {
        match handle.reload(snapshot).await {
            Ok(report) => info!(
                generation = report.generation,
                replaced = report.replaced,
                skipped = report.skipped,
                "reload complete"
            ),
            Err(e) => error!(generation, error = %e, label = e.as_label(), "reload failed"),
        }
    });
}

fn stop(handle: &SupervisorHandle, force: bool) {
    info!(force, "stopping");
    let handle = handle.clone();
    tokio::spawn(async move {
        match handle.stop(force).await {
            Ok(report) => info!(
                workers = report.workers,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "all workers exited"
            ),
            Err(SupervisorError::Closed) => debug!("pool already stopped"),
            Err(e) => error!(error = %e, label = e.as_label(), "stop did not complete cleanly"),
        }
    });
}
