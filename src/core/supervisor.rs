//! # Supervisor: owns the worker pool, fan-out delivery and the control loop.
//!
//! The [`Supervisor`] owns the event bus and a [`SubscriberSet`]. Starting it
//! spawns the initial workers and hands the [`Pool`] to a single control-loop
//! task; callers talk to that task through a [`SupervisorHandle`].
//!
//! ## High-level architecture
//! ```text
//! Supervisor::start(launcher, snapshot)
//!   ├─ subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(Event)
//!   ├─ Pool::start()          one worker per slot (all-or-nothing)
//!   └─ spawn(run_loop)
//!
//! run_loop (single task, owns Pool):
//!   commands   (mpsc)       Reload / Stop / Status   ─► Pool::on_command
//!   signals    (mpsc)       Ready / Exited           ─► Pool::on_signal
//!   ticker     (interval)   failure window reset     ─► Pool::tick
//!   deadline   (sleep)      ready/retry/grace timers ─► Pool::on_deadline
//!
//! Exit path:
//!   Pool::finished() ─► listener drained ─► SubscriberSet::shutdown()
//!                    ─► exit watch set    ─► SupervisorHandle::wait() resolves
//! ```
//!
//! Dropping every [`SupervisorHandle`] closes the command queue, which the
//! loop treats as a graceful stop request.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use workvisor::{
//!     ConfigSnapshot, LogWriter, ProcessLauncher, ServerConfig, Supervisor, SupervisorConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = ServerConfig::default();
//!     let cfg = SupervisorConfig::from_server(&server);
//!
//!     let sup = Supervisor::builder(cfg)
//!         .with_subscriber(Arc::new(LogWriter::default()))
//!         .build();
//!     let launcher = Arc::new(ProcessLauncher::current_exe()?);
//!     let handle = sup.start(launcher, ConfigSnapshot::new(server)).await?;
//!
//!     handle.stop(false).await?;
//!     handle.wait().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::ConfigSnapshot;
use crate::error::SupervisorError;
use crate::events::{Bus, Event};
use crate::subscribers::SubscriberSet;
use crate::workers::{Launcher, WorkerSignal};

use super::builder::SupervisorBuilder;
use super::config::SupervisorConfig;
use super::handle::{Command, SupervisorHandle};
use super::pool::Pool;
use super::status::LoopExit;

/// Not-yet-started supervisor: configuration, event bus and subscribers.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    subs: SubscriberSet,
}

impl Supervisor {
    /// Starts building a supervisor with the given settings.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: SupervisorConfig, bus: Bus, subs: SubscriberSet) -> Self {
        Self { cfg, bus, subs }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Receiver for every event from start on, including the initial spawns.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Spawns the initial pool and the control loop.
    ///
    /// Fails without leaving any worker behind if a worker cannot be
    /// spawned (unless degraded start is enabled and at least one worker is
    /// up). Events published up to the failure are delivered to subscribers
    /// before this returns.
    pub async fn start(
        self,
        launcher: Arc<dyn Launcher>,
        config: ConfigSnapshot,
    ) -> Result<SupervisorHandle, SupervisorError> {
        self.cfg.validate()?;
        let Supervisor { cfg, bus, subs } = self;

        let token = CancellationToken::new();
        let listener = tokio::spawn(subscriber_listener(bus.subscribe(), subs, token.clone()));

        let (sig_tx, sig_rx) = mpsc::unbounded_channel();
        let tick_every = cfg.failure.tick_interval();
        let (cmd_tx, cmd_rx) = mpsc::channel(cfg.command_capacity.max(1));

        let mut pool = Pool::new(cfg, launcher, bus.clone(), sig_tx, config);
        if let Err(e) = pool.start(Instant::now()) {
            close_listener(listener, token).await;
            return Err(e);
        }

        let (exit_tx, exit_rx) = watch::channel(None);
        tokio::spawn(async move {
            let exit = run_loop(pool, cmd_rx, sig_rx, tick_every).await;
            close_listener(listener, token).await;
            exit_tx.send_replace(Some(exit));
        });

        Ok(SupervisorHandle::new(cmd_tx, bus, exit_rx))
    }
}

async fn run_loop(
    mut pool: Pool,
    mut commands: mpsc::Receiver<Command>,
    mut signals: mpsc::UnboundedReceiver<WorkerSignal>,
    tick_every: Duration,
) -> LoopExit {
    let mut ticker = time::interval_at(Instant::now() + tick_every, tick_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut commands_open = true;

    loop {
        if let Some(exit) = pool.finished() {
            return exit;
        }
        let deadline = pool.next_deadline();

        tokio::select! {
            cmd = commands.recv(), if commands_open => match cmd {
                Some(cmd) => pool.on_command(cmd, Instant::now()),
                None => {
                    commands_open = false;
                    pool.begin_stop(false, None, Instant::now());
                }
            },
            Some(sig) = signals.recv() => pool.on_signal(sig, Instant::now()),
            _ = ticker.tick() => pool.tick(Instant::now()),
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                pool.on_deadline(Instant::now());
            }
        }
    }
}

/// Forwards bus events to the subscriber set until cancelled, then flushes
/// what is still buffered and hands the set back.
async fn subscriber_listener(
    mut rx: broadcast::Receiver<Event>,
    subs: SubscriberSet,
    token: CancellationToken,
) -> SubscriberSet {
    loop {
        tokio::select! {
            biased;
            res = rx.recv() => match res {
                Ok(ev) => subs.emit(ev),
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "subscriber listener lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = token.cancelled() => {
                loop {
                    match rx.try_recv() {
                        Ok(ev) => subs.emit(ev),
                        Err(TryRecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
                break;
            }
        }
    }
    subs
}

async fn close_listener(listener: JoinHandle<SubscriberSet>, token: CancellationToken) {
    token.cancel();
    if let Ok(subs) = listener.await {
        subs.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::config::ServerConfig;
    use crate::error::ReloadError;
    use crate::events::EventKind;
    use crate::subscribers::Subscribe;
    use crate::workers::ExitStatus;
    use crate::workers::fake::FakeLauncher;

    struct Recorder(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    fn cfg(workers: usize) -> SupervisorConfig {
        SupervisorConfig {
            workers,
            grace: Duration::from_secs(2),
            ..SupervisorConfig::default()
        }
    }

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot::new(ServerConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn reload_then_graceful_stop() {
        let launcher = FakeLauncher::auto();
        let sup = Supervisor::builder(cfg(2)).build();
        let handle = sup.start(Arc::new(launcher.clone()), snapshot()).await.unwrap();

        let target = snapshot();
        let generation = target.generation();
        let report = handle.reload(target).await.unwrap();
        assert_eq!(report.generation, generation);
        assert_eq!(report.replaced, 2);

        let st = handle.status().await.unwrap();
        assert_eq!(st.live(), 2);
        assert!(st.workers.iter().all(|w| w.generation == generation));

        let stopped = handle.stop(false).await.unwrap();
        assert_eq!(stopped.workers, 2);
        assert!(!stopped.forced);
        assert_eq!(handle.wait().await, LoopExit::Stopped);
        assert!(handle.is_closed());
        assert_eq!(launcher.count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn second_reload_is_rejected() {
        let launcher = FakeLauncher::manual();
        let sup = Supervisor::builder(cfg(1)).build();
        let handle = sup.start(Arc::new(launcher.clone()), snapshot()).await.unwrap();

        let first = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.reload(snapshot()).await })
        };
        while launcher.count() < 2 {
            tokio::task::yield_now().await;
        }

        let err = handle.reload(snapshot()).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Reload(ReloadError::InProgress)));

        let replacement = launcher.launched()[1].clone();
        replacement.notifier.ready();
        assert_eq!(first.await.unwrap().unwrap().replaced, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_every_event_before_wait_returns() {
        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let sup = Supervisor::builder(cfg(2))
            .with_subscriber(rec.clone())
            .build();
        let handle = sup
            .start(Arc::new(FakeLauncher::auto()), snapshot())
            .await
            .unwrap();

        let report = handle.stop(true).await.unwrap();
        assert!(report.forced);
        handle.wait().await;

        let kinds = rec.0.lock().unwrap().clone();
        assert_eq!(
            kinds.iter().filter(|k| **k == EventKind::WorkerSpawned).count(),
            2
        );
        assert!(kinds.contains(&EventKind::StopRequested));
        assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_stops_gracefully() {
        let launcher = FakeLauncher::auto();
        let sup = Supervisor::builder(cfg(2)).build();
        let mut rx = sup.subscribe();
        let handle = sup.start(Arc::new(launcher.clone()), snapshot()).await.unwrap();

        drop(handle);

        let mut stopped = false;
        while let Ok(ev) = rx.recv().await {
            if ev.kind == EventKind::AllStoppedWithin {
                stopped = true;
                break;
            }
        }
        assert!(stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn workers_exiting_cleanly_end_the_loop_as_retired() {
        let launcher = FakeLauncher::manual();
        let sup = Supervisor::builder(cfg(2)).build();
        let handle = sup.start(Arc::new(launcher.clone()), snapshot()).await.unwrap();

        for l in launcher.launched() {
            l.notifier.exited(ExitStatus::code(0));
        }

        assert_eq!(handle.wait().await, LoopExit::Retired);
        assert!(matches!(
            handle.stop(false).await,
            Err(SupervisorError::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn pool_exhaustion_ends_the_loop() {
        let launcher = FakeLauncher::manual();
        let mut c = cfg(1);
        c.failure.max_failures = 0;
        let sup = Supervisor::builder(c).build();
        let handle = sup.start(Arc::new(launcher.clone()), snapshot()).await.unwrap();

        launcher.launched()[0].notifier.exited(ExitStatus::code(1));

        assert_eq!(handle.wait().await, LoopExit::Exhausted);
        assert!(matches!(
            handle.status().await,
            Err(SupervisorError::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn start_failure_is_returned() {
        let launcher = FakeLauncher::manual();
        launcher.set_always_fail(true);
        let sup = Supervisor::builder(cfg(2)).build();
        let mut rx = sup.subscribe();

        let err = sup.start(Arc::new(launcher), snapshot()).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn { .. }));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::SpawnFailed);
    }

    #[tokio::test]
    async fn empty_pool_is_rejected() {
        let sup = Supervisor::builder(cfg(0)).build();
        let err = sup
            .start(Arc::new(FakeLauncher::auto()), snapshot())
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "supervisor_invalid_config");
    }
}
