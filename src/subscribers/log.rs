//! # LogWriter: events to `tracing`
//!
//! Maps every [`EventKind`] onto a structured `tracing` event. Lifecycle is
//! logged at `info`, crashes and drops at `warn`, aborts and failed reloads
//! at `error`, window resets at `debug`.
//!
//! ## Example output (compact format)
//! ```text
//! INFO workvisor::lifecycle: worker spawned worker=4 slot=1 generation=2 pid=81234
//! WARN workvisor::lifecycle: worker crashed worker=4 slot=1 code=1 failures=3
//! ERROR workvisor::lifecycle: slot aborted slot=1 failures=11
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "workvisor::lifecycle";

/// Subscriber that writes every event to the `tracing` pipeline.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.map(|w| w.get());
        let slot = e.slot.map(|s| s.index());
        let reason = e.reason.as_deref();

        match e.kind {
            EventKind::WorkerSpawned => {
                info!(target: TARGET, worker, slot, generation = e.generation, pid = e.pid, "worker spawned")
            }
            EventKind::SpawnFailed => {
                error!(target: TARGET, slot, generation = e.generation, reason, "spawn failed")
            }
            EventKind::WorkerReady => {
                info!(target: TARGET, worker, slot, generation = e.generation, "worker ready")
            }
            EventKind::WorkerDisconnecting => {
                info!(target: TARGET, worker, slot, reason, "worker disconnecting")
            }
            EventKind::WorkerKilled => {
                warn!(target: TARGET, worker, slot, reason, "worker killed")
            }
            EventKind::WorkerExited => {
                info!(target: TARGET, worker, slot, code = e.exit_code, signal = e.signal, "worker exited")
            }
            EventKind::WorkerCrashed => warn!(
                target: TARGET,
                worker,
                slot,
                code = e.exit_code,
                signal = e.signal,
                failures = e.failures,
                "worker crashed"
            ),
            EventKind::SlotAborted => error!(
                target: TARGET,
                worker,
                slot,
                failures = e.failures,
                reason,
                "slot aborted: failure limit exceeded, not respawning"
            ),
            EventKind::SlotWindowReset => {
                debug!(target: TARGET, slot, "failure window reset")
            }
            EventKind::SlotRetired => {
                info!(target: TARGET, worker, slot, "slot retired after voluntary exit")
            }
            EventKind::PoolExhausted => {
                error!(target: TARGET, "every slot aborted; shutting down")
            }
            EventKind::ReloadStarted => {
                info!(target: TARGET, generation = e.generation, queued = e.count, "reload started")
            }
            EventKind::ReloadRejected => {
                warn!(target: TARGET, generation = e.generation, reason, "reload rejected")
            }
            EventKind::ReloadStepStarted => info!(
                target: TARGET,
                worker,
                replaces = e.replaces.map(|w| w.get()),
                slot,
                attempt = e.attempt,
                timeout_ms = e.timeout_ms,
                "replacing worker"
            ),
            EventKind::ReloadStepRetry => warn!(
                target: TARGET,
                worker,
                slot,
                attempt = e.attempt,
                delay_ms = e.delay_ms,
                reason,
                "replacement not ready, retrying"
            ),
            EventKind::ReloadStepCompleted => info!(
                target: TARGET,
                worker,
                replaces = e.replaces.map(|w| w.get()),
                slot,
                generation = e.generation,
                "worker replaced"
            ),
            EventKind::ReloadCompleted => {
                info!(target: TARGET, generation = e.generation, replaced = e.count, "reload completed")
            }
            EventKind::ReloadFailed => {
                error!(target: TARGET, generation = e.generation, reason, "reload failed")
            }
            EventKind::StopRequested => info!(target: TARGET, mode = reason, "stop requested"),
            EventKind::AllStoppedWithin => info!(target: TARGET, "all workers stopped"),
            EventKind::GraceExceeded => {
                warn!(target: TARGET, grace_ms = e.timeout_ms, killed = reason, "grace exceeded")
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, subscriber = e.subscriber, reason, "subscriber dropped event")
            }
            EventKind::SubscriberPanicked => {
                error!(target: TARGET, subscriber = e.subscriber, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
