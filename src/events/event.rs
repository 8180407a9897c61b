//! # Runtime events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Worker lifecycle**: spawn, ready, disconnect, kill, exit, crash
//! - **Slot supervision**: abort, failure window reset, pool exhaustion
//! - **Reload**: rolling reload progress and outcome
//! - **Stop**: stop requests and their outcome
//!
//! The [`Event`] struct carries the metadata: worker id, slot, config
//! generation, exit status, failure count, reasons and timings.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use workvisor::{Event, EventKind, ExitStatus, SlotId, WorkerId};
//!
//! let ev = Event::new(EventKind::WorkerCrashed)
//!     .with_worker(WorkerId::from(7))
//!     .with_slot(SlotId::from(1))
//!     .with_exit(ExitStatus::code(1))
//!     .with_failures(3);
//!
//! assert_eq!(ev.kind, EventKind::WorkerCrashed);
//! assert_eq!(ev.exit_code, Some(1));
//! assert_eq!(ev.failures, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::workers::{ExitStatus, SlotId, WorkerId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Worker lifecycle ===
    /// A worker process was created.
    ///
    /// Sets:
    /// - `worker`, `slot`, `generation`
    /// - `pid`: OS process id, when known
    WorkerSpawned,

    /// A worker process could not be created.
    ///
    /// Sets:
    /// - `slot`, `generation`
    /// - `reason`: spawn error
    SpawnFailed,

    /// A worker reported that it is listening.
    ///
    /// Sets:
    /// - `worker`, `slot`, `generation`
    WorkerReady,

    /// A worker was asked to finish in-flight work and exit.
    ///
    /// Sets:
    /// - `worker`, `slot`
    /// - `reason`: why ("replaced", "stop")
    WorkerDisconnecting,

    /// A worker was terminated immediately.
    ///
    /// Sets:
    /// - `worker`, `slot`
    /// - `reason`: why ("stop", "grace exceeded", "ready timeout", ...)
    WorkerKilled,

    /// A worker exited without counting as a failure
    /// (requested exit, or exit code 0).
    ///
    /// Sets:
    /// - `worker`, `slot`
    /// - `exit_code` / `signal`
    WorkerExited,

    /// A worker exited on its own with a failure status.
    ///
    /// Sets:
    /// - `worker`, `slot`, `generation`
    /// - `exit_code` / `signal`
    /// - `failures`: count in the current window, after this crash
    /// - `reason`: crash description
    WorkerCrashed,

    // === Slot supervision ===
    /// A slot exceeded its failure budget and will not be respawned.
    ///
    /// Sets:
    /// - `worker`: last worker of the slot
    /// - `slot`, `failures`
    /// - `reason`: last crash description
    SlotAborted,

    /// A slot's failure counter was cleared by the periodic tick.
    ///
    /// Sets:
    /// - `slot`
    SlotWindowReset,

    /// A slot was retired after its worker exited voluntarily.
    ///
    /// Sets:
    /// - `worker`, `slot`
    SlotRetired,

    /// Every slot is gone; the supervisor shuts down.
    PoolExhausted,

    // === Reload ===
    /// A rolling reload started.
    ///
    /// Sets:
    /// - `generation`: target generation
    /// - `count`: number of slots queued
    ReloadStarted,

    /// A reload was refused (another one in progress, or stopping).
    ///
    /// Sets:
    /// - `generation`: requested generation
    /// - `reason`
    ReloadRejected,

    /// A replacement for one slot was spawned.
    ///
    /// Sets:
    /// - `worker`: replacement, `replaces`: predecessor
    /// - `slot`, `generation`, `attempt`
    /// - `timeout_ms`: readiness timeout
    ReloadStepStarted,

    /// A replacement failed to become ready; the step will be retried.
    ///
    /// Sets:
    /// - `worker`, `slot`, `attempt`
    /// - `delay_ms`: delay before the next attempt
    /// - `reason`
    ReloadStepRetry,

    /// A replacement became ready and took over its slot.
    ///
    /// Sets:
    /// - `worker`: replacement, `replaces`: predecessor
    /// - `slot`, `generation`
    ReloadStepCompleted,

    /// Every slot runs the new generation.
    ///
    /// Sets:
    /// - `generation`
    /// - `count`: slots replaced
    ReloadCompleted,

    /// The reload stopped before finishing; untouched slots keep the old config.
    ///
    /// Sets:
    /// - `generation`: abandoned generation
    /// - `reason`
    ReloadFailed,

    // === Stop ===
    /// Stop requested.
    ///
    /// Sets:
    /// - `reason`: "graceful" or "force"
    StopRequested,

    /// All workers exited within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; stragglers were killed.
    ///
    /// Sets:
    /// - `timeout_ms`: grace period
    /// - `reason`: killed worker ids
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Worker the event is about.
    pub worker: Option<WorkerId>,
    /// Predecessor of `worker` during a reload step.
    pub replaces: Option<WorkerId>,
    /// Slot the event is about.
    pub slot: Option<SlotId>,
    /// Config generation involved.
    pub generation: Option<u64>,
    /// OS process id.
    pub pid: Option<u32>,
    /// Exit code of a finished worker.
    pub exit_code: Option<i32>,
    /// Terminating signal of a finished worker.
    pub signal: Option<i32>,
    /// Failures counted in the slot's current window.
    pub failures: Option<u32>,
    /// Attempt or count, depending on the kind.
    pub attempt: Option<u32>,
    /// Number of slots a reload queued or replaced.
    pub count: Option<usize>,
    /// Timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Subscriber name for subscriber events.
    pub subscriber: Option<&'static str>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            replaces: None,
            slot: None,
            generation: None,
            pid: None,
            exit_code: None,
            signal: None,
            failures: None,
            attempt: None,
            count: None,
            timeout_ms: None,
            delay_ms: None,
            subscriber: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_worker(mut self, worker: WorkerId) -> Self {
        self.worker = Some(worker);
        self
    }

    #[inline]
    pub fn with_replaces(mut self, worker: WorkerId) -> Self {
        self.replaces = Some(worker);
        self
    }

    #[inline]
    pub fn with_slot(mut self, slot: SlotId) -> Self {
        self.slot = Some(slot);
        self
    }

    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches the pid, if any.
    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// Attaches exit code and signal from `status`.
    #[inline]
    pub fn with_exit(mut self, status: ExitStatus) -> Self {
        self.exit_code = status.code;
        self.signal = status.signal;
        self
    }

    #[inline]
    pub fn with_failures(mut self, n: u32) -> Self {
        self.failures = Some(n);
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::WorkerReady);
        let b = Event::new(EventKind::WorkerReady);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn durations_are_clamped() {
        let ev = Event::new(EventKind::GraceExceeded).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
