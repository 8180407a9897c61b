//! # Pool state machine
//!
//! [`Pool`] owns every [`WorkerHandle`] and all supervision state. It is
//! driven by the control loop through synchronous handlers, each taking the
//! current time:
//!
//! ```text
//! on_signal(Ready | Exited)   worker notifications
//! on_command(Reload | Stop | Status)
//! tick(now)                   periodic failure-window reset
//! on_deadline(now)            ready timeouts, retry delays, drain/stop grace
//! ```
//!
//! ## Per-slot lifecycle
//! ```text
//! Spawning ──ready──► Running ──exit──► Exited ─┬─ failure, Respawn ─► Spawning
//!                                               ├─ failure, Abort   ─► removed
//!                                               └─ voluntary        ─► removed
//! ```
//!
//! ## Rolling reload
//! Slots are replaced oldest worker first, one at a time. A replacement joins
//! the slot only after it reported ready; its predecessor is then
//! disconnected and moved to `draining`. At any time a slot has at most one
//! worker being replaced, so the pool never drops below its live size.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::debug;

use crate::config::ConfigSnapshot;
use crate::error::{CrashError, ReloadError, SpawnError, SupervisorError};
use crate::events::{Bus, Event, EventKind};
use crate::policies::Decision;
use crate::workers::{
    ExitKind, ExitStatus, Launcher, SignalKind, SlotId, WorkerHandle, WorkerId, WorkerSignal,
    WorkerState,
};

use super::config::SupervisorConfig;
use super::handle::Command;
use super::reload::{ReloadStep, RollingReload};
use super::slot::{Draining, Slot};
use super::status::{
    LoopExit, PoolStatus, ReloadProgress, ReloadReport, StopReport, WorkerStatus,
};

type ReloadReply = oneshot::Sender<Result<ReloadReport, ReloadError>>;
type StopReply = oneshot::Sender<Result<StopReport, SupervisorError>>;

/// Where a worker id was found.
enum Located {
    Slot(SlotId),
    Replacement,
    Draining,
}

struct Stopping {
    force: bool,
    deadline: Option<Instant>,
    replies: Vec<StopReply>,
    killed: Vec<WorkerId>,
    started: Instant,
    workers: usize,
}

pub(crate) struct Pool {
    cfg: SupervisorConfig,
    launcher: Arc<dyn Launcher>,
    bus: Bus,
    signals: mpsc::UnboundedSender<WorkerSignal>,
    current: ConfigSnapshot,
    slots: BTreeMap<SlotId, Slot>,
    draining: HashMap<WorkerId, Draining>,
    reload: Option<RollingReload>,
    stopping: Option<Stopping>,
    aborted: Vec<SlotId>,
    next_id: u64,
    /// Reported once stopped; set when the pool empties on its own.
    outcome: LoopExit,
    exit: Option<LoopExit>,
}

impl Pool {
    pub fn new(
        cfg: SupervisorConfig,
        launcher: Arc<dyn Launcher>,
        bus: Bus,
        signals: mpsc::UnboundedSender<WorkerSignal>,
        current: ConfigSnapshot,
    ) -> Self {
        Self {
            cfg,
            launcher,
            bus,
            signals,
            current,
            slots: BTreeMap::new(),
            draining: HashMap::new(),
            reload: None,
            stopping: None,
            aborted: Vec::new(),
            next_id: 1,
            outcome: LoopExit::Stopped,
            exit: None,
        }
    }

    /// Spawns one worker per slot.
    ///
    /// On failure every worker already spawned is killed, unless degraded
    /// start is allowed and at least one worker is up.
    pub fn start(&mut self, now: Instant) -> Result<(), SupervisorError> {
        let mut failed: Vec<(SlotId, SpawnError)> = Vec::new();

        for i in 0..self.cfg.workers {
            let slot = SlotId(i);
            match self.spawn_worker(slot, self.current.clone(), now) {
                Ok(h) => {
                    self.slots.insert(slot, Slot::new(h, self.cfg.failure, now));
                }
                Err(e) => {
                    failed.push((slot, e));
                    if !self.cfg.degraded_start {
                        break;
                    }
                }
            }
        }

        if failed.is_empty() {
            return Ok(());
        }
        if self.cfg.degraded_start && !self.slots.is_empty() {
            for (slot, e) in failed {
                self.aborted.push(slot);
                self.bus.publish(
                    Event::new(EventKind::SlotAborted)
                        .with_slot(slot)
                        .with_reason(format!("spawn failed at start: {e}")),
                );
            }
            return Ok(());
        }

        for s in self.slots.values_mut() {
            s.worker.kill();
        }
        self.slots.clear();
        let (slot, source) = failed.swap_remove(0);
        Err(SupervisorError::Spawn { slot, source })
    }

    /// Why the loop should end, once it should.
    pub fn finished(&self) -> Option<LoopExit> {
        self.exit
    }

    /// Earliest pending timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        let step = self
            .reload
            .as_ref()
            .and_then(|r| r.step.as_ref())
            .map(|s| s.deadline);
        let drain = self.draining.values().filter_map(|d| d.kill_at).min();
        let stop = self.stopping.as_ref().and_then(|s| s.deadline);

        [step, drain, stop].into_iter().flatten().min()
    }

    // === Inputs ===

    pub fn on_signal(&mut self, sig: WorkerSignal, now: Instant) {
        match sig.kind {
            SignalKind::Ready => self.on_ready(sig.worker, now),
            SignalKind::Exited(status) => self.on_exit(sig.worker, status, now),
        }
    }

    pub fn on_command(&mut self, cmd: Command, now: Instant) {
        match cmd {
            Command::Reload { config, reply } => self.begin_reload(config, Some(reply), now),
            Command::Stop { force, reply } => self.begin_stop(force, Some(reply), now),
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    /// Periodic failure-window reset for every slot.
    pub fn tick(&mut self, now: Instant) {
        for s in self.slots.values_mut() {
            if s.failures.tick(now) {
                self.bus
                    .publish(Event::new(EventKind::SlotWindowReset).with_slot(s.id));
            }
        }
    }

    /// Fires every timer that is due at `now`.
    pub fn on_deadline(&mut self, now: Instant) {
        let step_due = self
            .reload
            .as_ref()
            .and_then(|r| r.step.as_ref())
            .filter(|s| s.deadline <= now)
            .map(|s| s.replacement.is_some());
        match step_due {
            Some(true) => self.step_failed(
                format!("not ready within {:?}", self.cfg.ready_timeout),
                now,
            ),
            Some(false) => self.spawn_replacement(now),
            None => {}
        }

        for d in self.draining.values_mut() {
            if d.kill_at.is_some_and(|t| t <= now) {
                d.kill_at = None;
                if d.handle.kill() {
                    self.bus.publish(
                        Event::new(EventKind::WorkerKilled)
                            .with_worker(d.handle.id())
                            .with_slot(d.handle.slot())
                            .with_reason("drain grace exceeded"),
                    );
                }
            }
        }

        if let Some(st) = self.stopping.as_mut()
            && st.deadline.is_some_and(|t| t <= now)
        {
            st.deadline = None;
            for d in self.draining.values_mut() {
                d.kill_at = None;
                if d.handle.kill() {
                    st.killed.push(d.handle.id());
                    self.bus.publish(
                        Event::new(EventKind::WorkerKilled)
                            .with_worker(d.handle.id())
                            .with_slot(d.handle.slot())
                            .with_reason("grace exceeded"),
                    );
                }
            }
        }
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            generation: self.current.generation(),
            target: self.cfg.workers,
            workers: self
                .slots
                .values()
                .map(|s| WorkerStatus {
                    id: s.worker.id(),
                    slot: s.id,
                    pid: s.worker.pid(),
                    state: s.worker.state(),
                    generation: s.worker.generation(),
                    failures: s.failures.count(),
                })
                .collect(),
            draining: {
                let mut ids: Vec<_> = self.draining.keys().copied().collect();
                ids.sort();
                ids
            },
            aborted: self.aborted.clone(),
            reload: self.reload.as_ref().map(|r| ReloadProgress {
                generation: r.target.generation(),
                pending: r.queue.len(),
                replaced: r.replaced,
                current: r.step.as_ref().map(|s| s.slot),
            }),
            stopping: self.stopping.is_some(),
        }
    }

    // === Worker notifications ===

    fn locate(&self, id: WorkerId) -> Option<Located> {
        if self.draining.contains_key(&id) {
            return Some(Located::Draining);
        }
        if self.reload.as_ref().and_then(RollingReload::replacement_id) == Some(id) {
            return Some(Located::Replacement);
        }
        self.slots
            .values()
            .find(|s| s.worker.id() == id)
            .map(|s| Located::Slot(s.id))
    }

    fn on_ready(&mut self, id: WorkerId, now: Instant) {
        match self.locate(id) {
            Some(Located::Slot(slot)) => {
                let Some(s) = self.slots.get_mut(&slot) else {
                    return;
                };
                if s.worker.mark_ready() {
                    self.bus.publish(ready_event(&s.worker));
                }
            }
            Some(Located::Replacement) => self.promote_replacement(now),
            Some(Located::Draining) | None => {
                debug!(worker = id.get(), "ignoring ready from inactive worker");
            }
        }
    }

    fn on_exit(&mut self, id: WorkerId, status: ExitStatus, now: Instant) {
        match self.locate(id) {
            Some(Located::Draining) => {
                if let Some(mut d) = self.draining.remove(&id) {
                    d.handle.mark_exited(status);
                    self.bus.publish(exit_event(EventKind::WorkerExited, &d.handle, status));
                }
                self.maybe_finish_stop(now);
            }
            Some(Located::Replacement) => self.on_replacement_exit(status, now),
            Some(Located::Slot(slot)) => self.on_slot_exit(slot, status, now),
            None => debug!(worker = id.get(), "ignoring exit of unknown worker"),
        }
    }

    fn on_slot_exit(&mut self, slot: SlotId, status: ExitStatus, now: Instant) {
        let step_here = self
            .reload
            .as_ref()
            .and_then(|r| r.step.as_ref())
            .is_some_and(|s| s.slot == slot);
        if step_here {
            self.cancel_step("predecessor exited");
        }

        let Some(s) = self.slots.get_mut(&slot) else {
            return;
        };
        match s.worker.mark_exited(status) {
            ExitKind::Voluntary => {
                let worker = s.worker.id();
                self.bus
                    .publish(exit_event(EventKind::WorkerExited, &s.worker, status));
                self.slots.remove(&slot);
                self.bus.publish(
                    Event::new(EventKind::SlotRetired)
                        .with_worker(worker)
                        .with_slot(slot),
                );
                self.after_slot_removed(slot, now);
            }
            ExitKind::Failure => {
                let decision = s.failures.record_failure(now);
                let crash = CrashError {
                    worker: s.worker.id(),
                    slot,
                    status,
                    failures: s.failures.count(),
                };
                self.bus.publish(
                    exit_event(EventKind::WorkerCrashed, &s.worker, status)
                        .with_failures(crash.failures)
                        .with_reason(crash.to_string()),
                );
                match decision {
                    Decision::Respawn => self.respawn(slot, now),
                    Decision::Abort => self.abort_slot(slot, crash.to_string(), now),
                }
            }
        }

        if step_here {
            self.advance_reload(now);
        }
    }

    /// Puts a fresh worker running the current snapshot into `slot`.
    ///
    /// A spawn error counts as another failure of the slot, so this either
    /// succeeds or ends in an abort.
    fn respawn(&mut self, slot: SlotId, now: Instant) {
        loop {
            match self.spawn_worker(slot, self.current.clone(), now) {
                Ok(h) => {
                    if let Some(s) = self.slots.get_mut(&slot) {
                        s.worker = h;
                    }
                    return;
                }
                Err(e) => {
                    let Some(s) = self.slots.get_mut(&slot) else {
                        return;
                    };
                    if s.failures.record_failure(now) == Decision::Abort {
                        self.abort_slot(slot, format!("respawn failed: {e}"), now);
                        return;
                    }
                }
            }
        }
    }

    fn abort_slot(&mut self, slot: SlotId, reason: String, now: Instant) {
        let Some(s) = self.slots.remove(&slot) else {
            return;
        };
        self.aborted.push(slot);
        self.bus.publish(
            Event::new(EventKind::SlotAborted)
                .with_worker(s.worker.id())
                .with_slot(slot)
                .with_failures(s.failures.count())
                .with_reason(reason),
        );
        self.after_slot_removed(slot, now);
    }

    fn after_slot_removed(&mut self, slot: SlotId, now: Instant) {
        if let Some(r) = self.reload.as_mut() {
            r.queue.retain(|s| *s != slot);
        }
        if !self.slots.is_empty() || self.stopping.is_some() {
            return;
        }
        if self.aborted.is_empty() {
            debug!("every slot retired; stopping");
            self.outcome = LoopExit::Retired;
        } else {
            self.outcome = LoopExit::Exhausted;
            self.bus.publish(Event::new(EventKind::PoolExhausted));
        }
        self.begin_stop(false, None, now);
    }

    // === Reload ===

    fn begin_reload(&mut self, config: ConfigSnapshot, reply: Option<ReloadReply>, now: Instant) {
        let refusal = if self.stopping.is_some() {
            Some(ReloadError::Stopping)
        } else if self.reload.is_some() {
            Some(ReloadError::InProgress)
        } else {
            None
        };
        if let Some(err) = refusal {
            self.bus.publish(
                Event::new(EventKind::ReloadRejected)
                    .with_generation(config.generation())
                    .with_reason(err.to_string()),
            );
            if let Some(tx) = reply {
                let _ = tx.send(Err(err));
            }
            return;
        }

        let mut order: Vec<(WorkerId, SlotId)> =
            self.slots.values().map(|s| (s.worker.id(), s.id)).collect();
        order.sort();
        let queue: VecDeque<SlotId> = order.into_iter().map(|(_, slot)| slot).collect();

        self.bus.publish(
            Event::new(EventKind::ReloadStarted)
                .with_generation(config.generation())
                .with_count(queue.len()),
        );
        let previous = std::mem::replace(&mut self.current, config.clone());
        self.reload = Some(RollingReload::new(config, previous, queue, reply));
        self.advance_reload(now);
    }

    /// Starts the next step, skipping slots already on the target generation.
    fn advance_reload(&mut self, now: Instant) {
        loop {
            let Some(r) = self.reload.as_mut() else {
                return;
            };
            if r.step.is_some() {
                return;
            }
            let Some(slot) = r.queue.pop_front() else {
                self.complete_reload();
                return;
            };
            match self.slots.get(&slot) {
                Some(s) if s.worker.generation() != r.target.generation() => {
                    r.step = Some(ReloadStep {
                        slot,
                        predecessor: s.worker.id(),
                        attempt: 1,
                        replacement: None,
                        deadline: now,
                    });
                    self.spawn_replacement(now);
                }
                _ => r.skipped += 1,
            }
        }
    }

    fn spawn_replacement(&mut self, now: Instant) {
        let Some(r) = self.reload.as_ref() else {
            return;
        };
        let Some(step) = r.step.as_ref() else {
            return;
        };
        let (slot, attempt, predecessor) = (step.slot, step.attempt, step.predecessor);
        let target = r.target.clone();

        match self.spawn_worker(slot, target.clone(), now) {
            Ok(h) => {
                self.bus.publish(
                    Event::new(EventKind::ReloadStepStarted)
                        .with_worker(h.id())
                        .with_replaces(predecessor)
                        .with_slot(slot)
                        .with_generation(target.generation())
                        .with_attempt(attempt)
                        .with_timeout(self.cfg.ready_timeout),
                );
                let deadline = now + self.cfg.ready_timeout;
                match self.reload.as_mut().and_then(|r| r.step.as_mut()) {
                    Some(step) => {
                        step.replacement = Some(h);
                        step.deadline = deadline;
                    }
                    None => self.kill_and_drain(h, "reload gone"),
                }
            }
            Err(source) => self.fail_reload(ReloadError::Spawn { slot, source }, now),
        }
    }

    /// The awaited replacement is ready: it takes the slot, the predecessor drains.
    fn promote_replacement(&mut self, now: Instant) {
        let Some(r) = self.reload.as_mut() else {
            return;
        };
        let Some(mut replacement) = r.step.take().and_then(|s| s.replacement) else {
            return;
        };
        r.replaced += 1;

        replacement.mark_ready();
        self.bus.publish(ready_event(&replacement));

        let slot = replacement.slot();
        match self.slots.get_mut(&slot) {
            Some(s) => {
                let old = std::mem::replace(&mut s.worker, replacement);
                self.bus.publish(
                    Event::new(EventKind::ReloadStepCompleted)
                        .with_worker(s.worker.id())
                        .with_replaces(old.id())
                        .with_slot(slot)
                        .with_generation(s.worker.generation()),
                );
                self.retire(old, "replaced", now);
            }
            None => self.kill_and_drain(replacement, "slot gone"),
        }
        self.advance_reload(now);
    }

    fn on_replacement_exit(&mut self, status: ExitStatus, now: Instant) {
        let Some(step) = self.reload.as_mut().and_then(|r| r.step.as_mut()) else {
            return;
        };
        let Some(mut h) = step.replacement.take() else {
            return;
        };
        h.mark_exited(status);
        self.bus.publish(exit_event(EventKind::WorkerExited, &h, status));
        self.step_failed(format!("replacement exited with {status} before ready"), now);
    }

    /// The current attempt failed: retry after a delay, or fail the reload.
    fn step_failed(&mut self, reason: String, now: Instant) {
        let Some(step) = self.reload.as_mut().and_then(|r| r.step.as_mut()) else {
            return;
        };
        let (slot, attempt) = (step.slot, step.attempt);
        let replacement = step.replacement.take();
        let worker = replacement.as_ref().map(WorkerHandle::id);

        if self.cfg.retry.allows_retry(attempt) {
            let delay = self.cfg.retry.delay(attempt);
            step.attempt += 1;
            step.deadline = now + delay;

            let mut ev = Event::new(EventKind::ReloadStepRetry)
                .with_slot(slot)
                .with_attempt(attempt)
                .with_delay(delay)
                .with_reason(reason);
            if let Some(w) = worker {
                ev = ev.with_worker(w);
            }
            self.bus.publish(ev);
            if let Some(h) = replacement {
                self.kill_and_drain(h, "not ready");
            }
        } else {
            if let Some(h) = replacement {
                self.kill_and_drain(h, "not ready");
            }
            self.fail_reload(
                ReloadError::Timeout {
                    slot,
                    attempts: attempt,
                    timeout: self.cfg.ready_timeout,
                },
                now,
            );
        }
    }

    /// Drops the in-flight step because its slot changed underneath it.
    fn cancel_step(&mut self, reason: &'static str) {
        let Some(r) = self.reload.as_mut() else {
            return;
        };
        let Some(step) = r.step.take() else {
            return;
        };
        r.skipped += 1;
        if let Some(h) = step.replacement {
            self.kill_and_drain(h, reason);
        }
    }

    fn complete_reload(&mut self) {
        let Some(mut r) = self.reload.take() else {
            return;
        };
        let report = r.report();
        self.bus.publish(
            Event::new(EventKind::ReloadCompleted)
                .with_generation(report.generation)
                .with_count(report.replaced),
        );
        if let Some(tx) = r.reply.take() {
            let _ = tx.send(Ok(report));
        }
    }

    /// Ends the reload with `err`. Replaced slots keep the new config; new
    /// spawns go back to the previous one.
    fn fail_reload(&mut self, err: ReloadError, now: Instant) {
        let Some(mut r) = self.reload.take() else {
            return;
        };
        if let Some(h) = r.step.take().and_then(|s| s.replacement) {
            self.kill_and_drain(h, "reload aborted");
        }
        self.current = r.previous.clone();
        self.bus.publish(
            Event::new(EventKind::ReloadFailed)
                .with_generation(r.target.generation())
                .with_reason(err.to_string()),
        );
        if let Some(tx) = r.reply.take() {
            let _ = tx.send(Err(err));
        }
    }

    // === Stop ===

    pub fn begin_stop(&mut self, force: bool, reply: Option<StopReply>, now: Instant) {
        if let Some(st) = self.stopping.as_mut() {
            st.replies.extend(reply);
            if force && !st.force {
                st.force = true;
                st.deadline = None;
                for d in self.draining.values_mut() {
                    d.kill_at = None;
                    if d.handle.kill() {
                        self.bus.publish(
                            Event::new(EventKind::WorkerKilled)
                                .with_worker(d.handle.id())
                                .with_slot(d.handle.slot())
                                .with_reason("force stop"),
                        );
                    }
                }
            }
            return;
        }

        self.bus.publish(
            Event::new(EventKind::StopRequested)
                .with_reason(if force { "force" } else { "graceful" }),
        );
        self.fail_reload(ReloadError::Cancelled, now);

        let slots = std::mem::take(&mut self.slots);
        let workers = slots.len();
        for (_, s) in slots {
            if force {
                self.kill_and_drain(s.worker, "stop");
            } else {
                self.retire(s.worker, "stop", now);
            }
        }
        for d in self.draining.values_mut() {
            d.kill_at = None;
            if force && d.handle.kill() {
                self.bus.publish(
                    Event::new(EventKind::WorkerKilled)
                        .with_worker(d.handle.id())
                        .with_slot(d.handle.slot())
                        .with_reason("stop"),
                );
            }
        }

        self.stopping = Some(Stopping {
            force,
            deadline: (!force).then(|| now + self.cfg.grace),
            replies: reply.into_iter().collect(),
            killed: Vec::new(),
            started: now,
            workers,
        });
        self.maybe_finish_stop(now);
    }

    fn maybe_finish_stop(&mut self, now: Instant) {
        if !self.draining.is_empty() {
            return;
        }
        let Some(st) = self.stopping.take() else {
            return;
        };

        let grace = self.cfg.grace;
        if st.killed.is_empty() {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
        } else {
            let ids: Vec<String> = st.killed.iter().map(ToString::to_string).collect();
            self.bus.publish(
                Event::new(EventKind::GraceExceeded)
                    .with_timeout(grace)
                    .with_reason(ids.join(",")),
            );
        }

        for tx in st.replies {
            let res = if st.killed.is_empty() {
                Ok(StopReport {
                    workers: st.workers,
                    forced: st.force,
                    elapsed: now.saturating_duration_since(st.started),
                })
            } else {
                Err(SupervisorError::GraceExceeded {
                    grace,
                    stuck: st.killed.clone(),
                })
            };
            let _ = tx.send(res);
        }

        self.exit = Some(self.outcome);
    }

    // === Helpers ===

    fn spawn_worker(
        &mut self,
        slot: SlotId,
        config: ConfigSnapshot,
        now: Instant,
    ) -> Result<WorkerHandle, SpawnError> {
        let id = WorkerId(self.next_id);
        self.next_id += 1;
        let generation = config.generation();

        let res = WorkerHandle::spawn(
            &*self.launcher,
            id,
            slot,
            config,
            self.cfg.debug_port(slot),
            &self.signals,
            now,
        );
        match &res {
            Ok(h) => self.bus.publish(
                Event::new(EventKind::WorkerSpawned)
                    .with_worker(id)
                    .with_slot(slot)
                    .with_generation(generation)
                    .with_pid(h.pid()),
            ),
            Err(e) => self.bus.publish(
                Event::new(EventKind::SpawnFailed)
                    .with_slot(slot)
                    .with_generation(generation)
                    .with_reason(e.to_string()),
            ),
        }
        res
    }

    /// Disconnects `handle` and lets it drain for up to `grace`.
    fn retire(&mut self, mut handle: WorkerHandle, reason: &'static str, now: Instant) {
        if handle.disconnect() {
            self.bus.publish(
                Event::new(EventKind::WorkerDisconnecting)
                    .with_worker(handle.id())
                    .with_slot(handle.slot())
                    .with_reason(reason),
            );
        }
        let kill_at = Some(now + self.cfg.grace);
        self.draining
            .insert(handle.id(), Draining { handle, kill_at });
    }

    /// Kills `handle` and keeps it until its exit is reported.
    fn kill_and_drain(&mut self, mut handle: WorkerHandle, reason: &'static str) {
        if handle.state() == WorkerState::Exited {
            return;
        }
        if handle.kill() {
            self.bus.publish(
                Event::new(EventKind::WorkerKilled)
                    .with_worker(handle.id())
                    .with_slot(handle.slot())
                    .with_reason(reason),
            );
        }
        self.draining.insert(
            handle.id(),
            Draining {
                handle,
                kill_at: None,
            },
        );
    }
}

fn ready_event(h: &WorkerHandle) -> Event {
    Event::new(EventKind::WorkerReady)
        .with_worker(h.id())
        .with_slot(h.slot())
        .with_generation(h.generation())
}

fn exit_event(kind: EventKind, h: &WorkerHandle, status: ExitStatus) -> Event {
    Event::new(kind)
        .with_worker(h.id())
        .with_slot(h.slot())
        .with_generation(h.generation())
        .with_exit(status)
}
