//! # Rolling failure window.
//!
//! [`FailurePolicy`] decides whether a crashed worker gets respawned or its
//! slot gets aborted. Failures are counted in a window that starts at the
//! last reset:
//!
//! ```text
//! record_failure(at):
//!   aborted                      → Abort
//!   at - window_start > window   → count = 0, window_start = at
//!   count += 1
//!   count > max_failures         → aborted = true, Abort
//!   otherwise                    → Respawn
//! ```
//!
//! Independently of failures, the supervisor calls [`FailureWindow::tick`]
//! periodically so a slot that has been healthy for a full window starts
//! from zero again.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use tokio::time::Instant;
//! use workvisor::{Decision, FailurePolicy, FailureWindow};
//!
//! let policy = FailurePolicy { window: Duration::from_secs(60), max_failures: 2 };
//! let now = Instant::now();
//! let mut w = FailureWindow::new(policy, now);
//!
//! assert_eq!(w.record_failure(now), Decision::Respawn);
//! assert_eq!(w.record_failure(now), Decision::Respawn);
//! assert_eq!(w.record_failure(now), Decision::Abort);
//! assert!(w.is_aborted());
//! ```

use std::time::Duration;

use tokio::time::Instant;

/// Failure budget shared by all slots of a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailurePolicy {
    /// Length of the counting window.
    pub window: Duration,
    /// Failures tolerated inside one window.
    pub max_failures: u32,
}

impl Default for FailurePolicy {
    /// `window = 60s`, `max_failures = 10`.
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_failures: 10,
        }
    }
}

impl FailurePolicy {
    /// Period of the background reset tick: a quarter window, at least 10ms.
    ///
    /// A healthy slot is therefore reset between `window` and `1.25 × window`
    /// after its previous reset.
    pub fn tick_interval(&self) -> Duration {
        (self.window / 4).max(Duration::from_millis(10))
    }
}

/// Outcome of recording a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Start a replacement in the same slot.
    Respawn,
    /// Give up on the slot for good.
    Abort,
}

/// Per-slot failure state.
#[derive(Clone, Debug)]
pub struct FailureWindow {
    policy: FailurePolicy,
    window_start: Instant,
    count: u32,
    aborted: bool,
}

impl FailureWindow {
    /// Fresh window starting at `now`.
    pub fn new(policy: FailurePolicy, now: Instant) -> Self {
        Self {
            policy,
            window_start: now,
            count: 0,
            aborted: false,
        }
    }

    /// Records one failure at `at` and decides what to do with the slot.
    ///
    /// Once a slot is aborted every later call returns [`Decision::Abort`].
    pub fn record_failure(&mut self, at: Instant) -> Decision {
        if self.aborted {
            return Decision::Abort;
        }
        if at.saturating_duration_since(self.window_start) > self.policy.window {
            self.count = 0;
            self.window_start = at;
        }
        self.count = self.count.saturating_add(1);
        if self.count > self.policy.max_failures {
            self.aborted = true;
            Decision::Abort
        } else {
            Decision::Respawn
        }
    }

    /// Periodic reset; returns `true` if a non-zero count was cleared.
    ///
    /// Never resets earlier than one full window after the previous reset
    /// and never touches an aborted slot.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.aborted {
            return false;
        }
        if now.saturating_duration_since(self.window_start) < self.policy.window {
            return false;
        }
        let had_failures = self.count > 0;
        self.count = 0;
        self.window_start = now;
        had_failures
    }

    /// Failures counted in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Whether the slot was given up on.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Start of the current window.
    pub fn window_start(&self) -> Instant {
        self.window_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FailurePolicy {
        FailurePolicy::default()
    }

    #[test]
    fn six_quick_failures_keep_respawning() {
        let t0 = Instant::now();
        let mut w = FailureWindow::new(policy(), t0);
        for i in 0..6 {
            let at = t0 + Duration::from_secs(i);
            assert_eq!(w.record_failure(at), Decision::Respawn);
        }
        assert_eq!(w.count(), 6);
        assert!(!w.is_aborted());
    }

    #[test]
    fn eleventh_failure_in_window_aborts() {
        let t0 = Instant::now();
        let mut w = FailureWindow::new(policy(), t0);
        for i in 0..10 {
            let at = t0 + Duration::from_secs(i);
            assert_eq!(w.record_failure(at), Decision::Respawn, "failure #{}", i + 1);
        }
        assert_eq!(w.record_failure(t0 + Duration::from_secs(10)), Decision::Abort);
        assert!(w.is_aborted());
    }

    #[test]
    fn abort_is_sticky() {
        let t0 = Instant::now();
        let mut w = FailureWindow::new(
            FailurePolicy {
                window: Duration::from_secs(60),
                max_failures: 0,
            },
            t0,
        );
        assert_eq!(w.record_failure(t0), Decision::Abort);
        let later = t0 + Duration::from_secs(3600);
        assert!(!w.tick(later));
        assert_eq!(w.record_failure(later), Decision::Abort);
    }

    #[test]
    fn spaced_failures_never_abort() {
        let t0 = Instant::now();
        let mut w = FailureWindow::new(policy(), t0);
        for i in 1..=50u64 {
            let at = t0 + Duration::from_secs(61 * i);
            assert_eq!(w.record_failure(at), Decision::Respawn);
            assert_eq!(w.count(), 1);
        }
    }

    #[test]
    fn failure_exactly_at_window_edge_still_counts() {
        let t0 = Instant::now();
        let mut w = FailureWindow::new(policy(), t0);
        w.record_failure(t0);
        w.record_failure(t0 + Duration::from_secs(60));
        assert_eq!(w.count(), 2);
    }

    #[test]
    fn tick_resets_only_after_full_window() {
        let t0 = Instant::now();
        let mut w = FailureWindow::new(policy(), t0);
        w.record_failure(t0 + Duration::from_secs(1));

        assert!(!w.tick(t0 + Duration::from_secs(59)));
        assert_eq!(w.count(), 1);

        assert!(w.tick(t0 + Duration::from_secs(60)));
        assert_eq!(w.count(), 0);
        assert_eq!(w.window_start(), t0 + Duration::from_secs(60));

        // Nothing to clear, and the next reset is a full window away.
        assert!(!w.tick(t0 + Duration::from_secs(90)));
        assert_eq!(w.window_start(), t0 + Duration::from_secs(60));
    }

    #[test]
    fn tick_interval_is_quarter_window() {
        assert_eq!(policy().tick_interval(), Duration::from_secs(15));
        let tiny = FailurePolicy {
            window: Duration::from_millis(8),
            max_failures: 1,
        };
        assert_eq!(tiny.tick_interval(), Duration::from_millis(10));
    }
}
