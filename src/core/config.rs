//! # Supervisor configuration.
//!
//! [`SupervisorConfig`] holds the settings the control loop works with,
//! usually derived from the server file via [`SupervisorConfig::from_server`].
//!
//! ## Sentinel values
//! - `debug_base_port = None` → workers get no debug listener
//! - `grace = 0s` → graceful stop kills stragglers on the next loop turn

use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::SupervisorError;
use crate::policies::{FailurePolicy, Jitter, RetryPolicy};
use crate::workers::SlotId;

/// Settings of one supervisor.
///
/// ## Field semantics
/// - `workers`: target pool size, fixed for the supervisor's lifetime (min 1)
/// - `failure`: crash budget per slot
/// - `ready_timeout`: how long a reload replacement may take to report ready
/// - `retry`: attempts and delays for one reload step
/// - `grace`: drain time for replaced workers and for graceful stop
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `command_capacity`: queued control requests (min 1)
/// - `degraded_start`: accept a partially spawned pool at start
/// - `debug_base_port`: slot `n` gets debug port `base + n`
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Number of worker slots.
    pub workers: usize,

    /// Failure window and limit applied to every slot.
    pub failure: FailurePolicy,

    /// Readiness timeout for reload replacements.
    ///
    /// A replacement that has not reported ready within this time is killed
    /// and the step is retried according to `retry`.
    pub ready_timeout: Duration,

    /// Retry policy of reload steps.
    pub retry: RetryPolicy,

    /// Maximum time a disconnected worker may take to exit.
    ///
    /// Applies to workers replaced by a reload and to a graceful stop.
    /// Stragglers are killed; a stop then reports
    /// [`SupervisorError::GraceExceeded`].
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Capacity of the control command queue.
    pub command_capacity: usize,

    /// Keep running when only some workers could be spawned at start.
    pub degraded_start: bool,

    /// Base of per-slot debug ports.
    pub debug_base_port: Option<u16>,
}

impl SupervisorConfig {
    /// Derives supervisor settings from a server config.
    pub fn from_server(server: &ServerConfig) -> Self {
        let s = &server.supervision;
        Self {
            workers: server.workers.resolve(),
            failure: FailurePolicy {
                window: Duration::from_millis(s.failure_window_ms),
                max_failures: s.max_failures,
            },
            ready_timeout: Duration::from_millis(s.ready_timeout_ms),
            retry: RetryPolicy {
                attempts: s.reload_attempts,
                first: Duration::from_millis(s.reload_retry_delay_ms),
                ..RetryPolicy::default()
            },
            grace: Duration::from_millis(s.grace_ms),
            degraded_start: s.degraded_start,
            debug_base_port: server.debug.then_some(server.debug_port),
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Debug port of `slot`, if debugging is enabled and the port fits.
    pub fn debug_port(&self, slot: SlotId) -> Option<u16> {
        let base = self.debug_base_port?;
        u16::try_from(slot.index())
            .ok()
            .and_then(|off| base.checked_add(off))
    }

    pub(crate) fn validate(&self) -> Result<(), SupervisorError> {
        if self.workers == 0 {
            return Err(SupervisorError::InvalidConfig(
                "pool needs at least one worker".into(),
            ));
        }
        if self.ready_timeout.is_zero() {
            return Err(SupervisorError::InvalidConfig(
                "ready_timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `workers = 1`
    /// - `failure = 10 failures per 60s`
    /// - `ready_timeout = 10s`
    /// - `retry = 3 attempts, 250ms doubling, equal jitter`
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`, `command_capacity = 64`
    fn default() -> Self {
        Self {
            workers: 1,
            failure: FailurePolicy::default(),
            ready_timeout: Duration::from_secs(10),
            retry: RetryPolicy {
                jitter: Jitter::Equal,
                ..RetryPolicy::default()
            },
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
            command_capacity: 64,
            degraded_start: false,
            debug_base_port: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerCount;

    #[test]
    fn derived_from_server_file() {
        let mut server = ServerConfig {
            workers: WorkerCount::Fixed(4),
            debug: true,
            debug_port: 7000,
            ..ServerConfig::default()
        };
        server.supervision.max_failures = 2;
        server.supervision.grace_ms = 1500;

        let cfg = SupervisorConfig::from_server(&server);
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.failure.max_failures, 2);
        assert_eq!(cfg.grace, Duration::from_millis(1500));
        assert_eq!(cfg.debug_port(SlotId(3)), Some(7003));
    }

    #[test]
    fn no_debug_port_without_debug() {
        let cfg = SupervisorConfig::from_server(&ServerConfig::default());
        assert_eq!(cfg.debug_port(SlotId(0)), None);

        let edge = SupervisorConfig {
            debug_base_port: Some(u16::MAX),
            ..SupervisorConfig::default()
        };
        assert_eq!(edge.debug_port(SlotId(1)), None);
    }

    #[test]
    fn rejects_empty_pool() {
        let cfg = SupervisorConfig {
            workers: 0,
            ..SupervisorConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(SupervisorError::InvalidConfig(_))));
    }
}
