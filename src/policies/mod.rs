//! Failure and retry policies.
//!
//! ## Contents
//! - [`FailurePolicy`] / [`FailureWindow`]: respawn or abort a crashed slot
//! - [`RetryPolicy`] / [`Jitter`]: attempts and delays for reload steps
//!
//! ## Quick wiring
//! ```text
//! worker crash ─► Slot.failures.record_failure(now) ─► Respawn | Abort
//! ticker       ─► Slot.failures.tick(now)            (periodic reset)
//! reload step timeout ─► RetryPolicy::allows_retry / delay(attempt)
//! ```

mod failure;
mod retry;

pub use failure::{Decision, FailurePolicy, FailureWindow};
pub use retry::{Jitter, RetryPolicy};
