//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the supervisor control loop, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Supervisor::subscriber_listener()` (fans out to `SubscriberSet`),
//!   and anything holding a receiver from [`SupervisorHandle::subscribe`](crate::SupervisorHandle::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
