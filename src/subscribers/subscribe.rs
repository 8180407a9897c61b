//! # Subscriber trait
//!
//! `Subscribe` is the extension point for reacting to supervisor events
//! (logging, alerting, metrics). Each subscriber is driven by its own worker
//! task fed by a bounded queue owned by the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow; they never block the control loop nor
//!   other subscribers.
//! - On queue overflow the event is dropped for that subscriber only and a
//!   `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use workvisor::{Event, EventKind, Subscribe};
//!
//! struct AbortAlert;
//!
//! #[async_trait]
//! impl Subscribe for AbortAlert {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::SlotAborted {
//!             // page someone
//!         }
//!     }
//!     fn name(&self) -> &'static str { "abort-alert" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
