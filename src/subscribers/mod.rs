//! # Event subscribers
//!
//! ```text
//! control loop ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                                    ├──► LogWriter
//!                                                                    └──► custom ...
//! ```
//!
//! - [`Subscribe`]: trait for custom handlers
//! - [`SubscriberSet`]: per-subscriber bounded queues with panic isolation
//! - [`LogWriter`]: built-in `tracing` logger

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
