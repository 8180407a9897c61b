//! Server configuration and immutable snapshots of it.
//!
//! - [`ServerConfig`]: the JSON file format, with defaults for every field.
//! - [`ConfigSnapshot`]: a generation-stamped, shareable copy handed to workers.

mod server;
mod snapshot;

pub use server::{ServerConfig, SupervisionConfig, WorkerCount};
pub use snapshot::ConfigSnapshot;
