use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::ServerConfig;

/// Global generation counter; every new snapshot gets the next value.
static GENERATION: AtomicU64 = AtomicU64::new(1);

/// Immutable, cheaply cloneable config captured at one point in time.
///
/// Workers keep the snapshot they were spawned with. Comparing generations
/// tells whether a worker already runs a given config.
#[derive(Clone)]
pub struct ConfigSnapshot {
    inner: Arc<Inner>,
}

struct Inner {
    generation: u64,
    config: ServerConfig,
}

impl ConfigSnapshot {
    /// Captures `config` under a fresh generation number.
    pub fn new(config: ServerConfig) -> Self {
        let generation = GENERATION.fetch_add(1, Ordering::Relaxed);
        Self::with_generation(generation, config)
    }

    /// Rebuilds a snapshot received from the master.
    pub(crate) fn with_generation(generation: u64, config: ServerConfig) -> Self {
        Self {
            inner: Arc::new(Inner { generation, config }),
        }
    }

    /// Generation number of this snapshot.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    /// The captured config.
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// JSON encoding of the config for the worker environment.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.inner.config)
    }
}

impl fmt::Debug for ConfigSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSnapshot")
            .field("generation", &self.inner.generation)
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_increase() {
        let a = ConfigSnapshot::new(ServerConfig::default());
        let b = ConfigSnapshot::new(ServerConfig::default());
        assert!(b.generation() > a.generation());
    }

    #[test]
    fn clones_share_generation() {
        let a = ConfigSnapshot::new(ServerConfig::default());
        let b = a.clone();
        assert_eq!(a.generation(), b.generation());
        assert_eq!(a.config(), b.config());
    }
}
