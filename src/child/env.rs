use std::fmt::Display;
use std::str::FromStr;

use crate::config::{ConfigSnapshot, ServerConfig};
use crate::error::WorkerError;
use crate::workers::protocol::{
    ENV_CONFIG, ENV_DEBUG_PORT, ENV_GENERATION, ENV_LISTEN_FD, ENV_SLOT, ENV_WORKER_ID,
};
use crate::workers::{SlotId, WorkerId};

/// Everything the master passes to a worker through its environment.
#[derive(Debug, Clone)]
pub struct WorkerEnv {
    pub worker: WorkerId,
    pub slot: SlotId,
    pub snapshot: ConfigSnapshot,
    /// Inherited listening socket, if the master shares one.
    pub listen_fd: Option<i32>,
    /// Port of the debug status listener, if debugging is on.
    pub debug_port: Option<u16>,
}

impl WorkerEnv {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, WorkerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, WorkerError> {
        let raw = get(ENV_CONFIG).ok_or(WorkerError::Env {
            var: ENV_CONFIG,
            reason: "not set".into(),
        })?;
        let config = ServerConfig::from_json(&raw)?;

        Ok(Self {
            worker: WorkerId(required(&get, ENV_WORKER_ID)?),
            slot: SlotId(required(&get, ENV_SLOT)?),
            snapshot: ConfigSnapshot::with_generation(required(&get, ENV_GENERATION)?, config),
            listen_fd: optional(&get, ENV_LISTEN_FD)?,
            debug_port: optional(&get, ENV_DEBUG_PORT)?,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        self.snapshot.config()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.generation()
    }
}

fn required<T>(get: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<T, WorkerError>
where
    T: FromStr,
    T::Err: Display,
{
    optional(get, var)?.ok_or(WorkerError::Env {
        var,
        reason: "not set".into(),
    })
}

fn optional<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, WorkerError>
where
    T: FromStr,
    T::Err: Display,
{
    get(var)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| WorkerError::Env {
                var,
                reason: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn decodes_master_environment() {
        let env = WorkerEnv::from_lookup(lookup(&[
            (ENV_CONFIG, r#"{"root":"/srv/www","port":9000}"#),
            (ENV_GENERATION, "7"),
            (ENV_WORKER_ID, "12"),
            (ENV_SLOT, "3"),
            (ENV_LISTEN_FD, "5"),
        ]))
        .unwrap();

        assert_eq!(env.worker, WorkerId(12));
        assert_eq!(env.slot, SlotId(3));
        assert_eq!(env.generation(), 7);
        assert_eq!(env.config().port, 9000);
        assert_eq!(env.listen_fd, Some(5));
        assert_eq!(env.debug_port, None);
    }

    #[test]
    fn missing_or_malformed_values_name_the_variable() {
        let err = WorkerEnv::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, WorkerError::Env { var: ENV_CONFIG, .. }));

        let err = WorkerEnv::from_lookup(lookup(&[
            (ENV_CONFIG, "{}"),
            (ENV_GENERATION, "1"),
            (ENV_WORKER_ID, "one"),
            (ENV_SLOT, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, WorkerError::Env { var: ENV_WORKER_ID, .. }));

        let err = WorkerEnv::from_lookup(lookup(&[(ENV_CONFIG, "not json")])).unwrap_err();
        assert_eq!(err.as_label(), "worker_config");
    }
}
