//! Master/worker IPC protocol and environment contract.
//!
//! Messages are JSON objects tagged by `type`, one per line. Workers write
//! to stdout and read stdin; their logs go to stderr.

use serde::{Deserialize, Serialize};

/// JSON-encoded [`ServerConfig`](crate::ServerConfig).
pub const ENV_CONFIG: &str = "WORKVISOR_CONFIG";
/// Generation of the config snapshot.
pub const ENV_GENERATION: &str = "WORKVISOR_GENERATION";
/// Worker id assigned by the master.
pub const ENV_WORKER_ID: &str = "WORKVISOR_WORKER_ID";
/// Slot index.
pub const ENV_SLOT: &str = "WORKVISOR_SLOT";
/// Inherited listening socket (unix only).
pub const ENV_LISTEN_FD: &str = "WORKVISOR_LISTEN_FD";
/// Debug status port, set only when debugging is enabled.
pub const ENV_DEBUG_PORT: &str = "WORKVISOR_DEBUG_PORT";

/// Message from worker to master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    /// The server socket is bound and accepting.
    #[serde(rename = "ready")]
    Ready {
        /// Local address being served.
        addr: Option<String>,
    },
}

/// Message from master to worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MasterMessage {
    /// Stop accepting, finish in-flight work, exit 0.
    #[serde(rename = "disconnect")]
    Disconnect,
}

macro_rules! line_codec {
    ($ty:ty) => {
        impl $ty {
            /// Encodes as one newline-terminated JSON line.
            pub fn to_line(&self) -> serde_json::Result<String> {
                let mut s = serde_json::to_string(self)?;
                s.push('\n');
                Ok(s)
            }

            /// Decodes one JSON line (surrounding whitespace ignored).
            pub fn from_line(line: &str) -> serde_json::Result<Self> {
                serde_json::from_str(line.trim())
            }
        }
    };
}

line_codec!(WorkerMessage);
line_codec!(MasterMessage);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_is_tagged_json_lines() {
        let line = WorkerMessage::Ready {
            addr: Some("127.0.0.1:8080".into()),
        }
        .to_line()
        .unwrap();
        assert_eq!(line, "{\"type\":\"ready\",\"addr\":\"127.0.0.1:8080\"}\n");

        assert_eq!(
            MasterMessage::Disconnect.to_line().unwrap(),
            "{\"type\":\"disconnect\"}\n"
        );
    }

    #[test]
    fn parses_with_trailing_newline() {
        let msg = MasterMessage::from_line("{\"type\":\"disconnect\"}\r\n").unwrap();
        assert_eq!(msg, MasterMessage::Disconnect);
        assert!(WorkerMessage::from_line("{\"type\":\"bogus\"}").is_err());
    }
}
