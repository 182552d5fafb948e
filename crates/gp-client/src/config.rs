// config.rs — Action client configuration.
//
// A ClientConfig names the action server and action type, and carries the
// per-channel QoS profiles plus a few client knobs. It can be built in code
// with `ClientConfig::new()` or loaded from a TOML file:
//
//   server_name = "/fibonacci"
//   action_type = "actionlib_tutorials/Fibonacci"
//
//   [goal_qos]
//   queue_size = 20
//   latched = true

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::transport::QosProfile;

/// Configuration for one action client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base name of the action server; channel topics hang off it.
    pub server_name: String,

    /// Action type name. Prefixes generated goal ids and message type names.
    pub action_type: String,

    /// Frame id written into synthesized goal headers.
    #[serde(default = "default_frame_id")]
    pub frame_id: String,

    /// Capacity of the broadcast channel behind `ActionClient::subscribe`.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Poll interval for `ActionClient::wait_for_server`.
    #[serde(default = "default_connect_poll_interval_ms")]
    pub connect_poll_interval_ms: u64,

    #[serde(default = "QosProfile::publisher_default")]
    pub goal_qos: QosProfile,

    #[serde(default = "QosProfile::publisher_default")]
    pub cancel_qos: QosProfile,

    #[serde(default = "QosProfile::subscriber_default")]
    pub status_qos: QosProfile,

    #[serde(default = "QosProfile::subscriber_default")]
    pub feedback_qos: QosProfile,

    #[serde(default = "QosProfile::subscriber_default")]
    pub result_qos: QosProfile,
}

fn default_frame_id() -> String {
    "auto-generated".to_string()
}

fn default_event_capacity() -> usize {
    64
}

fn default_connect_poll_interval_ms() -> u64 {
    100
}

impl ClientConfig {
    /// Config with default QoS for the given server and action type.
    pub fn new(server_name: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            action_type: action_type.into(),
            frame_id: default_frame_id(),
            event_capacity: default_event_capacity(),
            connect_poll_interval_ms: default_connect_poll_interval_ms(),
            goal_qos: QosProfile::publisher_default(),
            cancel_qos: QosProfile::publisher_default(),
            status_qos: QosProfile::subscriber_default(),
            feedback_qos: QosProfile::subscriber_default(),
            result_qos: QosProfile::subscriber_default(),
        }
    }

    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ClientError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ClientError::Config { reason, .. } => ClientError::Config {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse a config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ClientError> {
        toml::from_str(content).map_err(|e| ClientError::Config {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })
    }

    /// Message type name for goals, e.g. `FibonacciGoal`.
    pub fn goal_type(&self) -> String {
        format!("{}Goal", self.action_type)
    }

    pub fn feedback_type(&self) -> String {
        format!("{}Feedback", self.action_type)
    }

    pub fn result_type(&self) -> String {
        format!("{}Result", self.action_type)
    }
}

impl fmt::Display for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "server={}, type={}, frame_id={}",
            self.server_name, self.action_type, self.frame_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn new_uses_protocol_defaults() {
        let config = ClientConfig::new("/fibonacci", "Fibonacci");
        assert_eq!(config.frame_id, "auto-generated");
        assert_eq!(config.goal_qos, QosProfile::publisher_default());
        assert_eq!(config.cancel_qos, QosProfile::publisher_default());
        assert_eq!(config.status_qos, QosProfile::subscriber_default());
        assert_eq!(config.feedback_qos, QosProfile::subscriber_default());
        assert_eq!(config.result_qos, QosProfile::subscriber_default());
    }

    #[test]
    fn message_type_names() {
        let config = ClientConfig::new("/fibonacci", "actionlib_tutorials/Fibonacci");
        assert_eq!(config.goal_type(), "actionlib_tutorials/FibonacciGoal");
        assert_eq!(config.feedback_type(), "actionlib_tutorials/FibonacciFeedback");
        assert_eq!(config.result_type(), "actionlib_tutorials/FibonacciResult");
    }

    #[test]
    fn minimal_toml_fills_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
server_name = "/move_base"
action_type = "MoveBase"
"#,
        )
        .unwrap();
        assert_eq!(config.server_name, "/move_base");
        assert_eq!(config.event_capacity, 64);
        assert_eq!(config.connect_poll_interval_ms, 100);
        assert!(config.goal_qos.latched);
        assert_eq!(config.result_qos.queue_size, 1);
    }

    #[test]
    fn toml_overrides_qos() {
        let config = ClientConfig::from_toml_str(
            r#"
server_name = "/fibonacci"
action_type = "Fibonacci"
frame_id = "base_link"

[goal_qos]
queue_size = 20
latched = false
"#,
        )
        .unwrap();
        assert_eq!(config.frame_id, "base_link");
        assert_eq!(config.goal_qos.queue_size, 20);
        assert!(!config.goal_qos.latched);
        assert_eq!(config.cancel_qos, QosProfile::publisher_default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client.toml");
        fs::write(
            &path,
            "server_name = \"/fibonacci\"\naction_type = \"Fibonacci\"\n",
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.action_type, "Fibonacci");
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = ClientConfig::load(&path).unwrap_err();
        match err {
            ClientError::Config { path: p, .. } => assert!(p.ends_with("missing.toml")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn invalid_toml_reports_file_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "server_name = \n").unwrap();
        let err = ClientConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
