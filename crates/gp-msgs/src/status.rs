// status.rs — Goal status codes and the status broadcast record.
//
// The server periodically publishes one GoalStatusArray describing every goal
// it is tracking, for every client. The client relays these as-is; the codes
// are carried verbatim and never drive client-side state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::header::{GoalId, Header};

/// Status of a single goal as reported by the server.
///
/// Serialized as its numeric wire value (`{"status": 3}`), not by name.
/// Codes this library does not recognise decode as `Unknown` and are carried
/// through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum GoalStatusCode {
    /// Accepted by the server, not yet processed.
    Pending,
    /// Being processed.
    Active,
    /// Cancelled after it started executing.
    Preempted,
    /// Completed successfully.
    Succeeded,
    /// Aborted by the server during execution.
    Aborted,
    /// Rejected without being processed.
    Rejected,
    /// Cancel requested while active, not yet confirmed.
    Preempting,
    /// Cancel requested while pending, not yet confirmed.
    Recalling,
    /// Cancelled before it started executing.
    Recalled,
    /// The client lost track of the goal.
    Lost,
    /// A code outside 0-9, as sent by the server.
    Unknown(u8),
}

impl GoalStatusCode {
    /// Whether the server will publish no further updates for this goal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GoalStatusCode::Preempted
                | GoalStatusCode::Succeeded
                | GoalStatusCode::Aborted
                | GoalStatusCode::Rejected
                | GoalStatusCode::Recalled
                | GoalStatusCode::Lost
        )
    }
}

impl From<GoalStatusCode> for u8 {
    fn from(code: GoalStatusCode) -> u8 {
        match code {
            GoalStatusCode::Pending => 0,
            GoalStatusCode::Active => 1,
            GoalStatusCode::Preempted => 2,
            GoalStatusCode::Succeeded => 3,
            GoalStatusCode::Aborted => 4,
            GoalStatusCode::Rejected => 5,
            GoalStatusCode::Preempting => 6,
            GoalStatusCode::Recalling => 7,
            GoalStatusCode::Recalled => 8,
            GoalStatusCode::Lost => 9,
            GoalStatusCode::Unknown(code) => code,
        }
    }
}

impl From<u8> for GoalStatusCode {
    fn from(value: u8) -> Self {
        match value {
            0 => GoalStatusCode::Pending,
            1 => GoalStatusCode::Active,
            2 => GoalStatusCode::Preempted,
            3 => GoalStatusCode::Succeeded,
            4 => GoalStatusCode::Aborted,
            5 => GoalStatusCode::Rejected,
            6 => GoalStatusCode::Preempting,
            7 => GoalStatusCode::Recalling,
            8 => GoalStatusCode::Recalled,
            9 => GoalStatusCode::Lost,
            other => GoalStatusCode::Unknown(other),
        }
    }
}

impl fmt::Display for GoalStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GoalStatusCode::Pending => "pending",
            GoalStatusCode::Active => "active",
            GoalStatusCode::Preempted => "preempted",
            GoalStatusCode::Succeeded => "succeeded",
            GoalStatusCode::Aborted => "aborted",
            GoalStatusCode::Rejected => "rejected",
            GoalStatusCode::Preempting => "preempting",
            GoalStatusCode::Recalling => "recalling",
            GoalStatusCode::Recalled => "recalled",
            GoalStatusCode::Lost => "lost",
            GoalStatusCode::Unknown(code) => return write!(f, "unknown({})", code),
        };
        write!(f, "{}", name)
    }
}

/// Server-side status of one goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStatus {
    pub goal_id: GoalId,
    pub status: GoalStatusCode,

    /// Free-form explanation supplied by the server.
    #[serde(default)]
    pub text: String,
}

/// Broadcast snapshot of all goals known to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStatusArray {
    pub header: Header,

    #[serde(default)]
    pub status_list: Vec<GoalStatus>,
}

impl GoalStatusArray {
    /// Look up the entry for a goal identifier, if the server reported one.
    pub fn find(&self, goal_id: &str) -> Option<&GoalStatus> {
        self.status_list.iter().find(|s| s.goal_id.id == goal_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn status_code_serializes_as_number() {
        let status = GoalStatus {
            goal_id: GoalId::new("Fibonacci.00ff00ff", Utc::now()),
            status: GoalStatusCode::Succeeded,
            text: String::new(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], 3);
    }

    #[test]
    fn unknown_status_code_is_carried_through() {
        assert_eq!(GoalStatusCode::from(10), GoalStatusCode::Unknown(10));
        assert_eq!(GoalStatusCode::from(4), GoalStatusCode::Aborted);

        let json = r#"{"goal_id":{"stamp":"2024-05-01T12:00:00Z","id":"x"},"status":42}"#;
        let status: GoalStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.status, GoalStatusCode::Unknown(42));
        assert!(!status.status.is_terminal());
        assert_eq!(status.status.to_string(), "unknown(42)");
        assert_eq!(serde_json::to_value(&status).unwrap()["status"], 42);
    }

    #[test]
    fn terminal_codes() {
        assert!(GoalStatusCode::Succeeded.is_terminal());
        assert!(GoalStatusCode::Recalled.is_terminal());
        assert!(!GoalStatusCode::Active.is_terminal());
        assert!(!GoalStatusCode::Preempting.is_terminal());
    }

    #[test]
    fn find_locates_goal_in_array() {
        let now = Utc::now();
        let array = GoalStatusArray {
            header: Header::new(7, now, ""),
            status_list: vec![
                GoalStatus {
                    goal_id: GoalId::new("a", now),
                    status: GoalStatusCode::Active,
                    text: String::new(),
                },
                GoalStatus {
                    goal_id: GoalId::new("b", now),
                    status: GoalStatusCode::Pending,
                    text: "queued".into(),
                },
            ],
        };
        assert_eq!(array.find("b").unwrap().text, "queued");
        assert!(array.find("c").is_none());
    }

    #[test]
    fn display_names() {
        assert_eq!(GoalStatusCode::Preempting.to_string(), "preempting");
        assert_eq!(format!("{}", GoalStatusCode::Lost), "lost");
    }
}
