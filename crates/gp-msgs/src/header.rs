// header.rs — Header and GoalId records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Per-publisher sequence number.
    pub seq: u64,

    /// When the message was produced.
    pub stamp: DateTime<Utc>,

    /// Coordinate frame the message refers to.
    pub frame_id: String,
}

impl Header {
    pub fn new(seq: u64, stamp: DateTime<Utc>, frame_id: impl Into<String>) -> Self {
        Self {
            seq,
            stamp,
            frame_id: frame_id.into(),
        }
    }
}

/// Identifier/timestamp pair for a goal.
///
/// On the cancel channel an empty `id` targets every goal the server is
/// tracking rather than a single one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalId {
    pub stamp: DateTime<Utc>,

    #[serde(default)]
    pub id: String,
}

impl GoalId {
    pub fn new(id: impl Into<String>, stamp: DateTime<Utc>) -> Self {
        Self {
            stamp,
            id: id.into(),
        }
    }

    /// A cancel-all record: stamped, with no target identifier.
    pub fn all(stamp: DateTime<Utc>) -> Self {
        Self {
            stamp,
            id: String::new(),
        }
    }

    /// True when this record does not name a specific goal.
    pub fn is_all(&self) -> bool {
        self.id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_all_has_empty_id() {
        let now = Utc::now();
        let all = GoalId::all(now);
        assert!(all.is_all());
        assert_eq!(all.stamp, now);
        assert!(!GoalId::new("Fibonacci.0a1b2c3d", now).is_all());
    }

    #[test]
    fn goal_id_missing_id_field_defaults_to_all() {
        let json = r#"{"stamp":"2024-05-01T12:00:00Z"}"#;
        let parsed: GoalId = serde_json::from_str(json).unwrap();
        assert!(parsed.is_all());
    }
}
