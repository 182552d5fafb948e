// action.rs — Per-goal envelopes and the ActionSpec binding.
//
// An action is defined by three payload types: what the client asks for
// (Goal), what the server streams while working (Feedback), and what it
// reports when done (Result). The envelopes here wrap those payloads with the
// correlation data the protocol needs.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::header::{GoalId, Header};
use crate::status::GoalStatus;

/// Binds the payload types of one action.
///
/// Implement this on a marker type per action, e.g. `struct Fibonacci;`.
pub trait ActionSpec: Send + Sync + 'static {
    type Goal: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static;
    type Feedback: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static;
    type Result: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static;
}

/// An action whose payloads are untyped JSON.
///
/// Useful when the action type is only known at runtime.
#[derive(Debug, Clone, Copy)]
pub struct DynamicAction;

impl ActionSpec for DynamicAction {
    type Goal = serde_json::Value;
    type Feedback = serde_json::Value;
    type Result = serde_json::Value;
}

/// Anything that refers to a single goal by identifier.
pub trait Correlated {
    /// Identifier of the goal this record concerns.
    fn correlation_id(&self) -> &str;
}

/// A goal as submitted by the caller, before stamping.
///
/// Missing `goal_id` and `header` are synthesized at send time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalRequest<G> {
    #[serde(default)]
    pub header: Option<Header>,

    #[serde(default)]
    pub goal_id: Option<GoalId>,

    pub goal: G,
}

impl<G> GoalRequest<G> {
    pub fn new(goal: G) -> Self {
        Self {
            header: None,
            goal_id: None,
            goal,
        }
    }

    /// Use a caller-chosen identifier instead of a generated one.
    pub fn with_goal_id(mut self, goal_id: GoalId) -> Self {
        self.goal_id = Some(goal_id);
        self
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.header = Some(header);
        self
    }
}

/// A fully stamped goal, as published on the goal channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionGoal<G> {
    pub header: Header,
    pub goal_id: GoalId,
    pub goal: G,
}

impl<G> Correlated for ActionGoal<G> {
    fn correlation_id(&self) -> &str {
        &self.goal_id.id
    }
}

/// Incremental progress for one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionFeedback<F> {
    pub header: Header,
    pub status: GoalStatus,
    pub feedback: F,
}

impl<F> Correlated for ActionFeedback<F> {
    fn correlation_id(&self) -> &str {
        &self.status.goal_id.id
    }
}

/// Terminal outcome for one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult<R> {
    pub header: Header,
    pub status: GoalStatus,
    pub result: R,
}

impl<R> Correlated for ActionResult<R> {
    fn correlation_id(&self) -> &str {
        &self.status.goal_id.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::GoalStatusCode;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn request_builder_sets_optional_fields() {
        let now = Utc::now();
        let req = GoalRequest::new(json!({"order": 5}))
            .with_goal_id(GoalId::new("custom", now))
            .with_header(Header::new(3, now, "map"));
        assert_eq!(req.goal_id.unwrap().id, "custom");
        assert_eq!(req.header.unwrap().frame_id, "map");
    }

    #[test]
    fn request_without_stamps_parses() {
        let req: GoalRequest<serde_json::Value> =
            serde_json::from_str(r#"{"goal":{"order":5}}"#).unwrap();
        assert!(req.goal_id.is_none());
        assert!(req.header.is_none());
        assert_eq!(req.goal["order"], 5);
    }

    #[test]
    fn feedback_and_result_correlate_through_status() {
        let now = Utc::now();
        let status = GoalStatus {
            goal_id: GoalId::new("Fibonacci.1234abcd", now),
            status: GoalStatusCode::Active,
            text: String::new(),
        };
        let feedback = ActionFeedback {
            header: Header::new(0, now, ""),
            status: status.clone(),
            feedback: json!({"sequence": [0, 1, 1]}),
        };
        let result = ActionResult {
            header: Header::new(1, now, ""),
            status,
            result: json!({"sequence": [0, 1, 1, 2]}),
        };
        assert_eq!(feedback.correlation_id(), "Fibonacci.1234abcd");
        assert_eq!(result.correlation_id(), "Fibonacci.1234abcd");
    }
}
