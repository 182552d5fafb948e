//! # gp-msgs
//!
//! Message records exchanged by an action client and an action server.
//!
//! The transport owns wire encoding; these types only fix the shape of each
//! record so the client can stamp, correlate and relay them without reaching
//! into untyped maps.
//!
//! ## Key types
//!
//! - [`GoalId`] — identifier/timestamp pair that correlates all traffic for a goal
//! - [`Header`] — sequence number, timestamp and frame identifier
//! - [`GoalStatusArray`] — broadcast snapshot of every goal the server knows about
//! - [`ActionGoal`], [`ActionFeedback`], [`ActionResult`] — per-goal envelopes
//! - [`ActionSpec`] — binds the three payload types of one action

pub mod action;
pub mod header;
pub mod status;

pub use action::{
    ActionFeedback, ActionGoal, ActionResult, ActionSpec, Correlated, DynamicAction, GoalRequest,
};
pub use header::{GoalId, Header};
pub use status::{GoalStatus, GoalStatusArray, GoalStatusCode};
