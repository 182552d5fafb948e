// registry.rs — GoalRegistry: goals this client submitted and still awaits.
//
// An entry exists from send until a correlated result arrives. Cancellation
// does not remove entries; only result delivery (or dropping the client) does.

use std::collections::HashMap;

use gp_msgs::ActionGoal;

/// Outstanding goals keyed by goal identifier.
pub struct GoalRegistry<G> {
    goals: HashMap<String, ActionGoal<G>>,
}

impl<G> GoalRegistry<G> {
    pub fn new() -> Self {
        Self {
            goals: HashMap::new(),
        }
    }

    /// Track a goal. A goal with the same identifier is replaced.
    pub fn insert(&mut self, goal: ActionGoal<G>) -> Option<ActionGoal<G>> {
        self.goals.insert(goal.goal_id.id.clone(), goal)
    }

    pub fn contains(&self, goal_id: &str) -> bool {
        self.goals.contains_key(goal_id)
    }

    pub fn get(&self, goal_id: &str) -> Option<&ActionGoal<G>> {
        self.goals.get(goal_id)
    }

    /// Retire a goal, returning its record if it was outstanding.
    pub fn remove(&mut self, goal_id: &str) -> Option<ActionGoal<G>> {
        self.goals.remove(goal_id)
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    /// Identifiers of all outstanding goals, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.goals.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl<G> Default for GoalRegistry<G> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gp_msgs::{GoalId, Header};

    fn goal(id: &str, order: u32) -> ActionGoal<u32> {
        let now = Utc::now();
        ActionGoal {
            header: Header::new(0, now, "auto-generated"),
            goal_id: GoalId::new(id, now),
            goal: order,
        }
    }

    #[test]
    fn insert_contains_remove() {
        let mut registry = GoalRegistry::new();
        assert!(registry.is_empty());

        registry.insert(goal("Fib.00000001", 5));
        assert!(registry.contains("Fib.00000001"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Fib.00000001").unwrap().goal, 5);

        let removed = registry.remove("Fib.00000001").unwrap();
        assert_eq!(removed.goal, 5);
        assert!(!registry.contains("Fib.00000001"));
        assert!(registry.remove("Fib.00000001").is_none());
    }

    #[test]
    fn same_id_replaces_entry() {
        let mut registry = GoalRegistry::new();
        assert!(registry.insert(goal("dup", 1)).is_none());
        let previous = registry.insert(goal("dup", 2)).unwrap();
        assert_eq!(previous.goal, 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("dup").unwrap().goal, 2);
    }

    #[test]
    fn ids_are_sorted() {
        let mut registry = GoalRegistry::new();
        registry.insert(goal("b", 1));
        registry.insert(goal("a", 2));
        assert_eq!(registry.ids(), vec!["a".to_string(), "b".to_string()]);
    }
}
