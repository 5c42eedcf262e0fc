use std::collections::{BTreeSet, HashMap, HashSet};

use crate::scheduler::constraint::{Constraint, Event};

/// A snapshot of the work left in one pass: every pending event with the
/// number of predecessors it still waits on.
#[derive(Debug, Default)]
pub(crate) struct Plan {
    waiting_on: HashMap<Event, usize>,
    successors: HashMap<Event, Vec<Event>>,
    ready: BTreeSet<Event>,
}

impl Plan {
    /// Build a plan from the live events and constraints, leaving out
    /// anything already executed and every edge touching it.
    pub(crate) fn build(
        events: impl IntoIterator<Item = Event>,
        constraints: impl IntoIterator<Item = Constraint>,
        executed: &HashSet<Event>,
    ) -> Self {
        let mut plan = Plan::default();
        for event in events {
            if !executed.contains(&event) {
                plan.waiting_on.insert(event, 0);
            }
        }

        let mut seen = HashSet::new();
        for constraint in constraints {
            if !plan.waiting_on.contains_key(&constraint.before)
                || !plan.waiting_on.contains_key(&constraint.after)
                || !seen.insert(constraint)
            {
                continue;
            }
            if let Some(count) = plan.waiting_on.get_mut(&constraint.after) {
                *count += 1;
            }
            plan.successors
                .entry(constraint.before)
                .or_default()
                .push(constraint.after);
        }

        plan.ready = plan
            .waiting_on
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(event, _)| *event)
            .collect();
        plan
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.waiting_on.is_empty()
    }

    pub(crate) fn pending(&self) -> usize {
        self.waiting_on.len()
    }

    /// The smallest event with nothing left to wait on.
    pub(crate) fn next_ready(&mut self) -> Option<Event> {
        let event = self.ready.pop_first()?;
        self.waiting_on.remove(&event);
        Some(event)
    }

    /// Record that `event` ran, releasing whatever waited only on it.
    pub(crate) fn complete(&mut self, event: Event) {
        for next in self.successors.remove(&event).unwrap_or_default() {
            if let Some(count) = self.waiting_on.get_mut(&next) {
                *count -= 1;
                if *count == 0 {
                    self.ready.insert(next);
                }
            }
        }
    }
}
