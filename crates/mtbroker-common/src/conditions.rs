//! Condition aggregation
//!
//! A [`ConditionSet`] names a "happy" condition (usually `Ready`) and the
//! dependent conditions it summarizes. Every change to a dependent recomputes
//! the happy condition with a deterministic AND-reduction:
//!
//! - any dependent `False` makes it `False`, carrying that dependent's reason
//!   and message (the first one in declaration order wins);
//! - otherwise any dependent `Unknown` makes it `Unknown`, same rule;
//! - otherwise it is `True`.
//!
//! Writing a condition whose status, reason and message are unchanged keeps
//! the existing `lastTransitionTime`, so reconciling a converged object
//! produces an identical status.

use crate::crd::{Condition, ConditionStatus};

/// Condition type used as the happy condition of every managed resource
pub const CONDITION_READY: &str = "Ready";

/// A happy condition and the dependents that roll up into it
#[derive(Clone, Copy, Debug)]
pub struct ConditionSet {
    happy: &'static str,
    dependents: &'static [&'static str],
}

impl ConditionSet {
    /// Create a set whose happy condition is `Ready`
    pub const fn living(dependents: &'static [&'static str]) -> Self {
        Self {
            happy: CONDITION_READY,
            dependents,
        }
    }

    /// The happy condition type
    pub fn happy(&self) -> &'static str {
        self.happy
    }

    /// The dependent condition types, in declaration order
    pub fn dependents(&self) -> &'static [&'static str] {
        self.dependents
    }

    /// Borrow a condition list for mutation under this set's rules
    pub fn manage<'a>(&'a self, conditions: &'a mut Vec<Condition>) -> ConditionManager<'a> {
        ConditionManager {
            set: self,
            conditions,
        }
    }
}

/// Mutable view over a condition list governed by a [`ConditionSet`]
pub struct ConditionManager<'a> {
    set: &'a ConditionSet,
    conditions: &'a mut Vec<Condition>,
}

impl ConditionManager<'_> {
    /// Add any missing conditions
    ///
    /// A missing happy condition starts `Unknown`. Missing dependents start
    /// `True` when the happy condition is already `True` (a ready resource
    /// implies its dependents were satisfied), `Unknown` otherwise.
    pub fn initialize(&mut self) {
        let happy_status = match self.get(self.set.happy) {
            Some(happy) => happy.status,
            None => {
                self.conditions.push(Condition::new(
                    self.set.happy,
                    ConditionStatus::Unknown,
                    "",
                    "",
                ));
                ConditionStatus::Unknown
            }
        };

        let initial = if happy_status == ConditionStatus::True {
            ConditionStatus::True
        } else {
            ConditionStatus::Unknown
        };

        for dependent in self.set.dependents {
            if self.get(dependent).is_none() {
                self.conditions
                    .push(Condition::new(*dependent, initial, "", ""));
            }
        }
    }

    /// Look up a condition by type
    pub fn get(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    /// Whether the happy condition is `True`
    pub fn is_happy(&self) -> bool {
        self.get(self.set.happy).is_some_and(Condition::is_true)
    }

    /// Mark a condition `True` with no reason
    pub fn mark_true(&mut self, type_: &str) {
        self.set_condition(type_, ConditionStatus::True, "", "");
    }

    /// Mark a condition `True` while recording why
    pub fn mark_true_with_reason(&mut self, type_: &str, reason: &str, message: &str) {
        self.set_condition(type_, ConditionStatus::True, reason, message);
    }

    /// Mark a condition `False`
    pub fn mark_false(&mut self, type_: &str, reason: &str, message: &str) {
        self.set_condition(type_, ConditionStatus::False, reason, message);
    }

    /// Mark a condition `Unknown`
    pub fn mark_unknown(&mut self, type_: &str, reason: &str, message: &str) {
        self.set_condition(type_, ConditionStatus::Unknown, reason, message);
    }

    fn set_condition(&mut self, type_: &str, status: ConditionStatus, reason: &str, message: &str) {
        self.put(Condition::new(type_, status, reason, message));
        if type_ != self.set.happy {
            self.recompute_happy();
        }
    }

    fn put(&mut self, condition: Condition) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.type_ == condition.type_)
        {
            Some(existing) if existing.same_state(&condition) => {}
            Some(existing) => *existing = condition,
            None => self.conditions.push(condition),
        }
    }

    fn recompute_happy(&mut self) {
        let dependents: Vec<&Condition> = self
            .set
            .dependents
            .iter()
            .filter_map(|t| self.get(t))
            .collect();

        let blocking = dependents
            .iter()
            .find(|c| c.status == ConditionStatus::False)
            .or_else(|| {
                dependents
                    .iter()
                    .find(|c| c.status == ConditionStatus::Unknown)
            });

        let happy = match blocking {
            Some(c) => Condition::new(self.set.happy, c.status, &c.reason, &c.message),
            None if dependents.len() < self.set.dependents.len() => {
                Condition::new(self.set.happy, ConditionStatus::Unknown, "", "")
            }
            None => Condition::new(self.set.happy, ConditionStatus::True, "", ""),
        };
        self.put(happy);
    }
}
