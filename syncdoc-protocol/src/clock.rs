use crate::ActorId;
use serde::{Deserialize, Serialize};
use std::cmp::max;
use std::collections::HashMap;

/// A vector clock mapping each actor to the highest sequence number seen
/// from it. A missing actor is implicitly at zero. Clocks are compared
/// component-wise, so two clocks may be concurrent (neither before the
/// other).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct Clock(HashMap<ActorId, u32>);

impl Clock {
    pub fn empty() -> Clock {
        Clock(HashMap::new())
    }

    pub fn get(&self, actor: &ActorId) -> u32 {
        self.0.get(actor).copied().unwrap_or(0)
    }

    /// Returns a new clock with `actor` raised to at least `seq`.
    pub fn with(&self, actor: &ActorId, seq: u32) -> Clock {
        let mut result = self.clone();
        result.set_max(actor, seq);
        result
    }

    /// Returns a new clock with any entry for `actor` removed.
    pub fn without(&self, actor: &ActorId) -> Clock {
        let mut result = self.clone();
        result.0.remove(actor);
        result
    }

    pub fn set_max(&mut self, actor: &ActorId, seq: u32) {
        let entry = self.0.entry(actor.clone()).or_insert(0);
        *entry = max(*entry, seq);
    }

    pub fn remove(&mut self, actor: &ActorId) {
        self.0.remove(actor);
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&ActorId, u32) -> bool,
    {
        self.0.retain(|actor, seq| keep(actor, *seq));
    }

    /// Pointwise maximum of `self` and `other`, in place.
    pub fn merge(&mut self, other: &Clock) {
        for (actor, seq) in &other.0 {
            self.set_max(actor, *seq);
        }
    }

    /// Pointwise maximum of `self` and `other`, as a new clock.
    pub fn upper_bound(&self, other: &Clock) -> Clock {
        let mut result = self.clone();
        result.merge(other);
        result
    }

    /// Component-wise `self <= other`.
    pub fn less_or_equal(&self, other: &Clock) -> bool {
        self.0.iter().all(|(actor, seq)| *seq <= other.get(actor))
    }

    pub fn divergent(&self, other: &Clock) -> bool {
        !self.less_or_equal(other)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ActorId, u32)> {
        self.0.iter().map(|(actor, seq)| (actor, *seq))
    }

    pub fn actors(&self) -> impl Iterator<Item = &ActorId> {
        self.0.keys()
    }
}

impl<'a> IntoIterator for &'a Clock {
    type Item = (&'a ActorId, &'a u32);
    type IntoIter = std::collections::hash_map::Iter<'a, ActorId, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
