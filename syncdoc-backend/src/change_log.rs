use crate::error::BackendError;
use crate::op_meta::OpMeta;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::rc::Rc;
use syncdoc_protocol::{ActorId, Change, Clock};

// ChangeLog manages
//    `change_by_actor` - a seq ordered vec of changes per actor
//    `deps_by_actor` - a seq ordered vec of transitive dep clocks per actor
//    `history` - every change received, in arrival order
// It answers whether two ops are concurrent and serves the selectors
// that ship history to other replicas.

#[derive(Debug, PartialEq, Clone)]
pub struct ChangeLog {
    history: Vec<Rc<Change>>,
    change_by_actor: FxHashMap<ActorId, Vec<Rc<Change>>>,
    deps_by_actor: FxHashMap<ActorId, Vec<Clock>>,
    // lets us hand out a reference to an empty clock on the default
    // path without allocating
    empty_clock: Clock,
}

impl ChangeLog {
    pub(crate) fn new() -> ChangeLog {
        ChangeLog {
            history: Vec::new(),
            change_by_actor: FxHashMap::default(),
            deps_by_actor: FxHashMap::default(),
            empty_clock: Clock::empty(),
        }
    }

    /// Two ops are concurrent iff neither one's change observed the
    /// other's, judged against the transitive dependency clocks captured
    /// when each change was applied.
    pub fn is_concurrent(&self, op1: &OpMeta, op2: &OpMeta) -> bool {
        if op1.actor_id == op2.actor_id && op1.seq == op2.seq {
            return false;
        }
        let clock1 = self.all_deps(&op1.actor_id, op1.seq);
        let clock2 = self.all_deps(&op2.actor_id, op2.seq);
        clock1.get(&op2.actor_id) < op2.seq && clock2.get(&op1.actor_id) < op1.seq
    }

    pub fn get_change(&self, actor_id: &ActorId, seq: u32) -> Option<&Rc<Change>> {
        if seq == 0 {
            return None;
        }
        self.change_by_actor
            .get(actor_id)
            .and_then(|changes| changes.get((seq as usize) - 1))
    }

    /// The transitive dependency clock of `(actor, seq)`, including the
    /// change's own entry.
    pub fn all_deps(&self, actor_id: &ActorId, seq: u32) -> &Clock {
        self.all_deps_option(actor_id, seq)
            .unwrap_or(&self.empty_clock)
    }

    fn all_deps_option(&self, actor_id: &ActorId, seq: u32) -> Option<&Clock> {
        if seq == 0 {
            return None;
        }
        self.deps_by_actor
            .get(actor_id)
            .and_then(|deps| deps.get((seq as usize) - 1))
    }

    fn transitive_deps(&self, clock: &Clock) -> Clock {
        let mut all_deps = clock.clone();
        for (actor_id, seq) in clock {
            if let Some(deps) = self.all_deps_option(actor_id, *seq) {
                all_deps.merge(deps);
            }
        }
        all_deps
    }

    // if the change is new - insert and return Ok(true)
    // if the change is a duplicate - don't insert and return Ok(false)
    // if the change reuses an (actor, seq) with different content - error
    pub(crate) fn add_change(&mut self, change: Change) -> Result<bool, BackendError> {
        if change.seq == 0 {
            return Err(BackendError::InvalidRequest(
                "sequence numbers start at 1".to_string(),
            ));
        }
        if let Some(existing) = self.get_change(&change.actor_id, change.seq) {
            if existing.as_ref() == &change {
                return Ok(false);
            }
            return Err(BackendError::InconsistentReuse {
                actor: change.actor_id,
                seq: change.seq,
            });
        }

        let deps = change.deps.with(&change.actor_id, change.seq - 1);
        let all_deps = self.transitive_deps(&deps);
        let actor_id = change.actor_id.clone();

        let actor_changes = self.change_by_actor.entry(actor_id.clone()).or_default();
        if (change.seq as usize) - 1 != actor_changes.len() {
            return Err(BackendError::InvalidRequest(format!(
                "Out of order change {}:{} (have {} changes for this actor)",
                actor_id,
                change.seq,
                actor_changes.len()
            )));
        }

        let change = Rc::new(change);
        self.history.push(change.clone());
        actor_changes.push(change);
        self.deps_by_actor
            .entry(actor_id)
            .or_default()
            .push(all_deps);
        Ok(true)
    }

    pub fn changes_for_actor(&self, actor_id: &ActorId, after_seq: u32) -> Vec<&Change> {
        self.change_by_actor
            .get(actor_id)
            .map(|changes| {
                changes
                    .iter()
                    .skip(after_seq as usize)
                    .map(|change| change.as_ref())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every stored change with a sequence number beyond `have_clock`,
    /// ordered by actor then seq.
    pub fn missing_changes(&self, have_clock: &Clock) -> Vec<&Change> {
        self.change_by_actor
            .keys()
            .sorted()
            .flat_map(|actor_id| self.changes_for_actor(actor_id, have_clock.get(actor_id)))
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncdoc_protocol::{ObjectId, Operation};

    fn change(actor: &str, seq: u32, deps: Clock) -> Change {
        Change {
            actor_id: actor.into(),
            seq,
            deps,
            message: None,
            operations: vec![Operation::set(
                ObjectId::Root,
                "x".into(),
                (seq as i64).into(),
            )],
        }
    }

    #[test]
    fn duplicate_change_is_not_reinserted() {
        let mut log = ChangeLog::new();
        let c1 = change("a", 1, Clock::empty());
        assert_eq!(log.add_change(c1.clone()), Ok(true));
        assert_eq!(log.add_change(c1), Ok(false));
        assert_eq!(log.history_len(), 1);
    }

    #[test]
    fn reusing_a_seq_with_different_content_fails() {
        let mut log = ChangeLog::new();
        log.add_change(change("a", 1, Clock::empty())).unwrap();
        let mut other = change("a", 1, Clock::empty());
        other.message = Some("different".to_string());
        assert_eq!(
            log.add_change(other),
            Err(BackendError::InconsistentReuse {
                actor: "a".into(),
                seq: 1
            })
        );
    }

    #[test]
    fn all_deps_are_transitive() {
        let mut log = ChangeLog::new();
        log.add_change(change("a", 1, Clock::empty())).unwrap();
        log.add_change(change("b", 1, Clock::empty().with(&"a".into(), 1)))
            .unwrap();
        log.add_change(change("c", 1, Clock::empty().with(&"b".into(), 1)))
            .unwrap();
        let deps = log.all_deps(&"c".into(), 1);
        assert_eq!(deps.get(&"a".into()), 1);
        assert_eq!(deps.get(&"b".into()), 1);
    }

    #[test]
    fn concurrency_is_judged_by_all_deps() {
        let mut log = ChangeLog::new();
        log.add_change(change("a", 1, Clock::empty())).unwrap();
        log.add_change(change("b", 1, Clock::empty())).unwrap();
        log.add_change(change("a", 2, Clock::empty().with(&"b".into(), 1)))
            .unwrap();

        let op = |actor: &str, seq| OpMeta::new(actor.into(), seq, Operation::set(
            ObjectId::Root,
            "x".into(),
            1.into(),
        ));
        assert!(log.is_concurrent(&op("a", 1), &op("b", 1)));
        assert!(!log.is_concurrent(&op("a", 2), &op("b", 1)));
        assert!(!log.is_concurrent(&op("a", 1), &op("a", 2)));
    }

    #[test]
    fn missing_changes_are_ordered_by_actor_then_seq() {
        let mut log = ChangeLog::new();
        log.add_change(change("b", 1, Clock::empty())).unwrap();
        log.add_change(change("a", 1, Clock::empty())).unwrap();
        log.add_change(change("a", 2, Clock::empty())).unwrap();

        let missing = log.missing_changes(&Clock::empty());
        let ids: Vec<(String, u32)> = missing
            .iter()
            .map(|c| (c.actor_id.to_string(), c.seq))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("a".to_string(), 1),
                ("a".to_string(), 2),
                ("b".to_string(), 1)
            ]
        );

        let have = Clock::empty().with(&"a".into(), 1);
        let missing = log.missing_changes(&have);
        assert_eq!(missing.len(), 2);
    }
}
