use crate::change_log::ChangeLog;
use crate::error::BackendError;
use crate::object_store::ObjectStore;
use crate::op_meta::OpMeta;
use crate::undo::UndoState;
use std::collections::HashSet;
use syncdoc_protocol::{
    ActorId, Change, ChangeRequest, Clock, Diff, ObjectId, Operation, Patch, PathElement,
    RequestType,
};
use tracing::debug;

/// The engine. A `Backend` is a persistent value: every mutating entry
/// point takes `&self` and returns a fresh state alongside the patch,
/// leaving the original untouched. Snapshots share structure, so
/// holding on to old states is cheap.
///
/// Whenever changes arrive we queue them, then repeatedly apply every
/// queued change whose dependencies are satisfied by the current clock.
/// Changes that are not yet causally ready stay queued until their
/// dependencies arrive; there is no timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct Backend {
    queue: Vec<Change>,
    object_store: ObjectStore,
    change_log: ChangeLog,
    clock: Clock,
    deps: Clock,
    undo: UndoState,
}

impl Default for Backend {
    fn default() -> Self {
        Self::init()
    }
}

impl Backend {
    pub fn init() -> Backend {
        Backend {
            queue: Vec::new(),
            object_store: ObjectStore::new(),
            change_log: ChangeLog::new(),
            clock: Clock::empty(),
            deps: Clock::empty(),
            undo: UndoState::new(),
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Apply changes received from other replicas, in any order. The
    /// returned patch contains the diffs of every change that became
    /// causally ready.
    pub fn apply_changes(&self, changes: Vec<Change>) -> Result<(Backend, Patch), BackendError> {
        let mut next = self.clone();
        let mut diffs = Vec::new();
        for change in changes {
            next.enqueue(change)?;
        }
        next.drain(&mut diffs)?;
        let patch = next.make_patch(diffs, None);
        Ok((next, patch))
    }

    /// Apply a change request submitted by this replica's own frontend.
    /// Change requests carry their ops; undo and redo requests draw
    /// them from the recorded stacks.
    pub fn apply_local_change(
        &self,
        request: ChangeRequest,
    ) -> Result<(Backend, Patch), BackendError> {
        let mut next = self.clone();

        if !request.actor.is_valid() {
            return Err(BackendError::InvalidRequest(
                "empty actor id".to_string(),
            ));
        }
        let expected_seq = next.clock.get(&request.actor) + 1;
        if request.seq != expected_seq {
            return Err(BackendError::InvalidRequest(format!(
                "expected seq {} from actor {}, got {}",
                expected_seq, request.actor, request.seq
            )));
        }

        let mut undo_local: Option<Vec<Operation>> = None;
        let operations = match request.request_type {
            RequestType::Change => {
                let ops = request.ops.clone().ok_or_else(|| {
                    BackendError::InvalidRequest("change request without ops".to_string())
                })?;
                if request.undoable {
                    undo_local = Some(Vec::new());
                }
                ops
            }
            RequestType::Undo => next.start_undo()?,
            RequestType::Redo => next.start_redo()?,
        };

        let change = Change {
            actor_id: request.actor.clone(),
            seq: request.seq,
            deps: request.deps.clone(),
            message: request.message.clone(),
            operations,
        };

        let mut diffs = Vec::new();
        next.apply_change(change, undo_local.as_mut(), &mut diffs)?;
        if let Some(inverse_ops) = undo_local {
            next.undo.push_undo(inverse_ops);
        }
        // queued remote changes may have been waiting on this one
        next.drain(&mut diffs)?;

        let patch = next.make_patch(diffs, Some((request.actor, request.seq)));
        Ok((next, patch))
    }

    /// Materialize the whole document as a patch, for a frontend
    /// starting from scratch.
    pub fn get_patch(&self) -> Patch {
        let diffs = self.object_store.generate_diffs();
        self.make_patch(diffs, None)
    }

    /// Every change `new` has applied that `old` has not. Fails when
    /// `old` has changes `new` lacks, since history must be a prefix.
    pub fn get_changes<'a>(
        old: &Backend,
        new: &'a Backend,
    ) -> Result<Vec<&'a Change>, BackendError> {
        if old.clock.divergent(&new.clock) {
            return Err(BackendError::DivergedClocks);
        }
        Ok(new.change_log.missing_changes(&old.clock))
    }

    pub fn get_changes_for_actor(&self, actor_id: &ActorId) -> Vec<&Change> {
        self.change_log.changes_for_actor(actor_id, 0)
    }

    /// Every applied change with a seq beyond `have_clock`, ordered by
    /// actor then seq.
    pub fn get_missing_changes(&self, have_clock: &Clock) -> Vec<&Change> {
        self.change_log.missing_changes(have_clock)
    }

    /// The maximum unseen `(actor, seq)` per actor among the
    /// dependencies of still-queued changes.
    pub fn get_missing_deps(&self) -> Clock {
        let mut missing = Clock::empty();
        for change in &self.queue {
            let deps = change
                .deps
                .with(&change.actor_id, change.seq.saturating_sub(1));
            for (actor, seq) in &deps {
                if self.clock.get(actor) < *seq {
                    missing.set_max(actor, *seq);
                }
            }
        }
        missing
    }

    /// Apply everything `remote` has that this replica lacks.
    pub fn merge(&self, remote: &Backend) -> Result<(Backend, Patch), BackendError> {
        let changes = remote
            .get_missing_changes(&self.clock)
            .into_iter()
            .cloned()
            .collect();
        self.apply_changes(changes)
    }

    /// One root path to `object_id`, or `None` if it is unreachable.
    pub fn get_path(&self, object_id: &ObjectId) -> Option<Vec<PathElement>> {
        self.object_store.path_to_object(object_id)
    }

    fn enqueue(&mut self, change: Change) -> Result<(), BackendError> {
        if !change.actor_id.is_valid() {
            return Err(BackendError::InvalidRequest("empty actor id".to_string()));
        }
        if change.seq == 0 {
            return Err(BackendError::InvalidRequest(
                "sequence numbers start at 1".to_string(),
            ));
        }
        self.queue.push(change);
        Ok(())
    }

    /// Repeatedly apply every queued change that is causally ready. A
    /// full pass that applies nothing terminates the loop.
    fn drain(&mut self, diffs: &mut Vec<Diff>) -> Result<(), BackendError> {
        while let Some(change) = self.pop_next_causally_ready_change() {
            self.apply_change(change, None, diffs)?;
        }
        if !self.queue.is_empty() {
            debug!(pending = self.queue.len(), "changes awaiting dependencies");
        }
        Ok(())
    }

    fn pop_next_causally_ready_change(&mut self) -> Option<Change> {
        let mut index = 0;
        while index < self.queue.len() {
            let change = &self.queue[index];
            let deps = change
                .deps
                .with(&change.actor_id, change.seq.saturating_sub(1));
            if deps.less_or_equal(&self.clock) {
                return Some(self.queue.remove(index));
            }
            index += 1;
        }
        None
    }

    fn apply_change(
        &mut self,
        change: Change,
        mut undo_local: Option<&mut Vec<Operation>>,
        diffs: &mut Vec<Diff>,
    ) -> Result<(), BackendError> {
        let actor_id = change.actor_id.clone();
        let seq = change.seq;
        let operations = change.operations.clone();

        let is_new = self.change_log.add_change(change)?;
        if !is_new {
            // applying the same change twice is a no-op
            return Ok(());
        }
        debug!(actor = %actor_id, seq, ops = operations.len(), "applying change");

        // objects created by this very change; assignments to them are
        // not captured for undo
        let mut fresh_objects: HashSet<ObjectId> = HashSet::new();

        for operation in operations {
            let op = OpMeta::new(actor_id.clone(), seq, operation);
            if op.operation.is_make() {
                fresh_objects.insert(op.obj().clone());
                diffs.push(self.object_store.apply_make(&op)?);
            } else if op.operation.is_insert() {
                self.object_store.apply_insert(&op)?;
            } else {
                let (diff, inverse_ops) = self.object_store.apply_assign(&op, &self.change_log)?;
                if let Some(buffer) = undo_local.as_mut() {
                    if !fresh_objects.contains(op.obj()) {
                        buffer.splice(0..0, inverse_ops);
                    }
                }
                if let Some(diff) = diff {
                    diffs.push(diff);
                }
            }
        }

        self.clock.set_max(&actor_id, seq);
        self.update_deps(&actor_id, seq);
        Ok(())
    }

    /// Maintain the dependency frontier: drop every head the new change
    /// transitively covers, then add the change itself.
    fn update_deps(&mut self, actor_id: &ActorId, seq: u32) {
        let all_deps = self.change_log.all_deps(actor_id, seq).clone();
        self.deps.retain(|actor, head_seq| all_deps.get(actor) < head_seq);
        self.deps.set_max(actor_id, seq);
    }

    fn start_undo(&mut self) -> Result<Vec<Operation>, BackendError> {
        if !self.undo.can_undo() {
            return Err(BackendError::EmptyUndo);
        }
        let undo_ops = self.undo.undo_stack[self.undo.undo_pos - 1].clone();

        // synthesize the redo entry from what the targets hold right now
        let mut redo_ops = Vec::new();
        for op in &undo_ops {
            if let Some(key) = op.key() {
                redo_ops.extend(self.object_store.inverse_ops(op.obj(), key));
            }
        }
        self.undo.undo_pos -= 1;
        self.undo.redo_stack.push(redo_ops);
        Ok(undo_ops)
    }

    fn start_redo(&mut self) -> Result<Vec<Operation>, BackendError> {
        let redo_ops = self.undo.redo_stack.pop().ok_or(BackendError::EmptyRedo)?;
        self.undo.undo_pos += 1;
        Ok(redo_ops)
    }

    fn make_patch(&self, diffs: Vec<Diff>, actor_seq: Option<(ActorId, u32)>) -> Patch {
        Patch {
            actor: actor_seq.clone().map(|(actor, _)| actor),
            seq: actor_seq.map(|(_, seq)| seq),
            clock: self.clock.clone(),
            deps: self.deps.clone(),
            can_undo: self.undo.can_undo(),
            can_redo: self.undo.can_redo(),
            diffs,
        }
    }
}
