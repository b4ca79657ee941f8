use crate::cache::DocumentCache;
use crate::error::FrontendError;
use crate::mutation::{filter_ops, MutableDocument, MutationTracker, Path};
use crate::value::Value;
use syncdoc_backend::Backend;
use syncdoc_protocol::{
    ActorId, Change, ChangeRequest, Clock, Conflict, Diff, DiffAction, ObjectId, Patch,
    RequestType,
};

/// One not-yet-acknowledged local change: its sequence number and the
/// diffs that were applied optimistically, kept so they can be replayed
/// over a new authoritative base.
#[derive(Debug, Clone)]
struct PendingRequest {
    seq: u32,
    diffs: Vec<Diff>,
}

/// A replica's working document.
///
/// Why the split between `reconciled` and `optimistic`? Local edits
/// should be visible immediately, but the backend is the authority on
/// how they interleave with concurrent remote changes. So every local
/// change is applied twice: once optimistically to a cheap cache copy,
/// and once for real when the backend's patch comes back. The pending
/// request queue bridges the two: patches are matched against it by
/// `(actor, seq)`, and whatever is still unacknowledged is replayed on
/// top of each new authoritative base.
///
/// A document can also be wired directly to an in-process [`Backend`].
/// In that mode every change round-trips synchronously and there is
/// never a pending request.
pub struct Document {
    actor_id: ActorId,
    seq: u32,
    deps: Clock,
    can_undo: bool,
    can_redo: bool,
    reconciled: DocumentCache,
    optimistic: DocumentCache,
    requests: Vec<PendingRequest>,
    backend: Option<Backend>,
}

impl Document {
    pub fn new(actor_id: ActorId) -> Document {
        Document {
            actor_id,
            seq: 0,
            deps: Clock::empty(),
            can_undo: false,
            can_redo: false,
            reconciled: DocumentCache::new(),
            optimistic: DocumentCache::new(),
            requests: Vec::new(),
            backend: None,
        }
    }

    /// A document with its own in-process backend: changes are applied
    /// authoritatively and synchronously.
    pub fn with_backend(actor_id: ActorId) -> Document {
        let mut document = Document::new(actor_id);
        document.backend = Some(Backend::init());
        document
    }

    pub fn load(actor_id: ActorId, patch: Patch) -> Result<Document, FrontendError> {
        let mut document = Document::new(actor_id);
        document.apply_patch(patch)?;
        Ok(document)
    }

    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn deps(&self) -> &Clock {
        &self.deps
    }

    pub fn can_undo(&self) -> bool {
        self.can_undo
    }

    pub fn can_redo(&self) -> bool {
        self.can_redo
    }

    /// The materialized document, with optimistic local changes.
    pub fn value(&self) -> Value {
        self.optimistic.value()
    }

    pub fn value_at(&self, path: &Path) -> Option<Value> {
        if path.elements().is_empty() {
            return Some(self.value());
        }
        if let Some(object) = self.optimistic.object_at(path.elements()) {
            return Some(object.value());
        }
        self.optimistic
            .slot_at(path.elements())
            .map(|slot| slot.value.value())
    }

    /// The losing concurrent writes at a path, if any.
    pub fn conflicts_at(&self, path: &Path) -> Option<Vec<Conflict>> {
        self.optimistic
            .slot_at(path.elements())
            .map(|slot| slot.conflicts.clone())
    }

    pub fn get_object_id(&self, path: &Path) -> Option<ObjectId> {
        self.optimistic
            .object_at(path.elements())
            .map(|object| object.object_id().clone())
    }

    /// The sequence numbers of changes submitted but not yet
    /// acknowledged by a patch.
    pub fn in_flight_requests(&self) -> Vec<u32> {
        self.requests.iter().map(|request| request.seq).collect()
    }

    pub fn backend(&self) -> Option<&Backend> {
        self.backend.as_ref()
    }

    /// Run a mutation session. The closure edits the document through
    /// a [`MutableDocument`]; if it made any changes, the resulting
    /// change request is returned for the embedder to broadcast.
    pub fn change<F>(
        &mut self,
        message: Option<String>,
        closure: F,
    ) -> Result<Option<ChangeRequest>, FrontendError>
    where
        F: FnOnce(&mut dyn MutableDocument) -> Result<(), FrontendError>,
    {
        let mut tracker = MutationTracker::new(self.optimistic.clone(), self.actor_id.clone());
        closure(&mut tracker)?;
        let (ops, diffs, updated_cache) = tracker.finish();
        if ops.is_empty() {
            return Ok(None);
        }

        let request = ChangeRequest {
            actor: self.actor_id.clone(),
            seq: self.seq + 1,
            deps: self.deps.without(&self.actor_id),
            message,
            undoable: true,
            ops: Some(filter_ops(ops)),
            request_type: RequestType::Change,
        };
        let request = self.submit(request, diffs, Some(updated_cache))?;
        Ok(Some(request))
    }

    /// Ask the backend to revert the most recent undoable local change.
    pub fn undo(&mut self, message: Option<String>) -> Result<ChangeRequest, FrontendError> {
        if !self.can_undo {
            return Err(FrontendError::NothingToUndo);
        }
        let request = ChangeRequest {
            actor: self.actor_id.clone(),
            seq: self.seq + 1,
            deps: self.deps.without(&self.actor_id),
            message,
            undoable: true,
            ops: None,
            request_type: RequestType::Undo,
        };
        self.can_undo = false;
        self.can_redo = true;
        self.submit(request, Vec::new(), None)
    }

    pub fn redo(&mut self, message: Option<String>) -> Result<ChangeRequest, FrontendError> {
        if !self.can_redo {
            return Err(FrontendError::NothingToRedo);
        }
        let request = ChangeRequest {
            actor: self.actor_id.clone(),
            seq: self.seq + 1,
            deps: self.deps.without(&self.actor_id),
            message,
            undoable: true,
            ops: None,
            request_type: RequestType::Redo,
        };
        self.can_redo = false;
        self.can_undo = true;
        self.submit(request, Vec::new(), None)
    }

    fn submit(
        &mut self,
        request: ChangeRequest,
        diffs: Vec<Diff>,
        updated_cache: Option<DocumentCache>,
    ) -> Result<ChangeRequest, FrontendError> {
        self.seq += 1;
        if let Some(backend) = self.backend.take() {
            match backend.apply_local_change(request.clone()) {
                Ok((backend, patch)) => {
                    self.backend = Some(backend);
                    self.requests.clear();
                    self.apply_patch(patch)?;
                }
                Err(error) => {
                    self.backend = Some(backend);
                    self.seq -= 1;
                    return Err(error.into());
                }
            }
        } else {
            self.requests.push(PendingRequest {
                seq: request.seq,
                diffs,
            });
            if let Some(cache) = updated_cache {
                self.optimistic = cache;
                self.can_undo = true;
                self.can_redo = false;
            }
        }
        Ok(request)
    }

    /// Feed remote changes through the wired backend and apply the
    /// resulting patch. Only available on documents built with
    /// [`Document::with_backend`].
    pub fn apply_changes(&mut self, changes: Vec<Change>) -> Result<(), FrontendError> {
        let backend = self.backend.take().ok_or_else(|| {
            FrontendError::InvalidChangeRequest(
                "apply_changes needs a wired backend; use apply_patch instead".to_string(),
            )
        })?;
        match backend.apply_changes(changes) {
            Ok((backend, patch)) => {
                self.backend = Some(backend);
                self.apply_patch(patch)
            }
            Err(error) => {
                self.backend = Some(backend);
                Err(error.into())
            }
        }
    }

    /// Apply a patch from the backend. If it acknowledges the head
    /// pending request, that request is dropped and the remaining ones
    /// are replayed over the new base after being transformed past the
    /// incoming diffs. Any other patch just triggers a replay.
    pub fn apply_patch(&mut self, patch: Patch) -> Result<(), FrontendError> {
        let mut acknowledged_head = false;
        if let (Some(actor), Some(seq)) = (&patch.actor, patch.seq) {
            if actor == &self.actor_id {
                if let Some(head) = self.requests.first() {
                    if head.seq != seq {
                        return Err(FrontendError::MismatchedSequenceNumber {
                            expected: head.seq,
                            actual: seq,
                        });
                    }
                    self.requests.remove(0);
                    acknowledged_head = true;
                }
            }
        }

        self.reconciled.apply_diffs(&patch.diffs)?;

        let mut optimistic = self.reconciled.clone();
        for request in &mut self.requests {
            if acknowledged_head {
                transform_past(&mut request.diffs, &patch.diffs, &self.actor_id);
            }
            optimistic.replay_diffs(&request.diffs);
        }
        self.optimistic = optimistic;

        self.deps = patch.deps.clone();
        self.can_undo = patch.can_undo;
        self.can_redo = patch.can_redo;
        let acknowledged_seq = patch.clock.get(&self.actor_id);
        if acknowledged_seq > self.seq {
            self.seq = acknowledged_seq;
        }
        Ok(())
    }
}

/// Shift the list indices of recorded optimistic diffs past the
/// inserts and removes of an incoming patch.
///
/// The transform is transient and deliberately approximate: the
/// authoritative placement always comes from the backend's own patch
/// for the request. Concurrent inserts at the same index are not
/// reordered by element id, and assignments are not checked for
/// conflicts here.
fn transform_past(pending: &mut [Diff], applied: &[Diff], own_actor: &ActorId) {
    for diff in pending.iter_mut() {
        if !diff.obj_type.is_sequence() {
            continue;
        }
        let index = match diff.index {
            Some(index) => index,
            None => continue,
        };
        let mut shifted = i64::from(index);
        for remote in applied {
            if remote.object_id != diff.object_id {
                continue;
            }
            // edits by this document's own actor were already counted
            // when the pending diffs were recorded
            let own_echo = remote
                .elem_id
                .as_ref()
                .and_then(|elem_id| elem_id.actor())
                .map_or(false, |actor| actor == own_actor);
            if own_echo {
                continue;
            }
            match (remote.action, remote.index) {
                (DiffAction::Insert, Some(remote_index)) if i64::from(remote_index) <= shifted => {
                    shifted += 1;
                }
                (DiffAction::Remove, Some(remote_index)) if i64::from(remote_index) < shifted => {
                    shifted -= 1;
                }
                _ => {}
            }
        }
        diff.index = Some(shifted.max(0) as u32);
    }
}
