use crate::change_log::ChangeLog;
use crate::op_meta::OpMeta;
use syncdoc_protocol::{Conflict, Key, ObjectId, Operation};

/// A multi-value register: the set of field ops for one `(obj, key)`
/// which occurred without knowledge of each other. The set is kept
/// sorted by actor id descending, so the first op is the winner and the
/// rest are the conflicts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Register {
    ops: Vec<OpMeta>,
}

impl Register {
    pub(crate) fn new() -> Register {
        Register { ops: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The winning op, if the register holds any value at all.
    pub fn winner(&self) -> Option<&OpMeta> {
        self.ops.first()
    }

    pub fn conflicts(&self) -> Vec<Conflict> {
        self.ops
            .split_first()
            .map(|(_, losers)| losers.iter().map(OpMeta::as_conflict).collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpMeta> {
        self.ops.iter()
    }

    /// The ops currently in the register, stripped of their metadata.
    /// These are exactly the ops that would restore the current value if
    /// reapplied, which is what the undo machinery records.
    pub fn inverse_ops(&self, obj: &ObjectId, key: &Key) -> Vec<Operation> {
        if self.ops.is_empty() {
            vec![Operation::delete(obj.clone(), key.clone())]
        } else {
            self.ops.iter().map(|op| op.operation.clone()).collect()
        }
    }

    /// Incorporate a new assignment op. Ops that causally precede the
    /// incoming one are overwritten and returned so the caller can
    /// unlink them; concurrent ops survive. A `del` adds nothing, so a
    /// register holding only overwritten ops becomes empty.
    pub(crate) fn incorporate(
        &mut self,
        new_op: &OpMeta,
        log: &ChangeLog,
    ) -> Vec<OpMeta> {
        let mut overwritten = Vec::new();
        let mut concurrent = Vec::new();
        for op in self.ops.drain(..) {
            if log.is_concurrent(&op, new_op) {
                concurrent.push(op);
            } else {
                overwritten.push(op);
            }
        }

        if !new_op.is_delete() {
            concurrent.push(new_op.clone());
        }
        concurrent.sort_by(|a, b| b.actor_id.cmp(&a.actor_id));
        self.ops = concurrent;

        overwritten
    }
}
