//! Per-apply transaction context
//!
//! Carries the bookkeeping for exactly one log-apply call: the reference
//! collector's listener handle and the back-references gathered while the
//! log is applied. The delivery layer builds a fresh context per delivery
//! and hands the collected records to the garbage-collection subsystem
//! afterwards; the context has no existence beyond that call.
//!
//! Threading the context explicitly through `apply` keeps concurrent
//! transactions on different objects from sharing any mutable collector
//! state.

use std::sync::Arc;

use holon_core::ObjectId;

/// Edge from a referenced object back to the object referring to it
///
/// Emitted whenever a reference-valued parameter is added to a collection.
/// Not persisted here; the distributed GC owns these records once the apply
/// call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackReference {
    /// The object now being referenced.
    pub referenced: ObjectId,
    /// The collection object holding the reference.
    pub referrer: ObjectId,
}

/// Reference-change hook of the garbage-collection subsystem
///
/// Called once per reference-valued insertion, in entry order. Replaying a
/// log may emit duplicate edges; implementations must be idempotent to
/// duplicates.
pub trait ChangeListener: Send + Sync {
    /// A reference slot inside `containing` changed from `previous` (None
    /// for plain insertions) to `referenced`.
    fn changed(&self, containing: ObjectId, previous: Option<ObjectId>, referenced: ObjectId);
}

/// Listener that discards every event. For tests and standalone replay.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl ChangeListener for NoopListener {
    fn changed(&self, _containing: ObjectId, _previous: Option<ObjectId>, _referenced: ObjectId) {}
}

/// Bookkeeping for one log-apply call
pub struct TransactionContext {
    listener: Arc<dyn ChangeListener>,
    back_references: Vec<BackReference>,
}

impl TransactionContext {
    /// Fresh context wired to the collector's listener.
    pub fn new(listener: Arc<dyn ChangeListener>) -> Self {
        Self {
            listener,
            back_references: Vec::new(),
        }
    }

    /// Context with no listener, for replay paths that only need content.
    pub fn detached() -> Self {
        Self::new(Arc::new(NoopListener))
    }

    /// Forward a reference change to the collector's listener.
    pub fn notify_changed(
        &self,
        containing: ObjectId,
        previous: Option<ObjectId>,
        referenced: ObjectId,
    ) {
        self.listener.changed(containing, previous, referenced);
    }

    /// Record a back-reference edge (referenced ← referrer).
    pub fn add_back_reference(&mut self, referenced: ObjectId, referrer: ObjectId) {
        self.back_references.push(BackReference {
            referenced,
            referrer,
        });
    }

    /// Back-references collected so far, in emission order.
    pub fn back_references(&self) -> &[BackReference] {
        &self.back_references
    }

    /// Consume the collected back-references.
    pub fn take_back_references(&mut self) -> Vec<BackReference> {
        std::mem::take(&mut self.back_references)
    }
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("back_references", &self.back_references)
            .finish_non_exhaustive()
    }
}
