//! Managed-object state family
//!
//! One state type per collection family, all behind [`ManagedObjectState`]:
//! - [`SetObjectState`]: membership-only content
//! - [`MapObjectState`]: key to value content
//! - [`ListObjectState`]: positionally ordered content
//!
//! Every implementation applies mutation logs in strict arrival order,
//! dehydrates to a canonical full-content log, and confines its side effects
//! to its own store slice plus the supplied transaction context. The
//! discriminator persisted in [`StateMetadata`] selects the implementation
//! at reconstruction time.

mod list;
mod map;
mod set;

pub use list::ListObjectState;
pub use map::MapObjectState;
pub use set::SetObjectState;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use holon_core::{
    ClassId, LogicalValue, MutationLog, ObjectId, ObjectType, RecordKind, Result, StateError,
};
use holon_store::SliceFactory;

use crate::context::TransactionContext;
use crate::facade::ObjectFacade;

/// Server-side materialization of one shared object
///
/// The discriminator and class identifier are fixed at creation; only the
/// store slice's content changes. Callers must serialize `apply` and
/// `destroy` per identity (the registry does); reads may run concurrently
/// with each other but not with writes.
pub trait ManagedObjectState: Send {
    /// Collection family of this state.
    fn object_type(&self) -> ObjectType;

    /// Class identifier recorded at creation.
    fn class_id(&self) -> ClassId;

    /// Apply one ordered mutation log.
    ///
    /// Entries execute strictly in arrival order; reference-valued
    /// insertions notify the context's listener and record a back-reference
    /// before the store write. A failing entry leaves the slice in whatever
    /// state the preceding entries produced; nothing is buffered for
    /// rollback.
    ///
    /// # Errors
    /// Fatal protocol skew for unknown or out-of-vocabulary actions,
    /// malformed entries, or a physical record; recoverable store errors
    /// propagate unchanged.
    fn apply(
        &mut self,
        object_id: ObjectId,
        log: &MutationLog,
        ctx: &mut TransactionContext,
    ) -> Result<()>;

    /// Re-emit current content as a canonical full-content log.
    ///
    /// Applying the result to a freshly created state of the same type
    /// reproduces equal content. Iteration order is stable within one call
    /// and carries no other meaning. Does not mutate the store.
    ///
    /// # Errors
    /// Recoverable store errors propagate unchanged.
    fn dehydrate(&self, object_id: ObjectId) -> Result<MutationLog>;

    /// Add every object identity referenced by current content to `refs`.
    ///
    /// # Errors
    /// Recoverable store errors propagate unchanged.
    fn collect_references(&self, refs: &mut FxHashSet<ObjectId>) -> Result<()>;

    /// Bounded read-only snapshot of current content.
    ///
    /// Negative `limit` means unbounded; otherwise at most
    /// `min(limit, size)` elements. The true size is always carried.
    ///
    /// # Errors
    /// Recoverable store errors propagate unchanged.
    fn create_facade(
        &self,
        object_id: ObjectId,
        class_name: &str,
        limit: i64,
    ) -> Result<ObjectFacade>;

    /// Canonical content as sorted key/value pairs, for comparison.
    ///
    /// # Errors
    /// Recoverable store errors propagate unchanged.
    fn logical_content(&self) -> Result<Vec<(LogicalValue, LogicalValue)>>;

    /// Release the backing slice. At most once per instance.
    ///
    /// Distinct from the `Destroy` mutation entry, which only clears
    /// logical content: this tears down storage and is reachable only
    /// through the lifecycle path driven by the distributed GC.
    ///
    /// # Errors
    /// A second destroy is a fatal lifecycle error.
    fn destroy(&mut self) -> Result<()>;

    /// Logical equality: same family, same class, same content.
    ///
    /// After resynchronization, replicas must compare equal; a mismatch is
    /// a replication-correctness bug, not a normal condition.
    ///
    /// # Errors
    /// Recoverable store errors propagate unchanged.
    fn content_eq(&self, other: &dyn ManagedObjectState) -> Result<bool> {
        Ok(self.object_type() == other.object_type()
            && self.class_id() == other.class_id()
            && self.logical_content()? == other.logical_content()?)
    }

    /// Stable hash over family, class, and canonical content.
    ///
    /// Equal states (per [`content_eq`](Self::content_eq)) hash equally on
    /// every node, so replicas can compare digests instead of full content.
    ///
    /// # Errors
    /// Recoverable store errors propagate unchanged.
    fn content_hash(&self) -> Result<u64> {
        let canonical = (
            self.object_type().code(),
            self.class_id().raw(),
            self.logical_content()?,
        );
        let bytes = bincode::serialize(&canonical)?;
        Ok(xxh3_64(&bytes))
    }
}

/// Reject physical records on the logical apply path.
pub(crate) fn ensure_logical(log: &MutationLog) -> Result<()> {
    if log.kind() != RecordKind::Logical {
        return Err(StateError::skew(
            "physical record routed to a logical collection state",
        ));
    }
    Ok(())
}

/// Emit the collector events for a reference-valued insertion.
///
/// Order matters: the listener notification and back-reference record
/// precede the store write, so a store failure still leaves the collector
/// aware of the edge (duplicate emission on retry is tolerated by contract).
pub(crate) fn note_reference_insert(
    ctx: &mut TransactionContext,
    containing: ObjectId,
    value: &LogicalValue,
) {
    if let Some(referenced) = value.as_reference() {
        ctx.notify_changed(containing, None, referenced);
        ctx.add_back_reference(referenced, containing);
    }
}

/// Persisted identity record of one managed object
///
/// Written by the persistence layer next to the object's slice; read back
/// at reopen so the right state implementation can be reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMetadata {
    /// Collection family discriminator.
    pub object_type: ObjectType,
    /// Class identifier recorded at creation.
    pub class_id: ClassId,
    /// Identity scoping the store slice.
    pub object_id: ObjectId,
}

impl StateMetadata {
    /// Encode for persistence.
    ///
    /// # Errors
    /// Serialization failures surface as metadata errors.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a persisted record.
    ///
    /// # Errors
    /// Corrupt records surface as recoverable metadata errors.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Materialize a new, empty state for a freshly defined object.
///
/// # Errors
/// Store failures from slice creation propagate unchanged.
pub fn new_state(
    object_type: ObjectType,
    class_id: ClassId,
    object_id: ObjectId,
    factory: &dyn SliceFactory,
) -> Result<Box<dyn ManagedObjectState>> {
    Ok(match object_type {
        ObjectType::Set => Box::new(SetObjectState::create(class_id, object_id, factory)?),
        ObjectType::Map => Box::new(MapObjectState::create(class_id, object_id, factory)?),
        ObjectType::List => Box::new(ListObjectState::create(class_id, object_id, factory)?),
    })
}

/// Reconstruct a state from its persisted metadata, reopening its slice.
///
/// # Errors
/// Fatal lifecycle error if the slice was never created or was released;
/// store failures propagate unchanged.
pub fn reopen_state(
    metadata: &StateMetadata,
    factory: &dyn SliceFactory,
) -> Result<Box<dyn ManagedObjectState>> {
    Ok(match metadata.object_type {
        ObjectType::Set => Box::new(SetObjectState::reopen(
            metadata.class_id,
            metadata.object_id,
            factory,
        )?),
        ObjectType::Map => Box::new(MapObjectState::reopen(
            metadata.class_id,
            metadata.object_id,
            factory,
        )?),
        ObjectType::List => Box::new(ListObjectState::reopen(
            metadata.class_id,
            metadata.object_id,
            factory,
        )?),
    })
}
