//! Resident-object registry and lifecycle surface
//!
//! The transaction-delivery layer talks to the engine through this type:
//! it resolves object identities to resident state instances, gates
//! mutations on the externally supplied cluster role, serializes applies
//! per identity, and drives the create/reopen/destroy lifecycle against
//! the injected slice factory.
//!
//! Applies on different identities run concurrently; applies on the same
//! identity are serialized by a per-entry mutex, which is the whole of the
//! locking this engine does. Reads take the same mutex, so they exclude
//! concurrent applies without requiring snapshot isolation from the store.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use holon_core::{
    ClassId, ClusterRole, MutationLog, ObjectId, ObjectType, Result, StateError,
};
use holon_store::SliceFactory;

use crate::context::{BackReference, ChangeListener, TransactionContext};
use crate::facade::ObjectFacade;
use crate::state::{new_state, reopen_state, ManagedObjectState, StateMetadata};

/// Supplier of the node's current cluster role
///
/// The cluster state machine owns transitions; the registry only reads.
pub trait RoleSource: Send + Sync {
    /// Role at this moment.
    fn current(&self) -> ClusterRole;
}

/// Role source pinned to one role. For tests and single-node deployments.
#[derive(Debug, Clone, Copy)]
pub struct FixedRole(
    /// The role every call to `current` reports.
    pub ClusterRole,
);

impl RoleSource for FixedRole {
    fn current(&self) -> ClusterRole {
        self.0
    }
}

/// Registry of managed-object states resident on this node
pub struct ObjectRegistry {
    factory: Arc<dyn SliceFactory>,
    listener: Arc<dyn ChangeListener>,
    role: Arc<dyn RoleSource>,
    resident: DashMap<ObjectId, Mutex<Box<dyn ManagedObjectState>>>,
}

impl ObjectRegistry {
    /// Registry over the given store factory, collector listener, and role
    /// source.
    pub fn new(
        factory: Arc<dyn SliceFactory>,
        listener: Arc<dyn ChangeListener>,
        role: Arc<dyn RoleSource>,
    ) -> Self {
        Self {
            factory,
            listener,
            role,
            resident: DashMap::new(),
        }
    }

    /// Materialize a brand-new object defined by a client transaction.
    ///
    /// # Errors
    /// Creating an identity that is already resident is a fatal lifecycle
    /// error; store failures propagate unchanged.
    pub fn create(
        &self,
        object_id: ObjectId,
        object_type: ObjectType,
        class_id: ClassId,
    ) -> Result<()> {
        match self.resident.entry(object_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StateError::lifecycle(format!(
                "create of already resident object {object_id}"
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let state = new_state(object_type, class_id, object_id, self.factory.as_ref())?;
                slot.insert(Mutex::new(state));
                info!(
                    target: "holon::lifecycle",
                    object_id = %object_id,
                    object_type = %object_type,
                    "object created"
                );
                Ok(())
            }
        }
    }

    /// Reconstruct a persisted object from its metadata record.
    ///
    /// Idempotent per identity: reopening a resident object is a no-op.
    ///
    /// # Errors
    /// Fatal lifecycle error if the underlying slice no longer exists;
    /// store failures propagate unchanged.
    pub fn reopen(&self, metadata: &StateMetadata) -> Result<()> {
        match self.resident.entry(metadata.object_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(()),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let state = reopen_state(metadata, self.factory.as_ref())?;
                slot.insert(Mutex::new(state));
                info!(
                    target: "holon::lifecycle",
                    object_id = %metadata.object_id,
                    object_type = %metadata.object_type,
                    "object reopened"
                );
                Ok(())
            }
        }
    }

    /// Apply one mutation log to one resident object.
    ///
    /// Checks the role gate, serializes against other applies and reads on
    /// the same identity, and runs the log through a fresh transaction
    /// context. Returns the back-references collected during the apply for
    /// the caller to hand to the garbage-collection subsystem.
    ///
    /// # Errors
    /// Role rejection and store failures are recoverable; protocol skew and
    /// applying to a non-resident identity are fatal.
    pub fn apply(&self, object_id: ObjectId, log: &MutationLog) -> Result<Vec<BackReference>> {
        let role = self.role.current();
        if !role.allows_mutation() {
            warn!(
                target: "holon::apply",
                object_id = %object_id,
                role = %role,
                "mutation rejected by role gate"
            );
            return Err(StateError::MutationRejected { role });
        }

        let entry = self.resident.get(&object_id).ok_or_else(|| {
            StateError::lifecycle(format!("apply to non-resident object {object_id}"))
        })?;

        let mut ctx = TransactionContext::new(self.listener.clone());
        let mut state = entry.lock();
        debug!(
            target: "holon::apply",
            object_id = %object_id,
            entries = log.len(),
            "applying mutation log"
        );
        state.apply(object_id, log, &mut ctx)?;
        Ok(ctx.take_back_references())
    }

    /// Re-emit a resident object's content as a canonical mutation log.
    ///
    /// # Errors
    /// Fatal lifecycle error for a non-resident identity; store failures
    /// propagate unchanged.
    pub fn dehydrate(&self, object_id: ObjectId) -> Result<MutationLog> {
        let entry = self.resident.get(&object_id).ok_or_else(|| {
            StateError::lifecycle(format!("dehydrate of non-resident object {object_id}"))
        })?;
        let state = entry.lock();
        state.dehydrate(object_id)
    }

    /// Bounded monitoring snapshot of a resident object.
    ///
    /// # Errors
    /// Fatal lifecycle error for a non-resident identity; store failures
    /// propagate unchanged.
    pub fn create_facade(
        &self,
        object_id: ObjectId,
        class_name: &str,
        limit: i64,
    ) -> Result<ObjectFacade> {
        let entry = self.resident.get(&object_id).ok_or_else(|| {
            StateError::lifecycle(format!("facade of non-resident object {object_id}"))
        })?;
        let state = entry.lock();
        state.create_facade(object_id, class_name, limit)
    }

    /// Stable content digest of a resident object, for replica comparison.
    ///
    /// # Errors
    /// Fatal lifecycle error for a non-resident identity; store failures
    /// propagate unchanged.
    pub fn content_hash(&self, object_id: ObjectId) -> Result<u64> {
        let entry = self.resident.get(&object_id).ok_or_else(|| {
            StateError::lifecycle(format!("content hash of non-resident object {object_id}"))
        })?;
        let state = entry.lock();
        state.content_hash()
    }

    /// Persistable metadata record of a resident object.
    ///
    /// # Errors
    /// Fatal lifecycle error for a non-resident identity.
    pub fn metadata(&self, object_id: ObjectId) -> Result<StateMetadata> {
        let entry = self.resident.get(&object_id).ok_or_else(|| {
            StateError::lifecycle(format!("metadata of non-resident object {object_id}"))
        })?;
        let state = entry.lock();
        Ok(StateMetadata {
            object_type: state.object_type(),
            class_id: state.class_id(),
            object_id,
        })
    }

    /// Tear down an object the distributed GC proved unreachable.
    ///
    /// Removes residency and releases the backing slice. The GC layer must
    /// fence this against concurrent applies and reads on the same
    /// identity.
    ///
    /// # Errors
    /// Destroying a non-resident identity is a fatal lifecycle error, as is
    /// a slice that was already released.
    pub fn destroy(&self, object_id: ObjectId) -> Result<()> {
        let (_, cell) = self.resident.remove(&object_id).ok_or_else(|| {
            StateError::lifecycle(format!("destroy of non-resident object {object_id}"))
        })?;
        let mut state = cell.into_inner();
        state.destroy()?;
        info!(target: "holon::lifecycle", object_id = %object_id, "object destroyed");
        Ok(())
    }

    /// Whether an identity is currently resident.
    pub fn contains(&self, object_id: ObjectId) -> bool {
        self.resident.contains_key(&object_id)
    }

    /// Number of resident objects. Monitoring only.
    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }
}
