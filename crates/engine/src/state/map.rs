//! Map-like managed object state
//!
//! Key to value content. Both sides of an entry may reference other shared
//! objects; each reference emits its own collector event, key before value.

use rustc_hash::FxHashSet;

use holon_core::{
    ActionCode, ClassId, LogicalValue, MutationEntry, MutationLog, ObjectId, ObjectType, Result,
    StateError,
};
use holon_store::{SliceFactory, StoreSlice};

use crate::context::TransactionContext;
use crate::facade::ObjectFacade;
use crate::state::{ensure_logical, note_reference_insert, ManagedObjectState};

/// Managed state for map-like collections
pub struct MapObjectState {
    class_id: ClassId,
    object_id: ObjectId,
    entries: Box<dyn StoreSlice>,
}

impl MapObjectState {
    /// New empty map state over a fresh slice.
    ///
    /// # Errors
    /// Store failures from slice creation propagate unchanged.
    pub fn create(
        class_id: ClassId,
        object_id: ObjectId,
        factory: &dyn SliceFactory,
    ) -> Result<Self> {
        Ok(Self {
            class_id,
            object_id,
            entries: factory.create_slice(object_id)?,
        })
    }

    /// Recover a persisted map state by reopening its slice.
    ///
    /// # Errors
    /// Fatal lifecycle error if the slice does not exist; store failures
    /// propagate unchanged.
    pub fn reopen(
        class_id: ClassId,
        object_id: ObjectId,
        factory: &dyn SliceFactory,
    ) -> Result<Self> {
        Ok(Self {
            class_id,
            object_id,
            entries: factory.open_slice(object_id)?,
        })
    }

    fn apply_entry(
        &mut self,
        object_id: ObjectId,
        entry: &MutationEntry,
        ctx: &mut TransactionContext,
    ) -> Result<()> {
        match entry.code() {
            ActionCode::Put => {
                let key = entry.param(0)?;
                let value = entry.param(1)?;
                note_reference_insert(ctx, object_id, key);
                note_reference_insert(ctx, object_id, value);
                self.entries.put(key.clone(), value.clone())?;
            }
            ActionCode::RemoveKey => {
                self.entries.remove(entry.param(0)?)?;
            }
            ActionCode::Clear | ActionCode::Destroy => {
                self.entries.clear()?;
            }
            other => {
                return Err(StateError::skew(format!(
                    "action {other} is not part of the map vocabulary"
                )));
            }
        }
        Ok(())
    }
}

impl ManagedObjectState for MapObjectState {
    fn object_type(&self) -> ObjectType {
        ObjectType::Map
    }

    fn class_id(&self) -> ClassId {
        self.class_id
    }

    fn apply(
        &mut self,
        object_id: ObjectId,
        log: &MutationLog,
        ctx: &mut TransactionContext,
    ) -> Result<()> {
        ensure_logical(log)?;
        for entry in log {
            self.apply_entry(object_id, entry, ctx)?;
        }
        Ok(())
    }

    fn dehydrate(&self, _object_id: ObjectId) -> Result<MutationLog> {
        let mut log = MutationLog::logical();
        for (key, value) in self.entries.entries()? {
            log.push(MutationEntry::binary(ActionCode::Put, key, value));
        }
        Ok(log)
    }

    fn collect_references(&self, refs: &mut FxHashSet<ObjectId>) -> Result<()> {
        for (key, value) in self.entries.entries()? {
            if let Some(id) = key.as_reference() {
                refs.insert(id);
            }
            if let Some(id) = value.as_reference() {
                refs.insert(id);
            }
        }
        Ok(())
    }

    fn create_facade(
        &self,
        object_id: ObjectId,
        class_name: &str,
        limit: i64,
    ) -> Result<ObjectFacade> {
        let size = self.entries.len()?;
        Ok(ObjectFacade::map_instance(
            object_id,
            class_name,
            self.entries.entries()?,
            size,
            limit,
        ))
    }

    fn logical_content(&self) -> Result<Vec<(LogicalValue, LogicalValue)>> {
        self.entries.entries()
    }

    fn destroy(&mut self) -> Result<()> {
        self.entries.release()
    }
}
