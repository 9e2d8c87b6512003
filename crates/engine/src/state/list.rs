//! List-like managed object state
//!
//! Positionally ordered content over the keyed slice: the key is
//! `Int(index)`, dense from 0 to len-1. Positional actions shift the tail;
//! a hole inside the dense range means the backing data is corrupt and the
//! object must be resynchronized from a healthy replica.
//!
//! Queue-shaped client collections ride this vocabulary too: a queue is a
//! list the client only touches at its ends.

use rustc_hash::FxHashSet;

use holon_core::{
    ActionCode, ClassId, LogicalValue, MutationEntry, MutationLog, ObjectId, ObjectType, Result,
    StateError,
};
use holon_store::{SliceFactory, StoreSlice};

use crate::context::TransactionContext;
use crate::facade::ObjectFacade;
use crate::state::{ensure_logical, note_reference_insert, ManagedObjectState};

/// Managed state for list-like collections
pub struct ListObjectState {
    class_id: ClassId,
    object_id: ObjectId,
    slots: Box<dyn StoreSlice>,
}

impl ListObjectState {
    /// New empty list state over a fresh slice.
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
            slots: factory.create_slice(object_id)?,
        })
    }

    /// Recover a persisted list state by reopening its slice.
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
            slots: factory.open_slice(object_id)?,
        })
    }

    fn slot_key(index: u64) -> LogicalValue {
        LogicalValue::Int(index as i64)
    }

    /// Element at a dense index. A hole is corruption, not absence.
    fn slot(&self, index: u64) -> Result<LogicalValue> {
        self.slots.get(&Self::slot_key(index))?.ok_or_else(|| {
            StateError::corruption(format!(
                "list {} has a hole at index {index}",
                self.object_id
            ))
        })
    }

    /// Validate a positional parameter against the current length.
    ///
    /// `allow_end` admits index == len (insertion point after the last
    /// element); overwrites and removals require index < len.
    fn position(&self, raw: i64, allow_end: bool) -> Result<u64> {
        let len = self.slots.len()?;
        let upper = if allow_end { len } else { len.saturating_sub(1) };
        if raw < 0 || (raw as u64) > upper || (!allow_end && len == 0) {
            return Err(StateError::skew(format!(
                "position {raw} outside list of length {len}"
            )));
        }
        Ok(raw as u64)
    }

    /// Shift elements `[from, len)` one slot right, opening `from`.
    fn shift_right_from(&mut self, from: u64, len: u64) -> Result<()> {
        let mut index = len;
        while index > from {
            let value = self.slot(index - 1)?;
            self.slots.put(Self::slot_key(index), value)?;
            index -= 1;
        }
        Ok(())
    }

    /// Shift elements `(at, len)` one slot left, closing `at`.
    fn shift_left_onto(&mut self, at: u64, len: u64) -> Result<()> {
        for index in at..len - 1 {
            let value = self.slot(index + 1)?;
            self.slots.put(Self::slot_key(index), value)?;
        }
        self.slots.remove(&Self::slot_key(len - 1))?;
        Ok(())
    }

    fn apply_entry(
        &mut self,
        object_id: ObjectId,
        entry: &MutationEntry,
        ctx: &mut TransactionContext,
    ) -> Result<()> {
        match entry.code() {
            ActionCode::Add => {
                let value = entry.param(0)?;
                note_reference_insert(ctx, object_id, value);
                let len = self.slots.len()?;
                self.slots.put(Self::slot_key(len), value.clone())?;
            }
            ActionCode::Insert => {
                let index = self.position(entry.int_param(0)?, true)?;
                let value = entry.param(1)?;
                note_reference_insert(ctx, object_id, value);
                let len = self.slots.len()?;
                self.shift_right_from(index, len)?;
                self.slots.put(Self::slot_key(index), value.clone())?;
            }
            ActionCode::SetAt => {
                let index = self.position(entry.int_param(0)?, false)?;
                let value = entry.param(1)?;
                note_reference_insert(ctx, object_id, value);
                self.slots.put(Self::slot_key(index), value.clone())?;
            }
            ActionCode::RemoveAt => {
                let index = self.position(entry.int_param(0)?, false)?;
                let len = self.slots.len()?;
                self.shift_left_onto(index, len)?;
            }
            ActionCode::Remove => {
                // First occurrence by position; absent values are a no-op.
                let value = entry.param(0)?;
                let len = self.slots.len()?;
                let mut found = None;
                for index in 0..len {
                    if &self.slot(index)? == value {
                        found = Some(index);
                        break;
                    }
                }
                if let Some(index) = found {
                    self.shift_left_onto(index, len)?;
                }
            }
            ActionCode::Clear | ActionCode::Destroy => {
                self.slots.clear()?;
            }
            other => {
                return Err(StateError::skew(format!(
                    "action {other} is not part of the list vocabulary"
                )));
            }
        }
        Ok(())
    }

    /// Elements in positional order.
    fn elements(&self) -> Result<Vec<LogicalValue>> {
        let len = self.slots.len()?;
        let mut values = Vec::with_capacity(len as usize);
        for index in 0..len {
            values.push(self.slot(index)?);
        }
        Ok(values)
    }
}

impl ManagedObjectState for ListObjectState {
    fn object_type(&self) -> ObjectType {
        ObjectType::List
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
        for value in self.elements()? {
            log.push(MutationEntry::unary(ActionCode::Add, value));
        }
        Ok(log)
    }

    fn collect_references(&self, refs: &mut FxHashSet<ObjectId>) -> Result<()> {
        for value in self.elements()? {
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
        let size = self.slots.len()?;
        Ok(ObjectFacade::list_instance(
            object_id,
            class_name,
            self.elements()?,
            size,
            limit,
        ))
    }

    fn logical_content(&self) -> Result<Vec<(LogicalValue, LogicalValue)>> {
        self.slots.entries()
    }

    fn destroy(&mut self) -> Result<()> {
        self.slots.release()
    }
}
