//! Heap-backed store implementation
//!
//! The reference implementation of the slice contract:
//! - `DashMap<ObjectId, Arc<SliceCell>>` at the factory level, so handles
//!   for the same identity share one cell
//! - `BTreeMap<LogicalValue, LogicalValue>` under `parking_lot::RwLock`
//!   inside each cell, giving key iteration the stable order dehydrate and
//!   facades rely on within one call
//! - an atomic released flag per cell; any operation after release fails
//!   with a fatal lifecycle error
//!
//! Nothing here is durable. Durable backends live outside this workspace
//! and implement the same traits.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use holon_core::{LogicalValue, ObjectId, Result, StateError};

use crate::traits::{SliceFactory, StoreSlice};

/// Shared storage cell for one object identity
#[derive(Debug, Default)]
struct SliceCell {
    data: RwLock<BTreeMap<LogicalValue, LogicalValue>>,
    released: AtomicBool,
}

impl SliceCell {
    fn guard(&self, object_id: ObjectId) -> Result<()> {
        if self.released.load(Ordering::Acquire) {
            return Err(StateError::lifecycle(format!(
                "slice for {object_id} used after release"
            )));
        }
        Ok(())
    }
}

/// In-memory slice factory
///
/// Hands out `HeapSlice` views over shared cells. Creating an identity whose
/// previous slice was released installs a fresh empty cell; opening one that
/// was never created (or was released) is a lifecycle error.
#[derive(Debug, Default)]
pub struct HeapSliceFactory {
    slices: DashMap<ObjectId, Arc<SliceCell>>,
}

impl HeapSliceFactory {
    /// New factory with no slices.
    pub fn new() -> Self {
        Self {
            slices: DashMap::new(),
        }
    }

    /// Number of live (created, not released) slices. Monitoring only.
    pub fn live_slices(&self) -> usize {
        self.slices
            .iter()
            .filter(|entry| !entry.value().released.load(Ordering::Acquire))
            .count()
    }
}

impl SliceFactory for HeapSliceFactory {
    fn create_slice(&self, object_id: ObjectId) -> Result<Box<dyn StoreSlice>> {
        let cell = {
            let mut entry = self
                .slices
                .entry(object_id)
                .or_insert_with(|| Arc::new(SliceCell::default()));
            // A released identity may be created again; start it fresh.
            if entry.released.load(Ordering::Acquire) {
                *entry.value_mut() = Arc::new(SliceCell::default());
            }
            entry.value().clone()
        };
        debug!(target: "holon::store", object_id = %object_id, "slice created");
        Ok(Box::new(HeapSlice { object_id, cell }))
    }

    fn open_slice(&self, object_id: ObjectId) -> Result<Box<dyn StoreSlice>> {
        let cell = self
            .slices
            .get(&object_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                StateError::lifecycle(format!(
                    "open of slice for {object_id} which was never created or was released"
                ))
            })?;
        cell.guard(object_id)?;
        Ok(Box::new(HeapSlice { object_id, cell }))
    }
}

/// Handle onto one identity's heap cell
#[derive(Debug)]
pub struct HeapSlice {
    object_id: ObjectId,
    cell: Arc<SliceCell>,
}

impl StoreSlice for HeapSlice {
    fn object_id(&self) -> ObjectId {
        self.object_id
    }

    fn put(&self, key: LogicalValue, value: LogicalValue) -> Result<()> {
        self.cell.guard(self.object_id)?;
        self.cell.data.write().insert(key, value);
        Ok(())
    }

    fn get(&self, key: &LogicalValue) -> Result<Option<LogicalValue>> {
        self.cell.guard(self.object_id)?;
        Ok(self.cell.data.read().get(key).cloned())
    }

    fn remove(&self, key: &LogicalValue) -> Result<()> {
        self.cell.guard(self.object_id)?;
        self.cell.data.write().remove(key);
        Ok(())
    }

    fn remove_all(&self, keys: &[LogicalValue]) -> Result<()> {
        self.cell.guard(self.object_id)?;
        let mut data = self.cell.data.write();
        for key in keys {
            data.remove(key);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.cell.guard(self.object_id)?;
        self.cell.data.write().clear();
        Ok(())
    }

    fn len(&self) -> Result<u64> {
        self.cell.guard(self.object_id)?;
        Ok(self.cell.data.read().len() as u64)
    }

    fn keys(&self) -> Result<Vec<LogicalValue>> {
        self.cell.guard(self.object_id)?;
        Ok(self.cell.data.read().keys().cloned().collect())
    }

    fn entries(&self) -> Result<Vec<(LogicalValue, LogicalValue)>> {
        self.cell.guard(self.object_id)?;
        Ok(self
            .cell
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn release(&self) -> Result<()> {
        if self.cell.released.swap(true, Ordering::AcqRel) {
            return Err(StateError::lifecycle(format!(
                "slice for {} released twice",
                self.object_id
            )));
        }
        self.cell.data.write().clear();
        debug!(target: "holon::store", object_id = %self.object_id, "slice released");
        Ok(())
    }
}
