//! Store abstraction traits
//!
//! The factory hands out one slice per object identity; a slice is a keyed
//! mapping holding that object's logical content. Implementations decide the
//! on-disk layout entirely; the engine only relies on the operations below.
//!
//! Handles are views: every slice obtained for the same identity observes
//! the same underlying data. Thread safety for single operations is the
//! implementation's problem; ordering across a whole mutation log is the
//! caller's (the delivery layer serializes applies per identity).

use holon_core::{LogicalValue, ObjectId, Result};

/// Factory for per-object store slices, keyed by object identity
///
/// Injected into the engine at construction so tests run against the heap
/// backend and production runs against a durable one without the state types
/// changing.
pub trait SliceFactory: Send + Sync {
    /// Allocate a fresh, empty slice for a newly defined object.
    ///
    /// An identity whose previous slice was released may be created again;
    /// the new slice starts empty.
    ///
    /// # Errors
    /// Store failures are recoverable and propagate unchanged.
    fn create_slice(&self, object_id: ObjectId) -> Result<Box<dyn StoreSlice>>;

    /// Recover the existing slice for a persisted object.
    ///
    /// Idempotent: repeated opens of the same identity yield handles onto
    /// the same underlying data.
    ///
    /// # Errors
    /// Opening an identity that was never created, or whose slice has been
    /// released, is a fatal lifecycle error.
    fn open_slice(&self, object_id: ObjectId) -> Result<Box<dyn StoreSlice>>;
}

/// One object's keyed slice of the backing store
///
/// Keys and values are `LogicalValue`s; set-like states store a sentinel
/// value and use keys as members, map-like states store real values,
/// list-like states key by position.
pub trait StoreSlice: Send + Sync + std::fmt::Debug {
    /// Identity whose content this slice holds.
    fn object_id(&self) -> ObjectId;

    /// Insert or overwrite a key.
    ///
    /// # Errors
    /// Recoverable store failure, or fatal lifecycle error after release.
    fn put(&self, key: LogicalValue, value: LogicalValue) -> Result<()>;

    /// Point lookup.
    ///
    /// # Errors
    /// Recoverable store failure, or fatal lifecycle error after release.
    fn get(&self, key: &LogicalValue) -> Result<Option<LogicalValue>>;

    /// Delete a key. Deleting an absent key is a no-op.
    ///
    /// # Errors
    /// Recoverable store failure, or fatal lifecycle error after release.
    fn remove(&self, key: &LogicalValue) -> Result<()>;

    /// Bulk delete; same semantics as repeated `remove`.
    ///
    /// # Errors
    /// Recoverable store failure, or fatal lifecycle error after release.
    fn remove_all(&self, keys: &[LogicalValue]) -> Result<()>;

    /// Delete every key.
    ///
    /// # Errors
    /// Recoverable store failure, or fatal lifecycle error after release.
    fn clear(&self) -> Result<()>;

    /// Number of keys currently stored.
    ///
    /// # Errors
    /// Recoverable store failure, or fatal lifecycle error after release.
    fn len(&self) -> Result<u64>;

    /// Whether the slice holds no keys.
    ///
    /// # Errors
    /// Recoverable store failure, or fatal lifecycle error after release.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All keys, in an order that is stable within a single call.
    ///
    /// # Errors
    /// Recoverable store failure, or fatal lifecycle error after release.
    fn keys(&self) -> Result<Vec<LogicalValue>>;

    /// All entries, in the same order `keys` would yield.
    ///
    /// # Errors
    /// Recoverable store failure, or fatal lifecycle error after release.
    fn entries(&self) -> Result<Vec<(LogicalValue, LogicalValue)>>;

    /// Release the slice's resources. At most once per slice.
    ///
    /// # Errors
    /// A second release is a fatal lifecycle error: it means two owners both
    /// believed they were responsible for teardown.
    fn release(&self) -> Result<()>;
}
