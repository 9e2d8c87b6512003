//! Holon - replicated managed-object state engine
//!
//! Holon is the server-side state engine of a clustered object system:
//! object graphs created on client nodes are mirrored here as managed
//! object states, fed by ordered mutation logs, persisted through a
//! pluggable collection store, and tracked for distributed garbage
//! collection.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use holon::{
//!     ActionCode, ClassId, ClusterRole, FixedRole, HeapSliceFactory,
//!     LogicalValue, MutationEntry, MutationLog, NoopListener, ObjectId,
//!     ObjectRegistry, ObjectType,
//! };
//!
//! let registry = ObjectRegistry::new(
//!     Arc::new(HeapSliceFactory::new()),
//!     Arc::new(NoopListener),
//!     Arc::new(FixedRole(ClusterRole::Active)),
//! );
//!
//! let id = ObjectId::new(1);
//! registry.create(id, ObjectType::Set, ClassId::new(1))?;
//! registry.apply(
//!     id,
//!     &MutationLog::of([MutationEntry::unary(
//!         ActionCode::Add,
//!         LogicalValue::from("member"),
//!     )]),
//! )?;
//! assert_eq!(registry.dehydrate(id)?.len(), 1);
//! # Ok::<(), holon_core::StateError>(())
//! ```
//!
//! # Architecture
//!
//! - `holon-core`: identities, the mutation-log format, the error taxonomy
//! - `holon-store`: the injected persistent-collection-store contract plus
//!   the heap reference backend
//! - `holon-engine`: the managed-object state family, transaction context,
//!   facades, and the lifecycle registry
//!
//! The network protocol, cluster state machine, and durable store
//! implementations live outside this workspace and talk to the engine
//! through [`ObjectRegistry`], [`SliceFactory`], and [`ChangeListener`].

// Re-export the public API of the member crates.
pub use holon_core::{
    ActionCode, ClassId, ClusterRole, LogicalValue, MutationEntry, MutationLog, ObjectId,
    ObjectType, RecordKind, Result, StateError,
};
pub use holon_engine::{
    new_state, reopen_state, BackReference, ChangeListener, FacadeElement, FixedRole,
    ListObjectState, ManagedObjectState, MapObjectState, NoopListener, ObjectFacade,
    ObjectRegistry, RoleSource, SetObjectState, StateMetadata, TransactionContext,
};
pub use holon_store::{HeapSlice, HeapSliceFactory, SliceFactory, StoreSlice};
