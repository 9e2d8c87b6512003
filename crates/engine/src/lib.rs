//! Managed-object state engine
//!
//! The server-side materialization of shared objects. One
//! [`ManagedObjectState`] instance mirrors one client collection: it applies
//! ordered mutation logs to its backing-store slice, re-emits canonical logs
//! for resynchronization, feeds reference events to the distributed garbage
//! collector through the per-apply [`TransactionContext`], and produces
//! bounded read-only facades for monitoring.
//!
//! The [`ObjectRegistry`] is the surface the transaction-delivery layer
//! talks to: residency, lifecycle, role gating, and per-identity
//! serialization of applies all live there.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod facade;
pub mod registry;
pub mod state;

pub use context::{BackReference, ChangeListener, NoopListener, TransactionContext};
pub use facade::{FacadeElement, ObjectFacade};
pub use registry::{FixedRole, ObjectRegistry, RoleSource};
pub use state::{
    new_state, reopen_state, ListObjectState, ManagedObjectState, MapObjectState,
    SetObjectState, StateMetadata,
};
