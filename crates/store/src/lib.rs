//! Persistent-collection-store contract for the holon state engine
//!
//! This crate defines the backing-store boundary:
//! - SliceFactory / StoreSlice: the injected store abstraction, one slice
//!   per object identity
//! - HeapSliceFactory / HeapSlice: the in-memory reference implementation
//!
//! Durable backends implement the same traits outside this workspace; the
//! engine never sees anything but the trait objects.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod traits;

pub use memory::{HeapSlice, HeapSliceFactory};
pub use traits::{SliceFactory, StoreSlice};
