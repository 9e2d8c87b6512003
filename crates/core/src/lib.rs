//! Core types for the holon state engine
//!
//! This crate defines the foundational types shared by the store and engine
//! layers:
//! - ObjectId / ClassId: identity of a shared object and its client class
//! - ObjectType: discriminator for the logical collection family
//! - LogicalValue: the parameter vocabulary of mutation entries and store keys
//! - ActionCode / MutationEntry / MutationLog: the ordered mutation format
//! - StateError: the fatal-vs-recoverable error taxonomy
//! - ClusterRole: the externally supplied mutation gate

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod error;
pub mod types;

pub use action::{ActionCode, MutationEntry, MutationLog, RecordKind};
pub use error::{Result, StateError};
pub use types::{ClassId, ClusterRole, LogicalValue, ObjectId, ObjectType};
