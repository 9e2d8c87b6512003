//! Identity and value types
//!
//! This module defines the foundational types:
//! - ObjectId: cluster-wide identity of one shared object
//! - ClassId: index of the client class that defined the object
//! - ObjectType: discriminator for the logical collection family
//! - LogicalValue: the value vocabulary for parameters, keys, and members
//! - ClusterRole: externally supplied node role gating mutations

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, StateError};

/// Cluster-wide identity of one shared object
///
/// Assigned once at object creation by the id allocator of the transaction
/// layer, never reused, totally ordered. Scopes a state's backing-store slice
/// and is the unit of reference tracking for distributed garbage collection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ObjectId(u64);

/// The null object identity, used where a reference slot is empty.
pub const NULL_ID: ObjectId = ObjectId(0);

impl ObjectId {
    /// Wrap a raw 64-bit identity.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw 64-bit value.
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Whether this is the null identity.
    pub fn is_null(&self) -> bool {
        *self == NULL_ID
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Index of the client class that defined a shared object
///
/// Immutable for the lifetime of a state. The class registry itself lives in
/// the handshake layer; this engine only carries the index through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ClassId(u64);

impl ClassId {
    /// Wrap a raw class index.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw index value.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class:{}", self.0)
    }
}

/// Discriminator for the logical collection family
///
/// Selects which concrete state implementation materializes an object at
/// creation and reconstruction time. Codes are stable across the cluster and
/// across restarts; an unknown code in a persisted record is protocol skew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    /// Membership-only collection (the exemplar type).
    Set,
    /// Key to value collection.
    Map,
    /// Positionally ordered collection; also carries queue-shaped clients.
    List,
}

impl ObjectType {
    /// Stable persisted code for this discriminator.
    pub fn code(&self) -> u8 {
        match self {
            ObjectType::Set => 1,
            ObjectType::Map => 2,
            ObjectType::List => 3,
        }
    }

    /// Decode a persisted discriminator code.
    ///
    /// # Errors
    /// Unknown codes are fatal protocol skew: the record was written by a
    /// node that disagrees about the type vocabulary.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(ObjectType::Set),
            2 => Ok(ObjectType::Map),
            3 => Ok(ObjectType::List),
            other => Err(StateError::skew(format!(
                "unknown object type code {other}"
            ))),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Set => "set",
            ObjectType::Map => "map",
            ObjectType::List => "list",
        };
        write!(f, "{name}")
    }
}

/// Value vocabulary for mutation parameters, store keys, and store values
///
/// Either a raw scalar mirrored from the client object graph or a reference
/// to another shared object. Totally ordered so it can key the backing
/// store's sorted slices; the ordering itself carries no meaning beyond
/// giving iteration a stable order within one call.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LogicalValue {
    /// Absent value.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// String scalar.
    Text(String),
    /// Opaque byte scalar.
    Bytes(Vec<u8>),
    /// Reference to another shared object.
    Reference(ObjectId),
}

impl LogicalValue {
    /// The referenced identity, if this value is a reference.
    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            LogicalValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether this value is a reference to another shared object.
    pub fn is_reference(&self) -> bool {
        matches!(self, LogicalValue::Reference(_))
    }
}

impl From<ObjectId> for LogicalValue {
    fn from(id: ObjectId) -> Self {
        LogicalValue::Reference(id)
    }
}

impl From<&str> for LogicalValue {
    fn from(s: &str) -> Self {
        LogicalValue::Text(s.to_string())
    }
}

impl From<i64> for LogicalValue {
    fn from(n: i64) -> Self {
        LogicalValue::Int(n)
    }
}

/// Node role supplied by the cluster state machine
///
/// The engine does not own role transitions; it only consults the current
/// role before accepting a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterRole {
    /// Serving client transactions.
    Active,
    /// Standby; mutations must come through resync, not client transactions.
    Passive,
    /// Receiving replicated transactions while catching up.
    Syncing,
}

impl ClusterRole {
    /// Whether a node in this role may apply mutation logs.
    ///
    /// Syncing nodes apply replicated transactions, so they pass the gate;
    /// only a plain passive standby rejects.
    pub fn allows_mutation(&self) -> bool {
        !matches!(self, ClusterRole::Passive)
    }
}

impl fmt::Display for ClusterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClusterRole::Active => "active",
            ClusterRole::Passive => "passive",
            ClusterRole::Syncing => "syncing",
        };
        write!(f, "{name}")
    }
}
