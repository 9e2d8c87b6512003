//! Mutation log format
//!
//! An ordered sequence of logical actions produced by one client transaction
//! against one shared object. Entries carry a method code and a short
//! parameter list; the engine applies them strictly in order. The same shape
//! is re-emitted by dehydrate as a full-content definition.
//!
//! Wire codes are a closed vocabulary agreed on by every node in the
//! cluster. Decoding an unknown code is fatal protocol skew, never a
//! recoverable condition.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::error::{Result, StateError};
use crate::types::LogicalValue;

/// Method code of one logical action
///
/// The set family uses `Add`/`Remove`/`RemoveAll`/`Clear`/`Destroy`, the map
/// family `Put`/`RemoveKey`/`Clear`/`Destroy`, the list family
/// `Add`/`Insert`/`RemoveAt`/`SetAt`/`Remove`/`Clear`/`Destroy`. Each state
/// implementation rejects codes outside its own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionCode {
    /// Insert a member (set) or append an element (list).
    Add,
    /// Remove a member (set) or the first occurrence of a value (list).
    Remove,
    /// Bulk remove; parameters are the values to remove.
    RemoveAll,
    /// Empty the logical content.
    Clear,
    /// Empty the logical content. Resource release is a separate lifecycle
    /// operation, deliberately not reachable from a mutation log.
    Destroy,
    /// Map insert or overwrite: (key, value).
    Put,
    /// Map removal by key.
    RemoveKey,
    /// List insert at position: (index, value), shifting the tail right.
    Insert,
    /// List removal at position: (index), shifting the tail left.
    RemoveAt,
    /// List overwrite at position: (index, value).
    SetAt,
}

impl ActionCode {
    /// Stable wire code for this action.
    pub fn wire_code(&self) -> u8 {
        match self {
            ActionCode::Add => 1,
            ActionCode::Remove => 2,
            ActionCode::RemoveAll => 3,
            ActionCode::Clear => 4,
            ActionCode::Destroy => 5,
            ActionCode::Put => 6,
            ActionCode::RemoveKey => 7,
            ActionCode::Insert => 8,
            ActionCode::RemoveAt => 9,
            ActionCode::SetAt => 10,
        }
    }

    /// Decode a wire code.
    ///
    /// # Errors
    /// Unknown codes are fatal protocol skew.
    pub fn from_wire(code: u8) -> Result<Self> {
        match code {
            1 => Ok(ActionCode::Add),
            2 => Ok(ActionCode::Remove),
            3 => Ok(ActionCode::RemoveAll),
            4 => Ok(ActionCode::Clear),
            5 => Ok(ActionCode::Destroy),
            6 => Ok(ActionCode::Put),
            7 => Ok(ActionCode::RemoveKey),
            8 => Ok(ActionCode::Insert),
            9 => Ok(ActionCode::RemoveAt),
            10 => Ok(ActionCode::SetAt),
            other => Err(StateError::skew(format!("unknown action code {other}"))),
        }
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Record kind tag on a mutation log
///
/// Logical records describe collection mutations; physical records describe
/// field-by-field object contents and are handled by a different state
/// family. Routing a physical record to a logical state is protocol skew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    /// Collection mutations expressed as logical actions.
    Logical,
    /// Field-by-field object record.
    Physical,
}

/// One logical action: a method code plus its ordered parameters
///
/// Parameter lists are almost always one or two values, so they live in a
/// `SmallVec` and stay off the heap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEntry {
    code: ActionCode,
    params: SmallVec<[LogicalValue; 2]>,
}

impl MutationEntry {
    /// Entry with an arbitrary parameter list.
    pub fn new(code: ActionCode, params: impl IntoIterator<Item = LogicalValue>) -> Self {
        Self {
            code,
            params: params.into_iter().collect(),
        }
    }

    /// Entry with no parameters.
    pub fn nullary(code: ActionCode) -> Self {
        Self {
            code,
            params: SmallVec::new(),
        }
    }

    /// Entry with one parameter.
    pub fn unary(code: ActionCode, param: LogicalValue) -> Self {
        let mut params = SmallVec::new();
        params.push(param);
        Self { code, params }
    }

    /// Entry with two parameters.
    pub fn binary(code: ActionCode, first: LogicalValue, second: LogicalValue) -> Self {
        let mut params = SmallVec::new();
        params.push(first);
        params.push(second);
        Self { code, params }
    }

    /// The method code.
    pub fn code(&self) -> ActionCode {
        self.code
    }

    /// All parameters in order.
    pub fn params(&self) -> &[LogicalValue] {
        &self.params
    }

    /// Parameter at `index`.
    ///
    /// # Errors
    /// A missing parameter means producer and consumer disagree about the
    /// entry shape, which is fatal protocol skew.
    pub fn param(&self, index: usize) -> Result<&LogicalValue> {
        self.params.get(index).ok_or_else(|| {
            StateError::skew(format!(
                "{} entry carries {} parameters, parameter {} required",
                self.code,
                self.params.len(),
                index
            ))
        })
    }

    /// Parameter at `index`, required to be an integer.
    ///
    /// # Errors
    /// Fatal protocol skew if absent or not an integer. Used for positional
    /// indices in the list vocabulary.
    pub fn int_param(&self, index: usize) -> Result<i64> {
        match self.param(index)? {
            LogicalValue::Int(n) => Ok(*n),
            other => Err(StateError::skew(format!(
                "{} entry parameter {} must be an integer, got {:?}",
                self.code, index, other
            ))),
        }
    }
}

/// Ordered mutation log for one shared object
///
/// Consumed by apply, produced by dehydrate. Order is load-bearing: later
/// entries may depend on side effects of earlier ones, so the engine never
/// reorders or coalesces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationLog {
    kind: RecordKind,
    entries: Vec<MutationEntry>,
}

impl MutationLog {
    /// Empty log of the given kind.
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Empty logical log.
    pub fn logical() -> Self {
        Self::new(RecordKind::Logical)
    }

    /// Logical log from a list of entries.
    pub fn of(entries: impl IntoIterator<Item = MutationEntry>) -> Self {
        Self {
            kind: RecordKind::Logical,
            entries: entries.into_iter().collect(),
        }
    }

    /// The record kind tag.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Append an entry, preserving order.
    pub fn push(&mut self, entry: MutationEntry) {
        self.entries.push(entry);
    }

    /// Entries in arrival order.
    pub fn entries(&self) -> &[MutationEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log carries no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a MutationLog {
    type Item = &'a MutationEntry;
    type IntoIter = std::slice::Iter<'a, MutationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
