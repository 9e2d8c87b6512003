//! Error taxonomy for the state engine
//!
//! One error type serves all layers. The important split is fatal versus
//! recoverable: protocol skew and lifecycle misuse indicate a programming or
//! deployment bug and must never be retried, while store failures, role
//! rejections, and corruption are surfaced for the transaction layer to
//! retry, abort, or resolve by resync. `thiserror` provides Display/Error.

use crate::types::ClusterRole;
use thiserror::Error;

/// Result type alias used throughout the engine
pub type Result<T> = std::result::Result<T, StateError>;

/// Error type for all state-engine operations
#[derive(Debug, Error)]
pub enum StateError {
    /// Backing-store I/O failure. Recoverable: the caller owns retry/abort.
    #[error("store failure: {message}")]
    Storage {
        /// Description from the store implementation.
        message: String,
    },

    /// Producer and consumer disagree about the action vocabulary or entry
    /// shape. Fatal: retrying cannot fix a protocol mismatch.
    #[error("protocol skew: {detail}")]
    ProtocolSkew {
        /// What disagreed.
        detail: String,
    },

    /// Lifecycle misuse such as double destroy or operating on a released
    /// slice. Fatal: signals a bug in the caller, typically the GC layer.
    #[error("lifecycle violation: {detail}")]
    Lifecycle {
        /// What was misused.
        detail: String,
    },

    /// The node's current role does not permit applying mutations.
    #[error("mutation rejected: node role is {role}")]
    MutationRejected {
        /// Role at the time of the rejection.
        role: ClusterRole,
    },

    /// Persisted state-metadata record could not be decoded.
    #[error("metadata error: {message}")]
    Metadata {
        /// Decode failure description.
        message: String,
    },

    /// Backing data violates a structural invariant of the state type.
    /// Recoverable by resynchronizing the object from a healthy replica.
    #[error("content corruption: {message}")]
    Corruption {
        /// The violated invariant.
        message: String,
    },
}

impl StateError {
    /// Recoverable store failure.
    pub fn storage(message: impl Into<String>) -> Self {
        StateError::Storage {
            message: message.into(),
        }
    }

    /// Fatal protocol skew.
    pub fn skew(detail: impl Into<String>) -> Self {
        StateError::ProtocolSkew {
            detail: detail.into(),
        }
    }

    /// Fatal lifecycle violation.
    pub fn lifecycle(detail: impl Into<String>) -> Self {
        StateError::Lifecycle {
            detail: detail.into(),
        }
    }

    /// Recoverable structural corruption.
    pub fn corruption(message: impl Into<String>) -> Self {
        StateError::Corruption {
            message: message.into(),
        }
    }

    /// True for conditions that must not be caught and retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StateError::ProtocolSkew { .. } | StateError::Lifecycle { .. }
        )
    }

    /// True for backing-store I/O failures.
    pub fn is_storage(&self) -> bool {
        matches!(self, StateError::Storage { .. })
    }
}

impl From<bincode::Error> for StateError {
    fn from(e: bincode::Error) -> Self {
        StateError::Metadata {
            message: e.to_string(),
        }
    }
}
