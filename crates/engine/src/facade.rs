//! Read-only object facades
//!
//! A facade is a bounded, point-in-time copy of one object's logical
//! content plus its true total size, built for monitoring and debugging.
//! It is never written back and holds no store handles, so it stays valid
//! after the object mutates or is destroyed (it just goes stale).

use serde::Serialize;

use holon_core::{LogicalValue, ObjectId, ObjectType};

/// One element of a facade's content sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FacadeElement {
    /// A set member or list element.
    Member(LogicalValue),
    /// A map entry.
    Pair {
        /// Entry key.
        key: LogicalValue,
        /// Entry value.
        value: LogicalValue,
    },
}

/// Bounded snapshot of one object's logical content
#[derive(Debug, Clone, Serialize)]
pub struct ObjectFacade {
    /// Identity of the snapshotted object.
    pub object_id: ObjectId,
    /// Client class name supplied by the caller.
    pub class_name: String,
    /// Collection family of the object.
    pub object_type: ObjectType,
    /// Up to `limit` elements of content; full content for negative limits.
    pub elements: Vec<FacadeElement>,
    /// True size of the content, independent of the sample bound.
    pub total_size: u64,
}

/// How many elements a facade may carry for a given limit and true size.
fn bounded(limit: i64, size: u64) -> usize {
    if limit < 0 {
        size as usize
    } else {
        (limit as u64).min(size) as usize
    }
}

impl ObjectFacade {
    /// Facade over set members.
    pub fn set_instance(
        object_id: ObjectId,
        class_name: &str,
        members: Vec<LogicalValue>,
        total_size: u64,
        limit: i64,
    ) -> Self {
        let elements = members
            .into_iter()
            .take(bounded(limit, total_size))
            .map(FacadeElement::Member)
            .collect();
        Self {
            object_id,
            class_name: class_name.to_string(),
            object_type: ObjectType::Set,
            elements,
            total_size,
        }
    }

    /// Facade over map entries.
    pub fn map_instance(
        object_id: ObjectId,
        class_name: &str,
        entries: Vec<(LogicalValue, LogicalValue)>,
        total_size: u64,
        limit: i64,
    ) -> Self {
        let elements = entries
            .into_iter()
            .take(bounded(limit, total_size))
            .map(|(key, value)| FacadeElement::Pair { key, value })
            .collect();
        Self {
            object_id,
            class_name: class_name.to_string(),
            object_type: ObjectType::Map,
            elements,
            total_size,
        }
    }

    /// Facade over list elements in positional order.
    pub fn list_instance(
        object_id: ObjectId,
        class_name: &str,
        values: Vec<LogicalValue>,
        total_size: u64,
        limit: i64,
    ) -> Self {
        let elements = values
            .into_iter()
            .take(bounded(limit, total_size))
            .map(FacadeElement::Member)
            .collect();
        Self {
            object_id,
            class_name: class_name.to_string(),
            object_type: ObjectType::List,
            elements,
            total_size,
        }
    }

    /// Number of sampled elements (not the true size).
    pub fn sampled(&self) -> usize {
        self.elements.len()
    }
}
