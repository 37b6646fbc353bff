//! Filesystem change events (C4 half 2) — the input to the bulk-update
//! protocol (C6, `update.rs`).

use indexmap::IndexMap;

use crate::entry::{Identifier, Statx};
use crate::value::Value;

/// A single state change emitted by a scanner. Every variant implicitly
/// targets the entry named by the enclosing [`FilesystemEvent::id`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Delete,
    Link { parent_id: Identifier, name: String },
    Unlink { parent_id: Identifier, name: String },
    Upsert(Statx),
    NamespaceXattrs(IndexMap<String, Value>),
    InodeXattrs(IndexMap<String, Value>),
}

/// A [`EventKind`] bound to the entry it targets.
#[derive(Debug, Clone, PartialEq)]
pub struct FilesystemEvent {
    pub id: Identifier,
    pub kind: EventKind,
}

impl FilesystemEvent {
    pub fn new(id: Identifier, kind: EventKind) -> Self {
        FilesystemEvent { id, kind }
    }

    pub fn delete(id: Identifier) -> Self {
        Self::new(id, EventKind::Delete)
    }

    pub fn link(id: Identifier, parent_id: Identifier, name: impl Into<String>) -> Self {
        Self::new(
            id,
            EventKind::Link {
                parent_id,
                name: name.into(),
            },
        )
    }

    pub fn unlink(id: Identifier, parent_id: Identifier, name: impl Into<String>) -> Self {
        Self::new(
            id,
            EventKind::Unlink {
                parent_id,
                name: name.into(),
            },
        )
    }

    pub fn upsert(id: Identifier, statx: Statx) -> Self {
        Self::new(id, EventKind::Upsert(statx))
    }
}
