//! Filesystem-entry data model (C4 half 1).

use bitflags::bitflags;

/// An opaque binary identifier: the primary key of entries and the parent
/// reference namespace edges carry. The root identifier is the zero-length
/// blob (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identifier(pub Vec<u8>);

impl Identifier {
    /// The root identifier: the zero-length blob.
    pub fn root() -> Self {
        Identifier(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Identifier {
    fn from(v: Vec<u8>) -> Self {
        Identifier(v)
    }
}

bitflags! {
    /// Field-addressable mask for [`Entry`] — a query's requested entry
    /// fields bound what a result actually populates (spec.md §3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EntryMask: u32 {
        const ID         = 1 << 0;
        const PARENT_ID  = 1 << 1;
        const NAME       = 1 << 2;
        const STATX      = 1 << 3;
        const NAMESPACE  = 1 << 4;
        const SYMLINK    = 1 << 5;
    }
}

bitflags! {
    /// Field-addressable mask for [`Statx`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatxMask: u32 {
        const MODE   = 1 << 0;
        const UID    = 1 << 1;
        const GID    = 1 << 2;
        const ATIME  = 1 << 3;
        const MTIME  = 1 << 4;
        const CTIME  = 1 << 5;
        const SIZE   = 1 << 6;
        const DEV    = 1 << 7;
        const NLINK  = 1 << 8;
    }
}

/// Nanosecond-precision timestamp, POSIX `statx` style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

/// POSIX extended stat, with its own field mask so partial upserts only
/// touch the fields the event actually carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statx {
    pub mask: StatxMask,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: Timestamp,
    pub mtime: Timestamp,
    pub ctime: Timestamp,
    pub size: u64,
    pub dev: u64,
    pub nlink: u32,
}

/// One `{parent_id, name}` edge. A single entry may carry more than one of
/// these (hard links); every non-root entry has at least one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceEdge {
    pub parent_id: Identifier,
    pub name: String,
}

/// A filesystem object record: file, directory, or symlink.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    pub id: Identifier,
    pub parent_id: Option<Identifier>,
    pub name: Option<String>,
    pub statx: Option<Statx>,
    pub namespace: Vec<NamespaceEdge>,
    /// Present iff the entry's type is a symbolic link.
    pub symlink: Option<String>,
}

impl Entry {
    pub fn root(id: Identifier) -> Self {
        Entry {
            id,
            parent_id: Some(Identifier::root()),
            ..Default::default()
        }
    }

    /// `true` for an entry whose `parent_id`, if populated, is the root
    /// identifier.
    pub fn is_root(&self) -> bool {
        self.parent_id.as_ref().is_some_and(Identifier::is_root)
    }
}
