//! Pluggable indexing and querying of filesystem metadata.
//!
//! `rbh-core` is the backend-independent layer: a URI splitter to name a
//! backend (`uri`), a typed value/filter algebra to describe what to query
//! for (`value`, `filter`), a filesystem-entry/event data model (`entry`,
//! `event`), lazy iterator combinators for composing result streams
//! (`iter`), and the [`backend::Backend`] contract plus registry that ties a
//! scheme to an implementation, built in or dynamically loaded (`backend`).
//! `update` and `query` sit on top of `backend` and implement the two
//! request shapes every backend supports: bulk metadata updates and
//! filtered reads.
//!
//! Modeled, in spirit, after the teacher's own `kernel` crate: a small core
//! of traits and data types (`Engine`, `Expression`, `Scan`) that concrete
//! engines and storage backends implement against, rather than a monolith
//! that bakes in one storage choice.

pub mod backend;
pub mod entry;
pub mod error;
pub mod event;
pub mod filter;
pub mod iter;
pub mod query;
pub mod update;
pub mod uri;
pub mod value;

pub use backend::{Backend, BackendFactory, Registry};
pub use entry::{Entry, EntryMask, Identifier, Statx, StatxMask};
pub use error::{Error, Result};
pub use event::{EventKind, FilesystemEvent};
pub use filter::{CompareOp, Field, Filter, LogicalOp};
pub use uri::Uri;
pub use value::{Value, ValueKind};
