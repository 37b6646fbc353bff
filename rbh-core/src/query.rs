//! Query pipeline (C7): decides whether a namespace unwind is mandatory,
//! runs the filter, and projects results through the requested masks.
//!
//! Grounded on the teacher's scan-building code
//! (`kernel/src/scan/mod.rs::ScanBuilder`), which likewise separates
//! "decide what the query needs" from "ask the engine/backend for it".

use crate::backend::Backend;
use crate::entry::{Entry, EntryMask, Statx, StatxMask};
use crate::error::{Error, Result};
use crate::filter::{Field, Filter};

/// Whether `filter` references a field that only exists per namespace edge
/// (`parent_id`/`name`). If so, a backend with hard-linked entries must
/// unwind — evaluate and yield once per edge, not once per entry — or a
/// query like `parent_id = X` could miss an edge simply because a
/// different edge on the same entry was iterated first (spec.md §4.6).
pub fn unwind_required(filter: &Filter) -> bool {
    let refs = filter.references();
    refs.contains(&Field::ParentId) || refs.contains(&Field::Name)
}

/// Runs `filter` against `backend` and returns the first match, or
/// [`Error::NoSuchEntry`] if none matched.
///
/// A thin convenience over [`Backend::filter_entries`] for callers that
/// only want one result (spec.md §4.6); it validates the filter but applies
/// no further semantics the backend's own iterator doesn't already have.
pub fn filter_one(
    backend: &dyn Backend,
    filter: &Filter,
    entry_mask: EntryMask,
    stat_mask: StatxMask,
) -> Result<Entry> {
    filter.validate()?;
    let mut results = backend.filter_entries(filter, entry_mask, stat_mask)?;
    results.next()?.ok_or(Error::NoSuchEntry)
}

/// Projects `entry` through `entry_mask`/`stat_mask`, clearing any field the
/// caller didn't ask for. Backends share this so "unrequested fields are
/// unpopulated, not merely unspecified" (spec.md §4.6) has one
/// implementation instead of one per backend.
///
/// Namespace unwinding intentionally never deduplicates: if a filter
/// matches the same entry through two distinct edges (two hard links into
/// different parents), both are yielded as separate results (the Open
/// Question in spec.md §4.6 resolved in DESIGN.md) — a caller that wants
/// entry-unique results de-dupes by `id` itself.
pub fn project_entry(mut entry: Entry, entry_mask: EntryMask, stat_mask: StatxMask) -> Entry {
    if !entry_mask.contains(EntryMask::ID) {
        entry.id = Default::default();
    }
    if !entry_mask.contains(EntryMask::PARENT_ID) {
        entry.parent_id = None;
    }
    if !entry_mask.contains(EntryMask::NAME) {
        entry.name = None;
    }
    if !entry_mask.contains(EntryMask::NAMESPACE) {
        entry.namespace.clear();
    }
    if !entry_mask.contains(EntryMask::SYMLINK) {
        entry.symlink = None;
    }
    if !entry_mask.contains(EntryMask::STATX) {
        entry.statx = None;
    } else if let Some(statx) = entry.statx.as_mut() {
        project_statx(statx, stat_mask);
    }
    entry
}

fn project_statx(statx: &mut Statx, mask: StatxMask) {
    statx.mask &= mask;
    if !mask.contains(StatxMask::MODE) {
        statx.mode = 0;
    }
    if !mask.contains(StatxMask::UID) {
        statx.uid = 0;
    }
    if !mask.contains(StatxMask::GID) {
        statx.gid = 0;
    }
    if !mask.contains(StatxMask::ATIME) {
        statx.atime = Default::default();
    }
    if !mask.contains(StatxMask::MTIME) {
        statx.mtime = Default::default();
    }
    if !mask.contains(StatxMask::CTIME) {
        statx.ctime = Default::default();
    }
    if !mask.contains(StatxMask::SIZE) {
        statx.size = 0;
    }
    if !mask.contains(StatxMask::DEV) {
        statx.dev = 0;
    }
    if !mask.contains(StatxMask::NLINK) {
        statx.nlink = 0;
    }
}
