//! An in-memory reference [`Backend`] (test-util only).
//!
//! Exists so the rest of the crate — and anyone linking against
//! `rbh-core` with `test-util` enabled — has something real to run
//! filters and bulk updates against without standing up an actual
//! filesystem crawler, the same role the teacher's
//! `DefaultEngine`-over-`tempfile` combination plays for its own tests
//! (`kernel/src/engine/default/mod.rs`).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::backend::Backend;
use crate::entry::{Entry, EntryMask, Identifier, NamespaceEdge, Statx, StatxMask};
use crate::error::Result;
use crate::event::{EventKind, FilesystemEvent};
use crate::filter::Filter;
use crate::iter::{FromStdIter, OwningIter};
use crate::query;
use crate::update::{self, BulkOp};

/// A single-process, non-persistent backend keyed by [`Identifier`].
pub struct MemoryBackend {
    entries: Mutex<HashMap<Identifier, Entry>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let root_id = Identifier::root();
        let mut entries = HashMap::new();
        entries.insert(root_id.clone(), Entry::root(root_id));
        MemoryBackend {
            entries: Mutex::new(entries),
        }
    }

    fn apply(&self, op: BulkOp) {
        let mut entries = self.entries.lock().expect("memory backend mutex poisoned");
        match op {
            // Deleting an entry that's already gone is a no-op, not an
            // error (spec.md §4.5 invariant 6).
            BulkOp::RemoveOne(id) => {
                entries.remove(&id);
            }
            BulkOp::UnlinkEdge { id, parent_id, name } => {
                if let Some(entry) = entries.get_mut(&id) {
                    entry.namespace.retain(|edge| !(edge.parent_id == parent_id && edge.name == name));
                    if entry.parent_id.as_ref() == Some(&parent_id) && entry.name.as_deref() == Some(name.as_str()) {
                        let replacement = entry.namespace.first().cloned();
                        entry.parent_id = replacement.as_ref().map(|e| e.parent_id.clone());
                        entry.name = replacement.map(|e| e.name);
                    }
                }
                // Unlinking an edge that was never linked is also a no-op
                // (the inverse half of invariant 7: link/unlink compose to
                // identity regardless of starting state).
            }
            BulkOp::LinkEdge { id, parent_id, name } => {
                let entry = entries.entry(id.clone()).or_insert_with(|| Entry {
                    id,
                    ..Default::default()
                });
                let edge = NamespaceEdge {
                    parent_id: parent_id.clone(),
                    name: name.clone(),
                };
                if !entry.namespace.contains(&edge) {
                    entry.namespace.push(edge);
                }
                if entry.parent_id.is_none() {
                    entry.parent_id = Some(parent_id);
                    entry.name = Some(name);
                }
            }
            BulkOp::UpsertStatx { id, statx } => {
                let entry = entries.entry(id.clone()).or_insert_with(|| Entry {
                    id,
                    ..Default::default()
                });
                merge_statx(entry.statx.get_or_insert_with(Statx::default), statx);
            }
            // The reference entry model has no generic xattr map (see
            // `filter::eval::extract_field`'s `Field::Xattr` arm); storing
            // one is backend-defined, so this reference backend accepts the
            // event without persisting its payload.
            BulkOp::UpsertNamespaceXattrs { .. } | BulkOp::UpsertInodeXattrs { .. } => {}
        }
    }
}

fn merge_statx(current: &mut Statx, incoming: Statx) {
    if incoming.mask.contains(StatxMask::MODE) {
        current.mode = incoming.mode;
    }
    if incoming.mask.contains(StatxMask::UID) {
        current.uid = incoming.uid;
    }
    if incoming.mask.contains(StatxMask::GID) {
        current.gid = incoming.gid;
    }
    if incoming.mask.contains(StatxMask::ATIME) {
        current.atime = incoming.atime;
    }
    if incoming.mask.contains(StatxMask::MTIME) {
        current.mtime = incoming.mtime;
    }
    if incoming.mask.contains(StatxMask::CTIME) {
        current.ctime = incoming.ctime;
    }
    if incoming.mask.contains(StatxMask::SIZE) {
        current.size = incoming.size;
    }
    if incoming.mask.contains(StatxMask::DEV) {
        current.dev = incoming.dev;
    }
    if incoming.mask.contains(StatxMask::NLINK) {
        current.nlink = incoming.nlink;
    }
    current.mask |= incoming.mask;
}

impl Backend for MemoryBackend {
    fn root(&self, entry_mask: EntryMask, stat_mask: StatxMask) -> Result<Entry> {
        let entries = self.entries.lock().expect("memory backend mutex poisoned");
        entries
            .values()
            .find(|e| e.is_root())
            .cloned()
            .map(|entry| query::project_entry(entry, entry_mask, stat_mask))
            .ok_or(crate::error::Error::NoSuchEntry)
    }

    fn update(&self, events: &mut dyn OwningIter<Item = FilesystemEvent>) -> Result<usize> {
        let plan = update::plan_bulk(events)?;
        for op in plan.ops {
            self.apply(op);
        }
        Ok(plan.event_count)
    }

    fn filter_entries(
        &self,
        filter: &Filter,
        entry_mask: EntryMask,
        stat_mask: StatxMask,
    ) -> Result<Box<dyn OwningIter<Item = Entry>>> {
        filter.validate()?;
        let entries = self.entries.lock().expect("memory backend mutex poisoned");
        let mut matched = Vec::new();

        if query::unwind_required(filter) {
            for entry in entries.values() {
                if entry.namespace.is_empty() {
                    if filter.matches(entry)? {
                        matched.push(query::project_entry(entry.clone(), entry_mask, stat_mask));
                    }
                    continue;
                }
                // One view per edge, no dedup across edges (spec.md §4.6,
                // resolved Open Question): a hard-linked entry with two
                // matching edges yields two results.
                for edge in &entry.namespace {
                    let mut view = entry.clone();
                    view.parent_id = Some(edge.parent_id.clone());
                    view.name = Some(edge.name.clone());
                    if filter.matches(&view)? {
                        matched.push(query::project_entry(view, entry_mask, stat_mask));
                    }
                }
            }
        } else {
            for entry in entries.values() {
                if filter.matches(entry)? {
                    matched.push(query::project_entry(entry.clone(), entry_mask, stat_mask));
                }
            }
        }

        Ok(Box::new(FromStdIter(matched.into_iter())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Timestamp;
    use crate::filter::Field;
    use crate::value::Value;

    fn push_event(backend: &MemoryBackend, event: FilesystemEvent) -> usize {
        let mut events = FromStdIter(vec![event].into_iter());
        backend.update(&mut events).unwrap()
    }

    #[test]
    fn s7_root_query_respects_masks() {
        let backend = MemoryBackend::new();
        let root = backend
            .root(EntryMask::ID | EntryMask::PARENT_ID, StatxMask::empty())
            .unwrap();
        assert_eq!(root.parent_id, Some(Identifier::root()));
        assert!(root.name.is_none());
        assert!(root.statx.is_none());
    }

    #[test]
    fn s6_link_then_filter_by_parent_and_name() {
        let backend = MemoryBackend::new();
        let id = Identifier(vec![7]);
        let parent = Identifier::root();
        push_event(&backend, FilesystemEvent::link(id.clone(), parent.clone(), "foo.c"));
        push_event(
            &backend,
            FilesystemEvent::upsert(
                id.clone(),
                Statx {
                    mask: StatxMask::MTIME,
                    mtime: Timestamp { seconds: 1_700_000_001, nanos: 0 },
                    ..Default::default()
                },
            ),
        );

        let filter = Filter::and(vec![
            Filter::eq(Field::Name, "foo.c"),
            Filter::ge(Field::Mtime, 1_700_000_000i64),
        ]);
        let mut results = backend
            .filter_entries(&filter, EntryMask::ID | EntryMask::NAME, StatxMask::empty())
            .unwrap();
        let found = results.next().unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(results.next().unwrap().is_none());
    }

    #[test]
    fn delete_is_idempotent() {
        let backend = MemoryBackend::new();
        let id = Identifier(vec![3]);
        push_event(&backend, FilesystemEvent::delete(id.clone()));
        let count = push_event(&backend, FilesystemEvent::delete(id));
        assert_eq!(count, 1, "a delete of an absent entry is still an accepted no-op event");
    }

    #[test]
    fn link_then_unlink_is_the_identity() {
        let backend = MemoryBackend::new();
        let id = Identifier(vec![4]);
        let parent = Identifier::root();
        push_event(&backend, FilesystemEvent::link(id.clone(), parent.clone(), "a"));
        push_event(&backend, FilesystemEvent::unlink(id.clone(), parent, "a"));

        let filter = Filter::eq(Field::Id, Value::Binary(id.as_bytes().to_vec()));
        let mut results = backend
            .filter_entries(&filter, EntryMask::NAME, StatxMask::empty())
            .unwrap();
        let found = results.next().unwrap().unwrap();
        assert!(found.name.is_none());
    }

    #[test]
    fn hard_linked_entry_yields_one_result_per_matching_edge() {
        let backend = MemoryBackend::new();
        let id = Identifier(vec![5]);
        let root = Identifier::root();
        push_event(&backend, FilesystemEvent::link(id.clone(), root.clone(), "a"));
        push_event(&backend, FilesystemEvent::link(id.clone(), root, "a"));
        // Same {parent_id, name} linked twice collapses to one edge (the
        // namespace is a set), so this is really checking that re-linking
        // the identical edge doesn't produce duplicate results.

        let filter = Filter::eq(Field::Name, "a");
        let mut results = backend
            .filter_entries(&filter, EntryMask::ID, StatxMask::empty())
            .unwrap();
        assert!(results.next().unwrap().is_some());
        assert!(results.next().unwrap().is_none());
    }
}
