//! Bulk-update protocol (C6).
//!
//! `plan_bulk` lowers a stream of [`FilesystemEvent`]s into an ordered list
//! of primitive [`BulkOp`]s a backend can apply one at a time, the same
//! separation of concerns as the teacher's `Expression` tree versus
//! whatever a given engine actually executes against storage
//! (`kernel/src/expressions.rs`): planning never touches storage, applying
//! never interprets events.

use indexmap::IndexMap;
use tracing::debug;

use crate::entry::{Identifier, Statx};
use crate::error::{Error, Result};
use crate::event::{EventKind, FilesystemEvent};
use crate::iter::OwningIter;
use crate::value::Value;

/// A single primitive storage mutation (spec.md §4.5).
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOp {
    RemoveOne(Identifier),
    UnlinkEdge {
        id: Identifier,
        parent_id: Identifier,
        name: String,
    },
    LinkEdge {
        id: Identifier,
        parent_id: Identifier,
        name: String,
    },
    UpsertStatx {
        id: Identifier,
        statx: Statx,
    },
    UpsertNamespaceXattrs {
        id: Identifier,
        xattrs: IndexMap<String, Value>,
    },
    UpsertInodeXattrs {
        id: Identifier,
        xattrs: IndexMap<String, Value>,
    },
}

/// The lowered form of a batch, plus how many source events it came from —
/// a `Link` event lowers to two ops, so `ops.len()` and `event_count` can
/// legitimately differ.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkPlan {
    pub ops: Vec<BulkOp>,
    pub event_count: usize,
}

/// Drains `events` and lowers each one into its [`BulkOp`]s.
///
/// A `Link` event lowers to an adjacent `UnlinkEdge` followed by a
/// `LinkEdge` targeting the same `{parent_id, name}` pair (spec.md §4.5):
/// there is no separate "move" primitive, a rename is this same pair
/// applied with the edge's prior location. `Unlink` lowers to a lone
/// `UnlinkEdge`; `Delete` to a lone `RemoveOne`.
pub fn plan_bulk(events: &mut dyn OwningIter<Item = FilesystemEvent>) -> Result<BulkPlan> {
    let mut plan = BulkPlan::default();
    while let Some(event) = events.next()? {
        plan.event_count += 1;
        match event.kind {
            EventKind::Delete => try_push(&mut plan.ops, BulkOp::RemoveOne(event.id))?,
            EventKind::Link { parent_id, name } => {
                try_push(
                    &mut plan.ops,
                    BulkOp::UnlinkEdge {
                        id: event.id.clone(),
                        parent_id: parent_id.clone(),
                        name: name.clone(),
                    },
                )?;
                try_push(
                    &mut plan.ops,
                    BulkOp::LinkEdge {
                        id: event.id,
                        parent_id,
                        name,
                    },
                )?;
            }
            EventKind::Unlink { parent_id, name } => try_push(
                &mut plan.ops,
                BulkOp::UnlinkEdge {
                    id: event.id,
                    parent_id,
                    name,
                },
            )?,
            EventKind::Upsert(statx) => {
                try_push(&mut plan.ops, BulkOp::UpsertStatx { id: event.id, statx })?
            }
            EventKind::NamespaceXattrs(xattrs) => try_push(
                &mut plan.ops,
                BulkOp::UpsertNamespaceXattrs { id: event.id, xattrs },
            )?,
            EventKind::InodeXattrs(xattrs) => try_push(
                &mut plan.ops,
                BulkOp::UpsertInodeXattrs { id: event.id, xattrs },
            )?,
        }
    }
    debug!(
        "lowered {} event(s) into {} bulk op(s)",
        plan.event_count,
        plan.ops.len()
    );
    Ok(plan)
}

fn try_push(ops: &mut Vec<BulkOp>, op: BulkOp) -> Result<()> {
    ops.try_reserve(1).map_err(|_| Error::OutOfMemory)?;
    ops.push(op);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::FromStdIter;

    #[test]
    fn s6_link_lowers_to_unlink_then_link() {
        let id = Identifier(vec![1]);
        let parent = Identifier(vec![0]);
        let mut events =
            FromStdIter(vec![FilesystemEvent::link(id.clone(), parent.clone(), "a")].into_iter());
        let plan = plan_bulk(&mut events).unwrap();
        assert_eq!(plan.event_count, 1);
        assert_eq!(
            plan.ops,
            vec![
                BulkOp::UnlinkEdge {
                    id: id.clone(),
                    parent_id: parent.clone(),
                    name: "a".into(),
                },
                BulkOp::LinkEdge {
                    id,
                    parent_id: parent,
                    name: "a".into(),
                },
            ]
        );
    }

    #[test]
    fn delete_lowers_to_a_single_remove_one() {
        let id = Identifier(vec![9]);
        let mut events = FromStdIter(vec![FilesystemEvent::delete(id.clone())].into_iter());
        let plan = plan_bulk(&mut events).unwrap();
        assert_eq!(plan.ops, vec![BulkOp::RemoveOne(id)]);
        assert_eq!(plan.event_count, 1);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut events = FromStdIter(Vec::<FilesystemEvent>::new().into_iter());
        let plan = plan_bulk(&mut events).unwrap();
        assert!(plan.ops.is_empty());
        assert_eq!(plan.event_count, 0);
    }
}
