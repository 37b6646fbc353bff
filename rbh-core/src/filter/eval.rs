//! Reference evaluation of a [`Filter`] against an [`Entry`].
//!
//! This is *not* part of the backend contract (spec.md keeps "translation
//! to a concrete backend query dialect" backend-defined) — it exists so the
//! in-memory reference backend (`backend::memory`) and the property tests
//! in `filter.rs`/`query.rs` have something to run filters against, the
//! same role `data_skipping_filter` plays for the teacher's Parquet stats
//! (`kernel/src/scan/data_skipping.rs`), just evaluated row-by-row instead
//! of as a vectorized Arrow predicate.

use std::cmp::Ordering;

use crate::entry::Entry;
use crate::error::Result;
use crate::filter::{CompareOp, Field, Filter, LogicalOp};
use crate::value::{Value, ValueKind};

impl Filter {
    /// Evaluates this filter against `entry`. Ordering comparisons on
    /// regex/map values and comparisons against an unpopulated field always
    /// evaluate to `false` — per spec.md §4.3, cross-backend consistency for
    /// those cases isn't guaranteed, and this reference evaluator picks the
    /// conservative answer.
    pub fn matches(&self, entry: &Entry) -> Result<bool> {
        Ok(match self {
            Filter::Null => true,
            Filter::Logical { op, children } => match op {
                LogicalOp::And => {
                    for child in children {
                        if !child.matches(entry)? {
                            return Ok(false);
                        }
                    }
                    true
                }
                LogicalOp::Or => {
                    for child in children {
                        if child.matches(entry)? {
                            return Ok(true);
                        }
                    }
                    false
                }
                LogicalOp::Not => !children[0].matches(entry)?,
            },
            Filter::Comparison { op, field, value } => match extract_field(entry, field) {
                Some(field_value) => evaluate(*op, &field_value, value),
                None => false,
            },
        })
    }
}

fn extract_field(entry: &Entry, field: &Field) -> Option<Value> {
    match field {
        Field::Id => Some(Value::Binary(entry.id.as_bytes().to_vec())),
        Field::ParentId => entry
            .parent_id
            .as_ref()
            .map(|p| Value::Binary(p.as_bytes().to_vec())),
        Field::Name => entry.name.clone().map(Value::String),
        Field::Type => Some(Value::String(
            if entry.symlink.is_some() {
                "symlink"
            } else {
                "unknown"
            }
            .to_owned(),
        )),
        Field::Atime => entry
            .statx
            .as_ref()
            .map(|s| Value::Int64(s.atime.seconds)),
        Field::Mtime => entry
            .statx
            .as_ref()
            .map(|s| Value::Int64(s.mtime.seconds)),
        Field::Ctime => entry
            .statx
            .as_ref()
            .map(|s| Value::Int64(s.ctime.seconds)),
        Field::Size => entry.statx.as_ref().map(|s| Value::UInt64(s.size)),
        Field::Mode => entry.statx.as_ref().map(|s| Value::UInt32(s.mode)),
        Field::Owner => entry.statx.as_ref().map(|s| Value::UInt32(s.uid)),
        Field::Group => entry.statx.as_ref().map(|s| Value::UInt32(s.gid)),
        Field::Namespace => {
            if entry.namespace.is_empty() {
                None
            } else {
                Some(Value::sequence(entry.namespace.iter().map(|edge| {
                    Value::String(format!(
                        "{}/{}",
                        hex(edge.parent_id.as_bytes()),
                        edge.name
                    ))
                })))
            }
        }
        // The reference entry model carries no xattr map of its own (xattrs
        // only ever arrive as events, see event.rs); a real backend's
        // storage mapping is out of scope (spec.md §1).
        Field::Xattr(_) => None,
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn evaluate(op: CompareOp, field_value: &Value, filter_value: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(field_value, filter_value),
        CompareOp::Lt => matches!(compare(field_value, filter_value), Some(Ordering::Less)),
        CompareOp::Le => !matches!(compare(field_value, filter_value), None | Some(Ordering::Greater)),
        CompareOp::Gt => matches!(compare(field_value, filter_value), Some(Ordering::Greater)),
        CompareOp::Ge => !matches!(compare(field_value, filter_value), None | Some(Ordering::Less)),
        CompareOp::Matches => match (field_value, filter_value) {
            (Value::String(s), Value::Regex { pattern, flags }) => regex_matches(pattern, *flags, s),
            _ => false,
        },
        CompareOp::In => match filter_value {
            Value::Sequence(items) => items.iter().any(|item| values_equal(field_value, item)),
            _ => false,
        },
        CompareOp::BitsAnySet => bitwise(field_value, filter_value, |a, b| a & b != 0),
        CompareOp::BitsAllSet => bitwise(field_value, filter_value, |a, b| a & b == b),
        CompareOp::BitsAnyClear => bitwise(field_value, filter_value, |a, b| a & b != b),
        CompareOp::BitsAllClear => bitwise(field_value, filter_value, |a, b| a & b == 0),
    }
}

fn bitwise(field_value: &Value, filter_value: &Value, f: impl Fn(u64, u64) -> bool) -> bool {
    match (field_value.as_bits(), filter_value.as_bits()) {
        (Some(a), Some(b)) => f(a, b),
        _ => false,
    }
}

fn regex_matches(pattern: &str, flags: crate::value::RegexFlags, haystack: &str) -> bool {
    let built = if flags.contains(crate::value::RegexFlags::CASE_INSENSITIVE) {
        regex::RegexBuilder::new(pattern).case_insensitive(true).build()
    } else {
        regex::RegexBuilder::new(pattern).build()
    };
    // Anchoring is not implicit (spec.md §4.3): a bare `.find` over the
    // whole string is exactly "does the pattern occur somewhere", leaving
    // `^`/`$` entirely up to the caller's pattern.
    built.map(|re| re.is_match(haystack)).unwrap_or(false)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if a.is_integer() && b.is_integer() {
        return as_i128(a) == as_i128(b);
    }
    match (a, b) {
        (Value::Binary(x), Value::Binary(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Regex { pattern: p1, flags: f1 }, Value::Regex { pattern: p2, flags: f2 }) => {
            p1 == p2 && f1 == f2
        }
        (Value::Sequence(x), Value::Sequence(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        // `=` on maps is a submap test: every key in `b` (the filter's
        // value) must be present in `a` (the field) with an equal value.
        // The source implementation of this spec takes the same reading;
        // see DESIGN.md's "map equality" decision.
        (Value::Map(field_map), Value::Map(filter_map)) => filter_map
            .iter()
            .all(|(k, v)| field_map.get(k).is_some_and(|fv| values_equal(fv, v))),
        _ => false,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_integer() && b.is_integer() {
        return as_i128(a).zip(as_i128(b)).map(|(x, y)| x.cmp(&y));
    }
    match (a, b) {
        (Value::Binary(x), Value::Binary(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Sequence(x), Value::Sequence(y)) => {
            for (xi, yi) in x.iter().zip(y.iter()) {
                match compare(xi, yi) {
                    Some(Ordering::Equal) => continue,
                    other => return other,
                }
            }
            Some(x.len().cmp(&y.len()))
        }
        // Regex and map ordering is explicitly backend-defined
        // (spec.md §4.3); this reference evaluator declines to order them.
        _ => None,
    }
}

fn as_i128(v: &Value) -> Option<i128> {
    match *v {
        Value::Int32(v) => Some(v as i128),
        Value::UInt32(v) => Some(v as i128),
        Value::Int64(v) => Some(v as i128),
        Value::UInt64(v) => Some(v as i128),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Identifier, Statx, StatxMask, Timestamp};
    use crate::value::RegexFlags;

    fn entry_with(name: &str, mtime: i64) -> Entry {
        Entry {
            id: Identifier(vec![1]),
            parent_id: Some(Identifier(vec![0])),
            name: Some(name.to_owned()),
            statx: Some(Statx {
                mask: StatxMask::MTIME,
                mtime: Timestamp {
                    seconds: mtime,
                    nanos: 0,
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn s3_and_of_eq_and_ge_matches() {
        let entry = entry_with("foo.c", 1_700_000_001);
        let f = Filter::and(vec![
            Filter::eq(Field::Name, "foo.c"),
            Filter::ge(Field::Mtime, 1_700_000_000i64),
        ]);
        assert!(f.matches(&entry).unwrap());
    }

    #[test]
    fn null_matches_everything_not_null_matches_nothing() {
        let entry = entry_with("x", 0);
        assert!(Filter::null().matches(&entry).unwrap());
        assert!(!Filter::not(Filter::null()).matches(&entry).unwrap());
    }

    #[test]
    fn single_child_logical_identity_holds_semantically() {
        let entry = entry_with("foo.c", 5);
        let leaf = Filter::eq(Field::Name, "foo.c");
        assert_eq!(
            leaf.matches(&entry).unwrap(),
            Filter::and(vec![leaf.clone()]).matches(&entry).unwrap()
        );
        assert_eq!(
            leaf.matches(&entry).unwrap(),
            Filter::or(vec![leaf]).matches(&entry).unwrap()
        );
    }

    #[test]
    fn matches_is_not_implicitly_anchored() {
        let entry = entry_with("foo.c", 0);
        let f = Filter::matches(Field::Name, Value::regex("oo", RegexFlags::empty()));
        assert!(f.matches(&entry).unwrap());
    }

    #[test]
    fn map_equality_is_submap() {
        use indexmap::IndexMap;
        let mut field_map = IndexMap::new();
        field_map.insert("a".to_owned(), Value::Int32(1));
        field_map.insert("b".to_owned(), Value::Int32(2));
        let mut filter_map = IndexMap::new();
        filter_map.insert("a".to_owned(), Value::Int32(1));
        assert!(values_equal(&Value::Map(field_map.clone()), &Value::Map(filter_map)));

        let mut mismatched = IndexMap::new();
        mismatched.insert("a".to_owned(), Value::Int32(99));
        assert!(!values_equal(&Value::Map(field_map), &Value::Map(mismatched)));
    }
}
