//! Filter (predicate) algebra (C3).
//!
//! Builders mirror the teacher's `Expression::eq/lt/and/or` style
//! (`kernel/src/expressions.rs`): each returns an owned node, and logical
//! builders flatten their borrowed children into the new node's own
//! `Vec` — the tree is acyclic and single-owner, the Rust rendering of the
//! "flat allocation owned filter tree" design note.

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

use crate::error::{Error, Result};
use crate::value::{Value, ValueKind};

mod eval;

/// Symbolic, backend-independent entry fields a comparison can reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    ParentId,
    Name,
    Type,
    Atime,
    Mtime,
    Ctime,
    Size,
    Mode,
    Owner,
    Group,
    Namespace,
    /// An extended-attribute key, namespace- or inode-scoped; the map it
    /// addresses is backend-defined.
    Xattr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    Matches,
    In,
    BitsAnySet,
    BitsAllSet,
    BitsAnyClear,
    BitsAllClear,
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Matches => "matches",
            CompareOp::In => "in",
            CompareOp::BitsAnySet => "bits-any-set",
            CompareOp::BitsAllSet => "bits-all-set",
            CompareOp::BitsAnyClear => "bits-any-clear",
            CompareOp::BitsAllClear => "bits-all-clear",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl Display for LogicalOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "AND"),
            LogicalOp::Or => write!(f, "OR"),
            LogicalOp::Not => write!(f, "NOT"),
        }
    }
}

/// An immutable predicate AST node.
///
/// `Filter::Null` is the sentinel matching every entry; it is only valid as
/// the whole filter, never as a child of a logical node (spec.md §3/§4.3).
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Null,
    Comparison {
        op: CompareOp,
        field: Field,
        value: Value,
    },
    Logical {
        op: LogicalOp,
        children: Vec<Filter>,
    },
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Null => write!(f, "TRUE"),
            Filter::Comparison { op, field, value } => {
                write!(f, "{field:?} {op} {value:?}")
            }
            Filter::Logical {
                op: LogicalOp::Not,
                children,
            } => write!(f, "NOT ({})", children[0]),
            Filter::Logical { op, children } => {
                let parts: Vec<String> = children.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(&format!(" {op} ")))
            }
        }
    }
}

impl Filter {
    pub fn null() -> Self {
        Filter::Null
    }

    pub fn comparison(op: CompareOp, field: Field, value: impl Into<Value>) -> Self {
        Filter::Comparison {
            op,
            field,
            value: value.into(),
        }
    }

    pub fn eq(field: Field, value: impl Into<Value>) -> Self {
        Self::comparison(CompareOp::Eq, field, value)
    }

    pub fn lt(field: Field, value: impl Into<Value>) -> Self {
        Self::comparison(CompareOp::Lt, field, value)
    }

    pub fn le(field: Field, value: impl Into<Value>) -> Self {
        Self::comparison(CompareOp::Le, field, value)
    }

    pub fn gt(field: Field, value: impl Into<Value>) -> Self {
        Self::comparison(CompareOp::Gt, field, value)
    }

    pub fn ge(field: Field, value: impl Into<Value>) -> Self {
        Self::comparison(CompareOp::Ge, field, value)
    }

    pub fn matches(field: Field, value: impl Into<Value>) -> Self {
        Self::comparison(CompareOp::Matches, field, value)
    }

    pub fn in_seq(field: Field, value: impl Into<Value>) -> Self {
        Self::comparison(CompareOp::In, field, value)
    }

    pub fn bits_any_set(field: Field, value: impl Into<Value>) -> Self {
        Self::comparison(CompareOp::BitsAnySet, field, value)
    }

    pub fn bits_all_set(field: Field, value: impl Into<Value>) -> Self {
        Self::comparison(CompareOp::BitsAllSet, field, value)
    }

    pub fn bits_any_clear(field: Field, value: impl Into<Value>) -> Self {
        Self::comparison(CompareOp::BitsAnyClear, field, value)
    }

    pub fn bits_all_clear(field: Field, value: impl Into<Value>) -> Self {
        Self::comparison(CompareOp::BitsAllClear, field, value)
    }

    pub fn and(children: Vec<Filter>) -> Self {
        Filter::Logical {
            op: LogicalOp::And,
            children,
        }
    }

    pub fn or(children: Vec<Filter>) -> Self {
        Filter::Logical {
            op: LogicalOp::Or,
            children,
        }
    }

    pub fn not(child: Filter) -> Self {
        Filter::Logical {
            op: LogicalOp::Not,
            children: vec![child],
        }
    }

    /// The set of fields this filter (transitively) references, used by the
    /// query pipeline to decide whether a namespace unwind is mandatory
    /// (spec.md §4.6). Mirrors `Expression::references()` in the teacher.
    pub fn references(&self) -> HashSet<&Field> {
        let mut set = HashSet::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Filter::Null => {}
                Filter::Comparison { field, .. } => {
                    set.insert(field);
                }
                Filter::Logical { children, .. } => stack.extend(children.iter()),
            }
        }
        set
    }

    /// Checks the compatibility table and structural rules in spec.md §3/§4.3.
    pub fn validate(&self) -> Result<()> {
        self.validate_at_root(true)
    }

    fn validate_at_root(&self, at_root: bool) -> Result<()> {
        match self {
            Filter::Null => {
                if !at_root {
                    return Err(Error::InvalidFilter {
                        node: "null".into(),
                        reason: "the null filter is only valid at the root".into(),
                    });
                }
                Ok(())
            }
            Filter::Comparison { op, value, .. } => validate_operator(*op, value),
            Filter::Logical { op, children } => {
                match op {
                    LogicalOp::Not if children.len() != 1 => {
                        return Err(Error::InvalidFilter {
                            node: "not".into(),
                            reason: format!("not takes exactly one child, got {}", children.len()),
                        });
                    }
                    LogicalOp::And | LogicalOp::Or if children.is_empty() => {
                        return Err(Error::InvalidFilter {
                            node: op.to_string(),
                            reason: format!("{op} requires at least one child"),
                        });
                    }
                    _ => {}
                }
                for child in children {
                    child.validate_at_root(false)?;
                }
                Ok(())
            }
        }
    }
}

fn validate_operator(op: CompareOp, value: &Value) -> Result<()> {
    let kind = value.kind();
    let ok = match op {
        CompareOp::Eq => matches!(
            kind,
            ValueKind::Binary
                | ValueKind::Int32
                | ValueKind::UInt32
                | ValueKind::Int64
                | ValueKind::UInt64
                | ValueKind::String
                | ValueKind::Regex
                | ValueKind::Sequence
                | ValueKind::Map
        ),
        // Ordering operators are syntactically valid for every kind
        // (spec.md §3/§4.3): the compatibility table lists equality *and*
        // order for binary/int/string/regex/sequence/map alike, with only
        // the comparison *outcome* on non-integers left backend-defined,
        // not its validity.
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => true,
        CompareOp::Matches => matches!(kind, ValueKind::Regex),
        CompareOp::In => matches!(kind, ValueKind::Sequence),
        CompareOp::BitsAnySet
        | CompareOp::BitsAllSet
        | CompareOp::BitsAnyClear
        | CompareOp::BitsAllClear => value.is_integer(),
    };
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidFilter {
            node: op.to_string(),
            reason: format!("operator {op} is not valid for a value of kind {kind:?}"),
        })
    }
}
