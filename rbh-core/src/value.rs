//! Tagged value types (C3).

use bitflags::bitflags;
use indexmap::IndexMap;

bitflags! {
    /// Regex option flags. At minimum, case-insensitive matching (spec.md §3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RegexFlags: u32 {
        const CASE_INSENSITIVE = 1 << 0;
    }
}

/// A filesystem-metadata value.
///
/// Mirrors the teacher's `Expression::Literal(Scalar)` leaf, generalized
/// from SQL scalars to the comparison/logical taxonomy of spec.md §3.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Binary(Vec<u8>),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    String(String),
    /// Pattern plus option flags. Not compiled eagerly: the pattern/flags
    /// pair must survive validation and, in principle, a backend boundary
    /// untouched; a backend compiles it lazily when it needs to evaluate.
    Regex { pattern: String, flags: RegexFlags },
    Sequence(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn regex(pattern: impl Into<String>, flags: RegexFlags) -> Self {
        Value::Regex {
            pattern: pattern.into(),
            flags,
        }
    }

    pub const fn kind(&self) -> ValueKind {
        match self {
            Value::Binary(_) => ValueKind::Binary,
            Value::Int32(_) => ValueKind::Int32,
            Value::UInt32(_) => ValueKind::UInt32,
            Value::Int64(_) => ValueKind::Int64,
            Value::UInt64(_) => ValueKind::UInt64,
            Value::String(_) => ValueKind::String,
            Value::Regex { .. } => ValueKind::Regex,
            Value::Sequence(_) => ValueKind::Sequence,
            Value::Map(_) => ValueKind::Map,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.kind(),
            ValueKind::Int32 | ValueKind::UInt32 | ValueKind::Int64 | ValueKind::UInt64
        )
    }

    /// `self` as a 64-bit bit-vector, for the bitwise operators. Only valid
    /// for integer kinds; callers must check [`Value::is_integer`] first.
    pub fn as_bits(&self) -> Option<u64> {
        match *self {
            Value::Int32(v) => Some(v as u32 as u64),
            Value::UInt32(v) => Some(v as u64),
            Value::Int64(v) => Some(v as u64),
            Value::UInt64(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Binary,
    Int32,
    UInt32,
    Int64,
    UInt64,
    String,
    Regex,
    Sequence,
    Map,
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl Value {
    pub fn sequence(values: impl IntoIterator<Item = Value>) -> Self {
        Value::Sequence(values.into_iter().collect())
    }
}
