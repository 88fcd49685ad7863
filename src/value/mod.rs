//! The runtime value model the interpreter evaluates expressions into.
//!
//! A tagged union over primitives, ordered containers, two sentinels
//! (disabler, unset) and a family of opaque "holder" objects standing
//! in for build primitives (targets, dependencies, compilers, ...).
//! Holders share one reference-counted handle type so that storing the
//! same holder in two variables preserves identity, matching the way
//! `legacy_src/commands/query_engine/value.rs` treats its own `Value`
//! as a plain tagged union with an exhaustive match site rather than
//! virtual dispatch.

pub mod holder;

pub use holder::{Holder, HolderKind, HolderObject, HolderRef, MethodError};

use indexmap::IndexMap;
use std::fmt;

#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Dict(IndexMap<String, Value>),
    Holder(HolderRef),
    /// Propagates through any containing expression; see
    /// [`Value::is_disabler`] and the disabler-absorption rules
    /// implemented in the interpreter's expression evaluator.
    Disabler,
    Unset,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            (Value::Holder(a), Value::Holder(b)) => a.id() == b.id(),
            (Value::Disabler, Value::Disabler) => true,
            (Value::Unset, Value::Unset) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, "]")
            }
            Value::Dict(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v:?}")?;
                }
                write!(f, "}}")
            }
            Value::Holder(h) => write!(f, "<{}>", h.kind().type_name()),
            Value::Disabler => write!(f, "<disabler>"),
            Value::Unset => write!(f, "<unset>"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Holder(h) => h.kind().type_name(),
            Value::Disabler => "disabler",
            Value::Unset => "unset",
        }
    }

    pub fn is_disabler(&self) -> bool {
        matches!(self, Value::Disabler)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    /// Project-DSL truthiness: only `bool` is a valid condition. Callers
    /// that need a strict boolean (`if`/`elif`/`and`/`or`/`not`) should
    /// use [`Value::as_bool`] and error on `None` rather than calling
    /// this; it exists for the handful of contexts (argument schema
    /// validation reporting) that want a type name instead of a panic.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_holder(&self) -> Option<&HolderRef> {
        match self {
            Value::Holder(h) => Some(h),
            _ => None,
        }
    }

    /// `+=` semantics: defined for int, string,
    /// list (concatenation), dict (merge, right wins). Any other
    /// combination, or either side being a disabler, is an error
    /// surfaced by the interpreter rather than here.
    pub fn checked_add(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a + b)),
            (Value::Str(a), Value::Str(b)) => Some(Value::Str(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => {
                let mut out = a.clone();
                out.extend(b.iter().cloned());
                Some(Value::List(out))
            }
            (Value::List(a), b) => {
                let mut out = a.clone();
                out.push(b.clone());
                Some(Value::List(out))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                let mut out = a.clone();
                for (k, v) in b.iter() {
                    out.insert(k.clone(), v.clone());
                }
                Some(Value::Dict(out))
            }
            _ => None,
        }
    }
}
