//! Loosely-typed values produced by the token-parsing engine.
use std::fmt;

use serde_json::{Map, Value};

/// Destination name → parsed value, in the order the engine produced them.
/// `Value::Null` stands for "present but None".
pub type Record = Map<String, Value>;

/// Runtime kind of a loosely-typed value, used in mismatch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
}

pub fn kind_of(v: &Value) -> ValueKind {
    match v {
        Value::Null => ValueKind::Null,
        Value::Bool(_) => ValueKind::Bool,
        Value::Number(n) if n.is_i64() || n.is_u64() => ValueKind::Int,
        Value::Number(_) => ValueKind::Float,
        Value::String(_) => ValueKind::Str,
        Value::Array(_) => ValueKind::List,
        Value::Object(_) => ValueKind::Map,
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "str",
            ValueKind::List => "list",
            ValueKind::Map => "map",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integral_numbers_are_ints() {
        assert_eq!(kind_of(&json!(3)), ValueKind::Int);
        assert_eq!(kind_of(&json!(u64::MAX)), ValueKind::Int);
        assert_eq!(kind_of(&json!(3.5)), ValueKind::Float);
        assert_eq!(kind_of(&json!(null)), ValueKind::Null);
        assert_eq!(kind_of(&json!(["a"])), ValueKind::List);
    }
}
