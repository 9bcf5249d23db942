//! Conformance of one loosely-typed value against a declared type.
use serde_json::{Number, Value};

use super::ReconcileError;
use crate::types::{Primitive, TypeExpr};
use crate::value::{ValueKind, kind_of};

pub(super) struct Conform<'a> {
    pub field: &'a str,
    pub strict: bool,
    pub coerce: bool,
}

impl Conform<'_> {
    pub fn value(&self, ty: &TypeExpr, value: Value) -> Result<Value, ReconcileError> {
        match (ty, value) {
            (TypeExpr::Untyped | TypeExpr::Primitive(Primitive::Any), value) => Ok(value),
            (TypeExpr::Optional(_), Value::Null) => Ok(Value::Null),
            (TypeExpr::Optional(inner), value) => self.value(inner, value),
            (ty, Value::Null) if self.strict => Err(ReconcileError::NullForNonOptional {
                field: self.field.to_string(),
                expected: ty.clone(),
            }),
            // tolerated outside strict mode
            (_, Value::Null) => Ok(Value::Null),
            (TypeExpr::Sequence(item), Value::Array(items)) => items
                .into_iter()
                .map(|element| self.value(item, element))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (TypeExpr::Primitive(primitive), value) => self.primitive(ty, *primitive, value),
            (ty, value) => Err(self.mismatch(ty, &value)),
        }
    }

    fn primitive(
        &self,
        ty: &TypeExpr,
        primitive: Primitive,
        value: Value,
    ) -> Result<Value, ReconcileError> {
        let kind = kind_of(&value);
        match (primitive, kind) {
            (Primitive::Bool, ValueKind::Bool)
            | (Primitive::Int, ValueKind::Int)
            | (Primitive::Float, ValueKind::Float)
            | (Primitive::Str, ValueKind::Str) => Ok(value),
            (Primitive::Float, ValueKind::Int) if self.coerce => value
                .as_f64()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| self.mismatch(ty, &value)),
            (Primitive::Path, ValueKind::Str) if self.coerce => Ok(value),
            _ => Err(self.mismatch(ty, &value)),
        }
    }

    fn mismatch(&self, ty: &TypeExpr, value: &Value) -> ReconcileError {
        ReconcileError::TypeMismatch {
            field: self.field.to_string(),
            expected: ty.clone(),
            found: kind_of(value),
            value: value.clone(),
        }
    }
}
