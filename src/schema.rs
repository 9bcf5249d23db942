//! Field metadata: the ordered, named, defaulted fields of a result schema.
//!
//! A [`Schema`] is the single source of truth for both slot registration and
//! post-parse reconciliation. Rust types expose theirs through [`TypedSchema`];
//! schema documents on disk are loaded by [`file`].
pub mod file;

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::descriptor::ArgumentDescriptor;
use crate::path_de::PathError;
use crate::types::{TypeExpr, TypeExprError};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// How a field gets its value.
#[derive(Debug, Clone)]
pub enum Binding {
    /// Not registered by the builder; the value comes from whatever the engine
    /// produces under the field's name, else `default`.
    Unbound { default: Value },
    Argument(ArgumentDescriptor),
}

#[derive(Debug, Clone)]
pub struct FieldRecord {
    name: String,
    declared_type: TypeExpr,
    binding: Binding,
}

/// Whether reconciled namespaces may carry attributes no field declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    #[default]
    Closed,
    Open,
}

#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    shape: Shape,
    fields: Vec<FieldRecord>,
}

#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    shape: Shape,
    pending: Vec<(String, Result<TypeExpr, TypeExprError>, Binding)>,
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
    #[error("invalid field name `{0}`")]
    InvalidFieldName(String),
    #[error("field `{field}`: {source}")]
    InvalidType {
        field: String,
        #[source]
        source: TypeExprError,
    },
    #[error("malformed schema document at {path}: {message}")]
    Malformed { path: String, message: String },
}

/// Implemented by result types that can describe their own fields.
///
/// The `Deserialize` half builds the value from a reconciled namespace.
pub trait TypedSchema: DeserializeOwned {
    fn schema() -> Result<Schema, SchemaError>;
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Binding {
    pub fn unbound(default: impl Into<Value>) -> Self {
        Binding::Unbound { default: default.into() }
    }

    pub fn descriptor(&self) -> Option<&ArgumentDescriptor> {
        match self {
            Binding::Argument(descriptor) => Some(descriptor),
            Binding::Unbound { .. } => None,
        }
    }
}

impl From<ArgumentDescriptor> for Binding {
    fn from(descriptor: ArgumentDescriptor) -> Self {
        Binding::Argument(descriptor)
    }
}

impl From<Value> for Binding {
    fn from(default: Value) -> Self {
        Binding::Unbound { default }
    }
}

impl FieldRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &TypeExpr {
        &self.declared_type
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn is_annotated(&self) -> bool {
        self.declared_type.is_annotated()
    }

    /// Value used when the engine produced nothing for this field.
    pub fn default(&self) -> Value {
        match &self.binding {
            Binding::Unbound { default } => default.clone(),
            Binding::Argument(descriptor) => {
                descriptor.default_value().cloned().unwrap_or(Value::Null)
            }
        }
    }

    /// Record key the engine stores this field's value under.
    pub fn destination(&self) -> &str {
        self.binding
            .descriptor()
            .and_then(ArgumentDescriptor::explicit_dest)
            .unwrap_or(&self.name)
    }
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder { name: name.into(), shape: Shape::Closed, pending: Vec::new() }
    }

    /// Load a schema document, ignoring its `options` table.
    pub fn from_json_str(src: &str) -> Result<Schema, SchemaError> {
        file::SchemaDocument::from_json_str(src).map(|doc| doc.schema)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn fields(&self) -> &[FieldRecord] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldRecord> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl SchemaBuilder {
    /// Declare a field with a textual type (`int`, `optional<list<str>>`, ...).
    pub fn field(mut self, name: impl Into<String>, ty: &str, binding: impl Into<Binding>) -> Self {
        self.pending.push((name.into(), ty.parse(), binding.into()));
        self
    }

    pub fn typed(
        mut self,
        name: impl Into<String>,
        ty: TypeExpr,
        binding: impl Into<Binding>,
    ) -> Self {
        self.pending.push((name.into(), Ok(ty), binding.into()));
        self
    }

    pub fn untyped(self, name: impl Into<String>, binding: impl Into<Binding>) -> Self {
        self.typed(name, TypeExpr::Untyped, binding)
    }

    pub fn open(mut self) -> Self {
        self.shape = Shape::Open;
        self
    }

    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut fields: Vec<FieldRecord> = Vec::with_capacity(self.pending.len());
        for (name, declared_type, binding) in self.pending {
            if !is_identifier(&name) {
                return Err(SchemaError::InvalidFieldName(name));
            }
            if fields.iter().any(|f| f.name == name) {
                return Err(SchemaError::DuplicateField(name));
            }
            let declared_type = declared_type
                .map_err(|source| SchemaError::InvalidType { field: name.clone(), source })?;
            fields.push(FieldRecord { name, declared_type, binding });
        }
        Ok(Schema { name: self.name, shape: self.shape, fields })
    }
}

impl From<PathError> for SchemaError {
    fn from(err: PathError) -> Self {
        SchemaError::Malformed { path: err.path, message: err.message }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Closed => f.write_str("closed"),
            Shape::Open => f.write_str("open"),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::add_argument;
    use serde_json::json;

    #[test]
    fn keeps_declaration_order() {
        let schema = Schema::builder("cfg")
            .field("zeta", "int", json!(1))
            .field("alpha", "optional<str>", add_argument().default("x"))
            .untyped("mid", Value::Null)
            .build()
            .unwrap();
        let names: Vec<&str> = schema.fields().iter().map(FieldRecord::name).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        assert_eq!(schema.field("alpha").unwrap().default(), json!("x"));
        assert!(!schema.field("mid").unwrap().is_annotated());
        assert_eq!(schema.shape(), Shape::Closed);
    }

    #[test]
    fn destination_follows_explicit_dest() {
        let schema = Schema::builder("cfg")
            .field("out", "str", add_argument().flag("--output").dest("target"))
            .field("plain", "str", add_argument())
            .build()
            .unwrap();
        assert_eq!(schema.field("out").unwrap().destination(), "target");
        assert_eq!(schema.field("plain").unwrap().destination(), "plain");
    }

    #[test]
    fn rejects_bad_declarations() {
        let dup = Schema::builder("cfg")
            .field("a", "int", Value::Null)
            .field("a", "str", Value::Null)
            .build();
        assert!(matches!(dup, Err(SchemaError::DuplicateField(name)) if name == "a"));

        let bad_name = Schema::builder("cfg").field("1a", "int", Value::Null).build();
        assert!(matches!(bad_name, Err(SchemaError::InvalidFieldName(_))));

        let bad_type = Schema::builder("cfg").field("a", "complex", Value::Null).build();
        assert!(matches!(bad_type, Err(SchemaError::InvalidType { field, .. }) if field == "a"));
    }
}
