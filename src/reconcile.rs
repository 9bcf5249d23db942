//! Type reconciliation: the post-parse pass checking a loosely-typed record
//! against the declared schema.
//!
//! Two enforcement modes share the same conformance rules. Strict mode
//! additionally rejects untyped fields, `null` in non-optional fields, fields
//! nothing could have produced, and undeclared record keys.
mod conform;
mod namespace;

pub use namespace::{FromNamespace, Namespace};

use indexmap::IndexSet;
use log::{debug, trace};
use serde_json::Value;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::parser::ParseOptions;
use crate::schema::{FieldRecord, Schema, Shape};
use crate::types::TypeExpr;
use crate::value::{Record, ValueKind};
use conform::Conform;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("field `{field}` was not produced by the parser and nothing could produce it")]
    MissingField { field: String },
    #[error("field `{field}` has no declared type")]
    UntypedField { field: String },
    #[error("field `{field}` is `{expected}` but got None")]
    NullForNonOptional { field: String, expected: TypeExpr },
    #[error("field `{field}`: expected `{expected}`, found {found} `{value}`")]
    TypeMismatch {
        field: String,
        expected: TypeExpr,
        found: ValueKind,
        value: Value,
    },
    #[error("unknown attributes: {}", .0.join(", "))]
    UnknownAttributes(Vec<String>),
    #[error("cannot construct result at {path}: {message}")]
    Construct { path: String, message: String },
}

/// Reconciles records against one schema.
#[derive(Debug, Clone)]
pub struct Reconciler<'a> {
    schema: &'a Schema,
    options: ParseOptions,
    known: IndexSet<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::MissingField { .. } => ErrorKind::Attribute,
            ReconcileError::UntypedField { .. }
            | ReconcileError::NullForNonOptional { .. }
            | ReconcileError::TypeMismatch { .. }
            | ReconcileError::Construct { .. } => ErrorKind::Type,
            ReconcileError::UnknownAttributes(_) => ErrorKind::Key,
        }
    }
}

impl<'a> Reconciler<'a> {
    pub fn new(schema: &'a Schema, options: ParseOptions) -> Self {
        Reconciler { schema, options, known: IndexSet::new() }
    }

    /// Destinations some parser could have produced. An absent known field
    /// falls back to its default even in strict mode.
    pub fn known<I, S>(mut self, destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known.extend(destinations.into_iter().map(Into::into));
        self
    }

    pub fn reconcile(&self, record: Record) -> Result<Namespace, ReconcileError> {
        let strict = self.options.strict;
        let mut values = Record::new();
        let mut consumed = IndexSet::new();

        for field in self.schema.fields() {
            let destination = field.destination();
            consumed.insert(destination);
            let raw = match record.get(destination) {
                Some(value) => value.clone(),
                None if strict && !self.known.contains(destination) => {
                    return Err(ReconcileError::MissingField { field: field.name().to_string() });
                }
                None => {
                    debug!(field = field.name(); "Field absent from record, using default");
                    field.default()
                }
            };
            let value = self.check(field, raw)?;
            values.insert(field.name().to_string(), value);
        }

        let mut extras: Record = record
            .into_iter()
            .filter(|(key, _)| !consumed.contains(key.as_str()))
            .collect();
        if !extras.is_empty() {
            if strict && !self.options.skip_unknowns {
                return Err(ReconcileError::UnknownAttributes(extras.keys().cloned().collect()));
            }
            if self.schema.shape() == Shape::Closed {
                debug!(
                    schema = self.schema.name(),
                    dropped:? = extras.keys().collect::<Vec<_>>();
                    "Dropping attributes a closed schema does not declare"
                );
                extras.clear();
            }
        }

        trace!(schema = self.schema.name(), strict; "Reconciled record");
        Ok(Namespace::new(values, extras))
    }

    fn check(&self, field: &FieldRecord, value: Value) -> Result<Value, ReconcileError> {
        let conform = Conform {
            field: field.name(),
            strict: self.options.strict,
            coerce: self.options.coerce,
        };
        match field.declared_type() {
            TypeExpr::Untyped if self.options.strict => {
                Err(ReconcileError::UntypedField { field: field.name().to_string() })
            }
            ty => conform.value(ty, value),
        }
    }
}

/// Reconcile an already-parsed record without any engine: every absent field
/// counts as unknown.
pub fn parse_typed_args(
    record: Record,
    schema: &Schema,
    strict: bool,
) -> Result<Namespace, ReconcileError> {
    Reconciler::new(schema, ParseOptions::with_strict(strict)).reconcile(record)
}
