use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ReconcileError;
use crate::path_de;
use crate::schema::TypedSchema;
use crate::value::Record;

/// Reconciled values in declared field order, plus extra attributes kept for
/// open schemas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    values: Record,
    extras: Record,
}

/// Result types a reconciled namespace can be turned into.
pub trait FromNamespace: Sized {
    fn from_namespace(namespace: Namespace) -> Result<Self, ReconcileError>;
}

impl Namespace {
    pub(super) fn new(values: Record, extras: Record) -> Self {
        Namespace { values, extras }
    }

    /// Field value, or an extra attribute of the same name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).or_else(|| self.extras.get(name))
    }

    pub fn values(&self) -> &Record {
        &self.values
    }

    pub fn extras(&self) -> &Record {
        &self.extras
    }

    pub fn len(&self) -> usize {
        self.values.len() + self.extras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_value(&self) -> Value {
        self.clone().into_value()
    }

    /// Fields first, then extras.
    pub fn into_value(self) -> Value {
        let mut out = self.values;
        out.extend(self.extras);
        Value::Object(out)
    }

    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ReconcileError> {
        path_de::from_value_with_path(self.into_value()).map_err(|err| ReconcileError::Construct {
            path: err.path,
            message: err.message,
        })
    }
}

impl FromNamespace for Namespace {
    fn from_namespace(namespace: Namespace) -> Result<Self, ReconcileError> {
        Ok(namespace)
    }
}

impl<T: TypedSchema> FromNamespace for T {
    fn from_namespace(namespace: Namespace) -> Result<Self, ReconcileError> {
        namespace.into_typed()
    }
}
