//! Parser builder: registers a schema's bound fields on an engine and ties the
//! engine to the reconciliation pass.
use std::ffi::OsString;
use std::marker::PhantomData;

use indexmap::IndexSet;
use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::descriptor::DescriptorError;
use crate::engine::{Engine, EngineError};
use crate::error::Result;
use crate::reconcile::{FromNamespace, Namespace, Reconciler};
use crate::schema::{Binding, Schema, TypedSchema};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Reconciliation policy. Loadable from the `options` table of a schema file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseOptions {
    pub strict: bool,
    /// Accept undeclared record keys even in strict mode.
    pub skip_unknowns: bool,
    /// Widen ints into float fields and accept strings for path fields.
    pub coerce: bool,
}

#[derive(Debug, Error)]
pub enum ParserBuildError {
    #[error("parser `{parser}` rejected field `{field}`: {source}")]
    Rejected {
        parser: String,
        field: String,
        #[source]
        source: EngineError,
    },
    #[error("parser `{parser}` has conflicting destinations: {source}")]
    Inconsistent {
        parser: String,
        #[source]
        source: EngineError,
    },
    #[error("field `{field}`: {source}")]
    InvalidDescriptor {
        field: String,
        #[source]
        source: DescriptorError,
    },
}

/// An engine plus the schema its output is reconciled against.
#[derive(Debug, Clone)]
pub struct TypedParser<T = Namespace> {
    engine: Engine,
    schema: Schema,
    options: ParseOptions,
    known: IndexSet<String>,
    _result: PhantomData<fn() -> T>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions { strict: false, skip_unknowns: false, coerce: true }
    }
}

impl ParseOptions {
    pub fn with_strict(strict: bool) -> Self {
        ParseOptions { strict, ..Self::default() }
    }
}

impl<T: TypedSchema> TypedParser<T> {
    /// Fresh engine named after the schema, with every bound field registered.
    pub fn create_parser(strict: bool) -> Result<Self> {
        let schema = T::schema()?;
        let engine = Engine::new(schema.name());
        Self::assemble(engine, schema, ParseOptions::with_strict(strict))
    }

    /// Register `T`'s bound fields on an existing engine, which may already
    /// carry its own slots, groups and subcommands.
    pub fn from_parser(engine: Engine, strict: bool) -> Result<Self> {
        let schema = T::schema()?;
        Self::assemble(engine, schema, ParseOptions::with_strict(strict))
    }
}

impl TypedParser<Namespace> {
    /// Build from a schema value, e.g. one loaded from a schema document.
    pub fn build(engine: Engine, schema: Schema, options: ParseOptions) -> Result<Self> {
        Self::assemble(engine, schema, options)
    }
}

impl<T> TypedParser<T> {
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    fn assemble(mut engine: Engine, schema: Schema, options: ParseOptions) -> Result<Self> {
        let parser = engine.name().to_string();
        for field in schema.fields() {
            let descriptor = match field.binding() {
                Binding::Argument(descriptor) => descriptor,
                Binding::Unbound { .. } => {
                    debug!(field = field.name(); "Field left to the engine");
                    continue;
                }
            };
            let slot = descriptor.resolve(field.name()).map_err(|source| {
                ParserBuildError::InvalidDescriptor { field: field.name().to_string(), source }
            })?;
            engine.register(slot).map_err(|source| ParserBuildError::Rejected {
                parser: parser.clone(),
                field: field.name().to_string(),
                source,
            })?;
        }
        engine
            .validate()
            .map_err(|source| ParserBuildError::Inconsistent { parser, source })?;
        let known = engine.destinations();
        debug!(
            schema = schema.name(),
            fields = schema.fields().len(),
            destinations = known.len(),
            strict = options.strict;
            "Built typed parser"
        );
        Ok(TypedParser { engine, schema, options, known, _result: PhantomData })
    }
}

impl<T: FromNamespace> TypedParser<T> {
    /// Parse raw tokens (no program name) into the result type.
    pub fn parse_args<I, S>(&self, tokens: I) -> Result<T>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString> + Clone,
    {
        let namespace = self.parse_namespace(tokens)?;
        Ok(T::from_namespace(namespace)?)
    }

    pub fn parse_namespace<I, S>(&self, tokens: I) -> Result<Namespace>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString> + Clone,
    {
        let record = self.engine.parse(tokens)?;
        let namespace = Reconciler::new(&self.schema, self.options)
            .known(self.known.iter().cloned())
            .reconcile(record)?;
        Ok(namespace)
    }
}
