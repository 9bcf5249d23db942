//! Typed command-line parsing.
//!
//! Arguments are declared as a [`Schema`]: ordered, named, defaulted fields
//! with a static [`TypeExpr`] and optional CLI metadata built with
//! [`add_argument`]. [`TypedParser`] registers those fields on a token-parsing
//! [`Engine`], and after every parse it reconciles the loosely-typed output
//! against the declared types, in one of two modes:
//!
//! - non-strict: type mismatches fail, everything else is tolerated;
//! - strict: untyped fields, `None` in non-optional fields, unproduced fields
//!   and undeclared attributes fail too.
//!
//! ```no_run
//! use serde::Deserialize;
//! use typedparser::{Action, Schema, SchemaError, TypedParser, TypedSchema, add_argument};
//!
//! #[derive(Debug, Deserialize)]
//! struct Args {
//!     verbose: Option<i64>,
//!     name: String,
//! }
//!
//! impl TypedSchema for Args {
//!     fn schema() -> Result<Schema, SchemaError> {
//!         Schema::builder("args")
//!             .field(
//!                 "verbose",
//!                 "optional<int>",
//!                 add_argument().shortcut("-v").action(Action::Count),
//!             )
//!             .field("name", "str", add_argument().default("world"))
//!             .build()
//!     }
//! }
//!
//! let args: Args = TypedParser::<Args>::create_parser(true)?.parse_args(["-vv"])?;
//! # Ok::<(), typedparser::Error>(())
//! ```
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod parser;
pub mod path_de;
pub mod reconcile;
pub mod schema;
pub mod types;
pub mod value;

pub use descriptor::{Action, ArgumentDescriptor, Converter, DescriptorError, Nargs, add_argument};
pub use engine::{Engine, EngineError, Slot, SlotKind};
pub use error::{Error, ErrorKind, Result};
pub use parser::{ParseOptions, ParserBuildError, TypedParser};
pub use reconcile::{FromNamespace, Namespace, ReconcileError, Reconciler, parse_typed_args};
pub use schema::file::SchemaDocument;
pub use schema::{Binding, FieldRecord, Schema, SchemaError, Shape, TypedSchema};
pub use types::{Primitive, TypeExpr, TypeExprError};
pub use value::{Record, ValueKind};

/// Reconcile an already-parsed record straight into `T`.
pub fn typed_args<T: TypedSchema>(record: Record, strict: bool) -> Result<T> {
    let schema = T::schema()?;
    let namespace = parse_typed_args(record, &schema, strict)?;
    Ok(namespace.into_typed()?)
}
