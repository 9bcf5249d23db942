use thiserror::Error;

use crate::engine::EngineError;
use crate::parser::ParserBuildError;
use crate::reconcile::ReconcileError;
use crate::schema::SchemaError;

/// Error category, independent of which layer raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The schema itself is unusable.
    Schema,
    /// The engine refused a slot while the parser was being built.
    ParserBuild,
    /// Raw tokens did not match the registered slots.
    Usage,
    /// A declared field has no value and nothing could produce one.
    Attribute,
    /// A value does not conform to its declared type.
    Type,
    /// The parse produced attributes the schema does not declare.
    Key,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    ParserBuild(#[from] ParserBuildError),
    #[error(transparent)]
    Usage(#[from] EngineError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Schema(_) => ErrorKind::Schema,
            Error::ParserBuild(_) => ErrorKind::ParserBuild,
            Error::Usage(_) => ErrorKind::Usage,
            Error::Reconcile(err) => err.kind(),
        }
    }
}
