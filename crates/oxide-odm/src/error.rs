//! Error types for the ODM.

use oxide_query::QueryError;
use thiserror::Error;

/// ODM-specific errors.
#[derive(Debug, Error)]
pub enum OdmError {
    /// Malformed query input.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The same table name was registered twice.
    #[error("table '{0}' is already registered")]
    DuplicateTable(String),

    /// The same record shape was registered under two tables.
    #[error("shape '{shape}' is already registered as table '{table}'")]
    DuplicateShape {
        /// Type name of the shape.
        shape: &'static str,
        /// Table it was first registered under.
        table: String,
    },

    /// A relationship field name contains the operator separator.
    #[error("relationship field '{field}' on table '{table}' must not contain '__'")]
    InvalidRelationField {
        /// Owning table.
        table: String,
        /// Offending field name.
        field: String,
    },

    /// A relationship field is declared more than once on one shape.
    #[error("relationship field '{field}' on table '{table}' is declared twice")]
    DuplicateRelationField {
        /// Owning table.
        table: String,
        /// Repeated field name.
        field: String,
    },

    /// A relationship points at a shape that was never registered.
    #[error("relationship '{table}.{field}' targets unregistered shape '{shape}'")]
    UnresolvedTarget {
        /// Owning table.
        table: String,
        /// Relationship field.
        field: String,
        /// Type name of the missing target shape.
        shape: &'static str,
    },

    /// The process-wide registry was installed twice.
    #[error("reference registry is already installed")]
    AlreadyInstalled,

    /// The process-wide registry was read before being installed.
    #[error("reference registry is not installed")]
    NotInstalled,

    /// A record type has no table in the registry.
    #[error("shape '{0}' is not registered")]
    UnregisteredShape(&'static str),

    /// A reference points at a different table than its record type.
    #[error("reference points at table '{found}', expected '{expected}'")]
    TableMismatch {
        /// Table registered for the record type.
        expected: String,
        /// Table stored in the reference.
        found: String,
    },

    /// A record without an identifier was used to build a reference.
    #[error("record in table '{0}' has no identifier")]
    MissingId(String),

    /// A relationship field was given something other than a condition map.
    #[error("relationship '{table}.{field}' expects a condition map")]
    RefCondition {
        /// Owning table.
        table: String,
        /// Relationship field.
        field: String,
    },

    /// A relationship sub-query has no conditions.
    #[error("relationship '{table}.{field}' has an empty sub-query")]
    EmptyRefQuery {
        /// Owning table.
        table: String,
        /// Relationship field.
        field: String,
    },

    /// A stored document could not be decoded into the record type.
    #[error("failed to decode document: {0}")]
    Decode(#[from] bson::de::Error),

    /// Invalid page, page size or limit.
    #[error("invalid paging: {0}")]
    InvalidPaging(String),

    /// Error raised by the document store.
    #[error(transparent)]
    Store(Box<dyn std::error::Error + Send + Sync>),
}

impl OdmError {
    /// Wraps a store error without altering its message.
    pub fn store(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Store(err.into())
    }
}

/// Result type alias for ODM operations.
pub type Result<T> = std::result::Result<T, OdmError>;
