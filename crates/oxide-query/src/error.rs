//! Error types for query construction.

use thiserror::Error;

/// Errors raised while building a query.
///
/// Every variant is a construction error: the query is malformed and is
/// rejected before anything reaches the store.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A string used against an identifier field is not a valid ObjectId.
    #[error("invalid object id '{value}' for field '{field}'")]
    InvalidObjectId {
        /// Field the identifier was given for.
        field: String,
        /// The offending string.
        value: String,
    },

    /// The operator suffix of a key is not recognized.
    #[error("unknown operator '{op}' in key '{key}'")]
    UnknownOperator {
        /// Full key as supplied.
        key: String,
        /// The unrecognized operator token.
        op: String,
    },

    /// The operand has the wrong shape for its operator.
    #[error("invalid value for '{key}': expected {expected}")]
    InvalidValue {
        /// Full key as supplied.
        key: String,
        /// Description of the accepted shape.
        expected: &'static str,
    },

    /// A geo operand violates its shape invariants.
    #[error("invalid geo argument for '{op}': {reason}")]
    InvalidGeo {
        /// Geo operator token.
        op: &'static str,
        /// What is wrong with the argument.
        reason: String,
    },

    /// An element-match sub-query compiled to an empty filter.
    #[error("element match on '{0}' has no conditions")]
    EmptyMatch(String),

    /// Negation was requested on a combinator key.
    #[error("'~' is not supported on combinator key '{0}'")]
    NegatedCombinator(String),

    /// A combinator key carries a value that is neither a condition map,
    /// a query, nor a list of those.
    #[error("combinator '{key}' expects {expected}")]
    InvalidCombinator {
        /// The combinator key (`$and`, `$or`, `$nor`).
        key: String,
        /// Description of the accepted shape.
        expected: &'static str,
    },

    /// A resolved relationship was attached to a key with an operator suffix.
    #[error("relationship key '{0}' must not contain '__'")]
    RefKeyWithOperator(String),

    /// Negation of a predicate that produced no clauses.
    #[error("cannot negate empty predicate '{0}'")]
    EmptyNegation(String),

    /// JSON input that cannot be expressed as a condition map.
    #[error("invalid JSON condition: {0}")]
    InvalidJson(String),
}

/// Result type alias for query construction.
pub type Result<T> = std::result::Result<T, QueryError>;
