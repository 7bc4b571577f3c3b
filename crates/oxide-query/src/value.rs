//! Query operand values.
//!
//! A [`Value`] is what the right-hand side of a DSL key may hold: a plain
//! BSON operand, a nested condition map, a pre-built query, a list of those,
//! or a relationship predicate that has already been resolved to ids.

use std::fmt;

use bson::oid::ObjectId;
use bson::{Bson, Document};

use crate::cond::Cond;
use crate::query::Query;

/// An operand in the query DSL.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Scalar, array or opaque native document, passed to the store as-is.
    Bson(Bson),
    /// Nested condition map (combinator branch, element match, relationship).
    Cond(Cond),
    /// Pre-built query.
    Query(Query),
    /// Sequence of condition maps and/or queries.
    List(Vec<Value>),
    /// Relationship predicate resolved to a concrete id set.
    Ref(ResolvedRef),
}

impl Value {
    /// Builds a list value.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Returns the BSON operand, if this is one.
    #[must_use]
    pub fn as_bson(&self) -> Option<&Bson> {
        match self {
            Self::Bson(b) => Some(b),
            _ => None,
        }
    }
}

/// How resolved foreign ids are compared against a reference array field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// The field holds at least one of the ids.
    #[default]
    Default,
    /// The field holds every id.
    All,
    /// The field holds exactly the ids, no more and no fewer.
    Match,
}

impl MatchMode {
    /// Parses the annotation spelling (`def`, `all`, `match`).
    ///
    /// Anything unrecognized falls back to [`MatchMode::Default`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "all" => Self::All,
            "match" => Self::Match,
            _ => Self::Default,
        }
    }

    /// Returns the annotation spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "def",
            Self::All => "all",
            Self::Match => "match",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ids found by a relationship sub-query, with the mode to apply them under.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRef {
    /// Identifiers of the matching target records.
    pub ids: Vec<Bson>,
    /// Comparison policy.
    pub mode: MatchMode,
}

impl ResolvedRef {
    /// Creates a resolved reference.
    pub fn new(ids: Vec<Bson>, mode: MatchMode) -> Self {
        Self { ids, mode }
    }
}

macro_rules! impl_from_bson {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::Bson(Bson::from(v))
                }
            }
        )+
    };
}

impl_from_bson!(
    bool,
    i32,
    i64,
    f32,
    f64,
    &str,
    String,
    ObjectId,
    Document,
    Vec<bool>,
    Vec<i32>,
    Vec<i64>,
    Vec<f64>,
    Vec<&str>,
    Vec<String>,
    Vec<ObjectId>,
    Vec<Bson>,
    Vec<Vec<f64>>,
    Vec<Vec<Vec<f64>>>,
    Vec<Vec<Vec<Vec<f64>>>>,
);

impl From<Bson> for Value {
    fn from(v: Bson) -> Self {
        Self::Bson(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Self::Bson(Bson::String(v.clone()))
    }
}

impl From<Cond> for Value {
    fn from(c: Cond) -> Self {
        Self::Cond(c)
    }
}

impl From<Query> for Value {
    fn from(q: Query) -> Self {
        Self::Query(q)
    }
}

impl From<ResolvedRef> for Value {
    fn from(r: ResolvedRef) -> Self {
        Self::Ref(r)
    }
}

impl From<Vec<Cond>> for Value {
    fn from(v: Vec<Cond>) -> Self {
        Self::list(v)
    }
}

impl From<Vec<Query>> for Value {
    fn from(v: Vec<Query>) -> Self {
        Self::list(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}
