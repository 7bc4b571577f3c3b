//! Expression nodes and operator tokens.

use std::fmt;

use bson::{Bson, Document};

/// Store-native operators a predicate can compile to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `$eq`
    Eq,
    /// `$ne`
    Ne,
    /// `$gt`
    Gt,
    /// `$gte`
    Gte,
    /// `$lt`
    Lt,
    /// `$lte`
    Lte,
    /// `$in`
    In,
    /// `$all`
    All,
    /// `$nin`
    Nin,
    /// `$size`
    Size,
    /// `$exists`
    Exists,
    /// `$mod`
    Mod,
    /// `$elemMatch`
    ElemMatch,
    /// Regular expression; the operand is already a `{$regex, $options}`
    /// document and is inlined as the field's condition.
    Regex,
    /// `$geoWithin`
    GeoWithin,
    /// `$geoIntersects`
    GeoIntersects,
    /// `$near`
    Near,
    /// `$nearSphere`
    NearSphere,
}

impl Operator {
    /// Maps a plain comparison token to its operator.
    ///
    /// Pattern and geo tokens are handled by the translator and are not
    /// recognized here.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "in" => Self::In,
            "all" => Self::All,
            "nin" => Self::Nin,
            "size" => Self::Size,
            "exists" => Self::Exists,
            "mod" => Self::Mod,
            "regex" => Self::Regex,
            _ => return None,
        };
        Some(op)
    }

    /// Returns the store operator name, including the `$` prefix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::In => "$in",
            Self::All => "$all",
            Self::Nin => "$nin",
            Self::Size => "$size",
            Self::Exists => "$exists",
            Self::Mod => "$mod",
            Self::ElemMatch => "$elemMatch",
            Self::Regex => "$regex",
            Self::GeoWithin => "$geoWithin",
            Self::GeoIntersects => "$geoIntersects",
            Self::Near => "$near",
            Self::NearSphere => "$nearSphere",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of a query's expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    /// `field op operand`
    Predicate {
        /// Dotted field path.
        field: String,
        /// Operator.
        op: Operator,
        /// Operand, already in store-native form.
        operand: Bson,
    },
    /// `$not` around a single node.
    Not(Box<ExprNode>),
    /// `$or` over branches.
    Or(Vec<ExprNode>),
    /// `$nor` over branches.
    Nor(Vec<ExprNode>),
    /// A compiled branch: its clause documents, implicitly AND-ed.
    And(Vec<Document>),
}

impl ExprNode {
    /// Creates a predicate node.
    pub fn predicate(field: impl Into<String>, op: Operator, operand: Bson) -> Self {
        Self::Predicate {
            field: field.into(),
            op,
            operand,
        }
    }

    /// Wraps this node in `$not`.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }
}
