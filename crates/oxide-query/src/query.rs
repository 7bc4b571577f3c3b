//! The query builder and filter compiler.
//!
//! Queries are built from DSL keys with [`q`], [`not_q`] and [`mix_q`], then
//! composed with [`Query::and`], [`Query::or`] and [`Query::nor`]. Calling
//! [`Query::cond`] lowers the expression tree into a filter document.

use std::fmt;
use std::slice;

use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use tracing::{debug, trace};

use crate::cond::{is_combinator, Cond};
use crate::error::{QueryError, Result};
use crate::node::{ExprNode, Operator};
use crate::translate::translate;
use crate::value::{MatchMode, ResolvedRef, Value};

/// A composable filter over documents.
///
/// # Example
///
/// ```
/// use oxide_query::{q, Query};
/// use bson::doc;
///
/// let query = Query::new()
///     .and([q("age__gt", 18)?, q("status", "active")?])
///     .or([q("role", "admin")?, q("verified", true)?]);
///
/// assert_eq!(
///     query.cond(),
///     doc! {
///         "age": { "$gt": 18 },
///         "status": { "$eq": "active" },
///         "$and": [
///             { "$or": [
///                 { "role": { "$eq": "admin" } },
///                 { "verified": { "$eq": true } },
///             ] },
///         ],
///     }
/// );
/// # Ok::<(), oxide_query::QueryError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    nodes: Vec<ExprNode>,
    raw: Option<Document>,
}

impl Query {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn from_nodes(nodes: Vec<ExprNode>) -> Self {
        Self { nodes, raw: None }
    }

    /// Creates a query whose compiled filter is exactly `filter`.
    #[must_use]
    pub fn raw(filter: Document) -> Self {
        Self {
            nodes: Vec::new(),
            raw: Some(filter),
        }
    }

    /// Sets or clears the raw filter override.
    ///
    /// A non-empty override is returned verbatim by [`Query::cond`] and the
    /// expression nodes are ignored.
    #[must_use]
    pub fn with_raw(mut self, filter: Option<Document>) -> Self {
        self.raw = filter;
        self
    }

    /// Returns the expression nodes.
    #[must_use]
    pub fn nodes(&self) -> &[ExprNode] {
        &self.nodes
    }

    /// Whether the query has neither nodes nor a raw override.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.as_ref().map_or(true, Document::is_empty) && self.nodes.is_empty()
    }

    /// Appends the nodes of every query, flattening them into this one.
    #[must_use]
    pub fn and<I: IntoIterator<Item = Query>>(mut self, queries: I) -> Self {
        for q in queries {
            self.nodes.extend(q.nodes);
        }
        self
    }

    /// Appends an `$or` over the compiled branches.
    ///
    /// Empty branches are dropped; if none remain the query is unchanged.
    #[must_use]
    pub fn or<I: IntoIterator<Item = Query>>(mut self, branches: I) -> Self {
        let branches = branch_nodes(branches);
        if !branches.is_empty() {
            self.nodes.push(ExprNode::Or(branches));
        }
        self
    }

    /// Appends a `$nor` over the compiled branches.
    ///
    /// Empty branches are dropped; if none remain the query is unchanged.
    #[must_use]
    pub fn nor<I: IntoIterator<Item = Query>>(mut self, branches: I) -> Self {
        let branches = branch_nodes(branches);
        if !branches.is_empty() {
            self.nodes.push(ExprNode::Nor(branches));
        }
        self
    }

    /// A new query holding the conjunction of `queries`.
    #[must_use]
    pub fn all_of<I: IntoIterator<Item = Query>>(queries: I) -> Self {
        Self::new().and(queries)
    }

    /// A new query holding the disjunction of `branches`.
    #[must_use]
    pub fn any_of<I: IntoIterator<Item = Query>>(branches: I) -> Self {
        Self::new().or(branches)
    }

    /// A new query matching none of `branches`.
    #[must_use]
    pub fn none_of<I: IntoIterator<Item = Query>>(branches: I) -> Self {
        Self::new().nor(branches)
    }

    /// Compiles the query into a filter document.
    ///
    /// Pure and repeatable: the same query always yields the same document.
    #[must_use]
    pub fn cond(&self) -> Document {
        match &self.raw {
            Some(raw) if !raw.is_empty() => raw.clone(),
            _ => compile(&self.nodes),
        }
    }

    /// Returns the compiled filter as relaxed extended JSON.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        Bson::Document(self.cond()).into_relaxed_extjson()
    }

    /// Returns the compiled filter as a JSON string.
    #[must_use]
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

/// Builds a single predicate from a DSL key.
///
/// A bare key is an equality test; `field__token` applies the operator
/// named by `token`. Strings given for `_id` (or any `*.$id` path) are
/// converted to ObjectIds.
pub fn q(key: &str, value: impl Into<Value>) -> Result<Query> {
    let value = value.into();
    if let Value::Ref(resolved) = value {
        return reference_predicate(key, resolved);
    }

    let (field, token) = match key.split_once("__") {
        Some((field, token)) => (field, Some(token)),
        None => (key, None),
    };

    if token == Some("match") {
        return elem_match(key, field, value).map(|node| Query::from_nodes(vec![node]));
    }

    let mut operand = match value {
        Value::Bson(b) => b,
        other => {
            return Err(QueryError::InvalidValue {
                key: key.to_string(),
                expected: match other {
                    Value::Cond(_) => "a plain value; condition maps need a relationship field",
                    _ => "a plain value",
                },
            })
        }
    };

    if is_id_field(field) {
        operand = format_id(field, operand)?;
    }

    trace!(field, token = token.unwrap_or("eq"), "building predicate");
    let (op, operand) = match token {
        None => (Operator::Eq, operand),
        Some(token) => translate(key, token, operand)?,
    };
    Ok(Query::from_nodes(vec![ExprNode::predicate(field, op, operand)]))
}

/// Builds the negation of [`q`].
///
/// A single clause is wrapped in `$not`. Several clauses (a resolved
/// `MATCH` relationship) become an `$or` of individually negated clauses.
pub fn not_q(key: &str, value: impl Into<Value>) -> Result<Query> {
    let inner = q(key, value)?;
    let mut nodes = inner.nodes;
    let node = match nodes.len() {
        0 => return Err(QueryError::EmptyNegation(key.to_string())),
        1 => nodes.remove(0).negate(),
        _ => ExprNode::Or(nodes.into_iter().map(ExprNode::negate).collect()),
    };
    Ok(Query::from_nodes(vec![node]))
}

/// Builds a query from a condition map.
///
/// Plain keys go through [`q`]; a leading `~` goes through [`not_q`].
/// `$and`, `$or` and `$nor` accept a condition map, a query, or a list of
/// maps and queries; empty branches are dropped.
pub fn mix_q(cond: Cond) -> Result<Query> {
    let mut query = Query::new();
    for (key, value) in cond {
        if key.is_empty() {
            continue;
        }

        if let Some(real) = key.strip_prefix('~') {
            if is_combinator(real) {
                return Err(QueryError::NegatedCombinator(real.to_string()));
            }
            query = query.and([not_q(real, value)?]);
        } else if is_combinator(&key) {
            let branches = combinator_branches(&key, value)?;
            if branches.is_empty() {
                debug!(combinator = %key, "every branch is empty, skipping");
                continue;
            }
            query = match key.as_str() {
                "$and" => query.and(branches),
                "$or" => query.or(branches),
                _ => query.nor(branches),
            };
        } else {
            query = query.and([q(&key, value)?]);
        }
    }
    Ok(query)
}

fn combinator_branches(key: &str, value: Value) -> Result<Vec<Query>> {
    let items = match value {
        Value::List(items) => items,
        Value::Query(q) => vec![Value::Query(q)],
        Value::Cond(c) if key == "$and" => vec![Value::Cond(c)],
        // each entry of a map under $or/$nor is its own branch
        Value::Cond(c) => c
            .into_iter()
            .map(|(k, v)| Value::Cond(Cond::new().with(k, v)))
            .collect(),
        _ => {
            return Err(QueryError::InvalidCombinator {
                key: key.to_string(),
                expected: "a condition map, a query, or a list of those",
            })
        }
    };

    let mut branches = Vec::with_capacity(items.len());
    for item in items {
        let branch = match item {
            Value::Cond(c) => mix_q(c)?,
            Value::Query(q) => q,
            _ => {
                return Err(QueryError::InvalidCombinator {
                    key: key.to_string(),
                    expected: "a list of condition maps or queries",
                })
            }
        };
        if !branch.is_empty() {
            branches.push(branch);
        }
    }
    Ok(branches)
}

fn elem_match(key: &str, field: &str, value: Value) -> Result<ExprNode> {
    let sub = match value {
        Value::Query(q) => q,
        Value::Cond(c) => mix_q(c)?,
        _ => {
            return Err(QueryError::InvalidValue {
                key: key.to_string(),
                expected: "a query or condition map",
            })
        }
    };
    let filter = sub.cond();
    if filter.is_empty() {
        return Err(QueryError::EmptyMatch(field.to_string()));
    }
    Ok(ExprNode::predicate(
        field,
        Operator::ElemMatch,
        Bson::Document(filter),
    ))
}

fn reference_predicate(key: &str, resolved: ResolvedRef) -> Result<Query> {
    if key.contains("__") {
        return Err(QueryError::RefKeyWithOperator(key.to_string()));
    }

    let id_path = format!("{key}.$id");
    let count = count_bson(resolved.ids.len());
    let ids = Bson::Array(resolved.ids);
    let nodes = match resolved.mode {
        MatchMode::Default => vec![ExprNode::predicate(id_path, Operator::In, ids)],
        MatchMode::All => vec![ExprNode::predicate(id_path, Operator::All, ids)],
        MatchMode::Match => vec![
            ExprNode::predicate(id_path, Operator::All, ids),
            ExprNode::predicate(key, Operator::Size, count),
        ],
    };
    Ok(Query::from_nodes(nodes))
}

fn count_bson(n: usize) -> Bson {
    match i32::try_from(n) {
        Ok(small) => Bson::Int32(small),
        Err(_) => Bson::Int64(i64::try_from(n).unwrap_or(i64::MAX)),
    }
}

fn is_id_field(field: &str) -> bool {
    field == "_id" || field.ends_with(".$id")
}

fn parse_id(field: &str, s: &str) -> Result<ObjectId> {
    ObjectId::parse_str(s).map_err(|_| QueryError::InvalidObjectId {
        field: field.to_string(),
        value: s.to_string(),
    })
}

fn format_id(field: &str, operand: Bson) -> Result<Bson> {
    match operand {
        Bson::String(s) => parse_id(field, &s).map(Bson::ObjectId),
        Bson::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Bson::String(s) => parse_id(field, &s).map(Bson::ObjectId),
                other => Ok(other),
            })
            .collect::<Result<Vec<_>>>()
            .map(Bson::Array),
        other => Ok(other),
    }
}

/// Compiles each branch and wraps its clauses in an `And` node.
fn branch_nodes<I: IntoIterator<Item = Query>>(branches: I) -> Vec<ExprNode> {
    branches
        .into_iter()
        .filter_map(|branch| {
            let mut filter = branch.cond();
            if filter.is_empty() {
                return None;
            }
            let clauses = match filter.remove("$and") {
                Some(Bson::Array(items)) if filter.is_empty() => items
                    .into_iter()
                    .filter_map(|item| match item {
                        Bson::Document(d) => Some(d),
                        _ => None,
                    })
                    .collect(),
                Some(and) => {
                    filter.insert("$and", and);
                    vec![filter]
                }
                None => vec![filter],
            };
            Some(ExprNode::And(clauses))
        })
        .collect()
}

fn compile(nodes: &[ExprNode]) -> Document {
    let mut filter = Document::new();
    let mut clauses: Vec<Document> = Vec::new();

    for node in nodes {
        match node {
            ExprNode::And(docs) => clauses.extend(docs.iter().cloned()),
            ExprNode::Or(_) | ExprNode::Nor(_) => {
                let (key, value) = lower(node);
                clauses.push(doc! { key: value });
            }
            _ => {
                let (key, value) = lower(node);
                merge_field(&mut filter, key, value);
            }
        }
    }

    if clauses.len() == 1 && filter.is_empty() {
        return clauses.remove(0);
    }
    if !clauses.is_empty() {
        filter.insert(
            "$and",
            clauses.into_iter().map(Bson::Document).collect::<Vec<_>>(),
        );
    }
    filter
}

fn lower(node: &ExprNode) -> (String, Bson) {
    match node {
        ExprNode::Predicate {
            field,
            op: Operator::Regex,
            operand,
        } => (field.clone(), operand.clone()),
        ExprNode::Predicate { field, op, operand } => (
            field.clone(),
            Bson::Document(doc! { op.as_str(): operand.clone() }),
        ),
        ExprNode::Not(inner) => {
            let (key, value) = lower(inner);
            (key, Bson::Document(doc! { "$not": value }))
        }
        ExprNode::Or(branches) => ("$or".to_string(), lower_branches(branches)),
        ExprNode::Nor(branches) => ("$nor".to_string(), lower_branches(branches)),
        ExprNode::And(docs) => (
            "$and".to_string(),
            Bson::Array(docs.iter().cloned().map(Bson::Document).collect()),
        ),
    }
}

fn lower_branches(branches: &[ExprNode]) -> Bson {
    Bson::Array(
        branches
            .iter()
            .map(|b| Bson::Document(compile(slice::from_ref(b))))
            .collect(),
    )
}

/// Merges a field condition into the filter.
///
/// Operators on the same field share one sub-document; a later `$not`
/// merges into an existing `$not` instead of replacing it. Within `$not`,
/// a repeated inner operator takes the later value.
fn merge_field(filter: &mut Document, key: String, value: Bson) {
    match (filter.get_mut(&key), value) {
        (Some(Bson::Document(existing)), Bson::Document(incoming)) => {
            if incoming.contains_key("$regex") {
                existing.remove("$options");
            }
            for (op, v) in incoming {
                match (existing.get_mut(&op), v) {
                    (Some(Bson::Document(prev)), Bson::Document(negated)) if op == "$not" => {
                        for (k, nv) in negated {
                            prev.insert(k, nv);
                        }
                    }
                    (_, v) => {
                        existing.insert(op, v);
                    }
                }
            }
        }
        (_, value) => {
            filter.insert(key, value);
        }
    }
}
