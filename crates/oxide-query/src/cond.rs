//! Declarative condition maps.
//!
//! A [`Cond`] is the map-based form of a query: keys in the DSL syntax
//! (`age__gt`, `~name`, `$or`, ...) mapped to [`Value`]s. It keeps insertion
//! order so compiled filters are deterministic.

use bson::{Bson, Document};

use crate::error::{QueryError, Result};
use crate::value::Value;

/// The reserved combinator keys.
pub const COMBINATORS: [&str; 3] = ["$and", "$or", "$nor"];

/// Returns whether `key` is one of `$and`, `$or`, `$nor`.
#[must_use]
pub fn is_combinator(key: &str) -> bool {
    COMBINATORS.contains(&key)
}

/// An insertion-ordered map from DSL keys to values.
///
/// # Example
///
/// ```
/// use oxide_query::{cond, Cond};
///
/// let c = cond! {
///     "is_valid" => true,
///     "age__gte" => 18,
///     "$or" => vec![cond! { "role" => "admin" }, cond! { "role" => "owner" }],
/// };
/// assert_eq!(c.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cond {
    entries: Vec<(String, Value)>,
}

impl Cond {
    /// Creates an empty condition map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing an existing entry in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder form of [`Cond::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Merges `other` into `self`; keys in `other` win.
    pub fn extend(&mut self, other: Cond) {
        for (k, v) in other {
            self.insert(k, v);
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parses a JSON object into a condition map.
    ///
    /// Values under combinator keys and `__match` keys become nested
    /// condition maps. Everything else is converted through BSON extended
    /// JSON, so `{"$oid": "..."}` yields an ObjectId.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Object(map) => {
                let mut cond = Cond::new();
                for (key, value) in map {
                    let value = if is_combinator(&key) || key.ends_with("__match") {
                        nested_from_json(&key, value)?
                    } else {
                        Value::Bson(bson_from_json(value)?)
                    };
                    cond.insert(key, value);
                }
                Ok(cond)
            }
            other => Err(QueryError::InvalidJson(format!(
                "expected an object, found {other}"
            ))),
        }
    }

    /// Converts a BSON document into a condition map.
    ///
    /// Follows the same nesting rules as [`Cond::from_json`]: documents and
    /// arrays of documents under combinator and `__match` keys become nested
    /// condition maps, everything else is kept as a plain operand.
    #[must_use]
    pub fn from_document(doc: Document) -> Self {
        doc.into_iter()
            .map(|(key, value)| {
                let value = if is_combinator(&key) || key.ends_with("__match") {
                    nested_from_bson(value)
                } else {
                    Value::Bson(value)
                };
                (key, value)
            })
            .collect()
    }
}

fn nested_from_bson(value: Bson) -> Value {
    match value {
        Bson::Document(d) => Value::Cond(Cond::from_document(d)),
        Bson::Array(items) if items.iter().all(|i| matches!(i, Bson::Document(_))) => Value::List(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Bson::Document(d) => Some(Value::Cond(Cond::from_document(d))),
                    _ => None,
                })
                .collect(),
        ),
        other => Value::Bson(other),
    }
}

fn nested_from_json(key: &str, value: serde_json::Value) -> Result<Value> {
    match value {
        serde_json::Value::Object(_) => Ok(Value::Cond(Cond::from_json(value)?)),
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| Cond::from_json(item).map(Value::Cond))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        other => Err(QueryError::InvalidJson(format!(
            "'{key}' expects an object or an array of objects, found {other}"
        ))),
    }
}

fn bson_from_json(value: serde_json::Value) -> Result<Bson> {
    Bson::try_from(value).map_err(|e| QueryError::InvalidJson(e.to_string()))
}

impl IntoIterator for Cond {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Cond {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut cond = Cond::new();
        for (k, v) in iter {
            cond.insert(k, v);
        }
        cond
    }
}

/// Builds a [`Cond`] from `key => value` pairs.
#[macro_export]
macro_rules! cond {
    () => {
        $crate::Cond::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut c = $crate::Cond::new();
        $(c.insert($key, $value);)+
        c
    }};
}
