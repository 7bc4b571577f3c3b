//! Stored references to records in other tables.
//!
//! A [`Foreign<T>`] is embedded in a record and serializes as a DBRef,
//! `{"$ref": table, "$id": id}`. A [`ForeignList<T>`] is an array of those.
//! Dereferencing fetches a copy of the target records from the store.

use std::fmt;
use std::marker::PhantomData;

use bson::oid::ObjectId;
use oxide_query::q;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OdmError, Result};
use crate::registry::{is_zero_id, Record, Reference};
use crate::store::{decode, DocumentStore, FindOptions};

/// A reference to one record of type `T`.
///
/// The zero value (empty table or zero id) means "no reference".
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Foreign<T> {
    #[serde(rename = "$ref")]
    table: String,
    #[serde(rename = "$id")]
    id: ObjectId,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

// Manual impls to avoid requiring the same traits on T
impl<T> Clone for Foreign<T> {
    fn clone(&self) -> Self {
        Self::new(&self.table, self.id)
    }
}

impl<T> PartialEq for Foreign<T> {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.id == other.id
    }
}

impl<T> Eq for Foreign<T> {}

impl<T> fmt::Debug for Foreign<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Foreign")
            .field("table", &self.table)
            .field("id", &self.id)
            .finish()
    }
}

impl<T> Default for Foreign<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> Foreign<T> {
    /// Creates a reference to `id` in `table`.
    pub fn new(table: &str, id: ObjectId) -> Self {
        Self {
            table: table.to_string(),
            id,
            _marker: PhantomData,
        }
    }

    /// The empty reference.
    #[must_use]
    pub fn none() -> Self {
        Self::new("", ObjectId::from_bytes([0; 12]))
    }

    /// Returns the target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the target identifier.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Whether this is the empty reference.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.table.is_empty() || is_zero_id(&self.id)
    }
}

impl<T: Record> Foreign<T> {
    /// Builds a reference to `record`.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered or the record has no identifier.
    pub fn from_record(reference: &Reference, record: &T) -> Result<Self> {
        let table = reference.require_table::<T>()?;
        let id = record.id();
        if is_zero_id(&id) {
            return Err(OdmError::MissingId(table.to_string()));
        }
        Ok(Self::new(table, id))
    }
}

/// An ordered list of references to records of type `T`.
#[derive(Serialize, Deserialize)]
#[serde(bound = "", transparent)]
pub struct ForeignList<T>(Vec<Foreign<T>>);

impl<T> Clone for ForeignList<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> PartialEq for ForeignList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> fmt::Debug for ForeignList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.0).finish()
    }
}

impl<T> Default for ForeignList<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> ForeignList<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a reference.
    pub fn push(&mut self, foreign: Foreign<T>) {
        self.0.push(foreign);
    }

    /// Number of references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the references.
    pub fn iter(&self) -> std::slice::Iter<'_, Foreign<T>> {
        self.0.iter()
    }

    /// Returns the non-zero identifiers in list order.
    #[must_use]
    pub fn ids(&self) -> Vec<ObjectId> {
        self.0
            .iter()
            .filter(|f| !f.is_none())
            .map(Foreign::id)
            .collect()
    }
}

impl<T: Record> ForeignList<T> {
    /// Builds references to every record in `records`.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered or any record has no identifier.
    pub fn from_records(reference: &Reference, records: &[T]) -> Result<Self> {
        records
            .iter()
            .map(|r| Foreign::from_record(reference, r))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

impl<T> From<Vec<Foreign<T>>> for ForeignList<T> {
    fn from(v: Vec<Foreign<T>>) -> Self {
        Self(v)
    }
}

impl<T> FromIterator<Foreign<T>> for ForeignList<T> {
    fn from_iter<I: IntoIterator<Item = Foreign<T>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a ForeignList<T> {
    type Item = &'a Foreign<T>;
    type IntoIter = std::slice::Iter<'a, Foreign<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Checks that `table` is the one `T` is registered under.
fn target_table<'r, T: Record>(reference: &'r Reference, table: &str) -> Result<&'r str> {
    let expected = reference.require_table::<T>()?;
    if expected != table {
        return Err(OdmError::TableMismatch {
            expected: expected.to_string(),
            found: table.to_string(),
        });
    }
    Ok(expected)
}

/// Fetches the record `foreign` points at.
///
/// Returns `None` without touching the store for the empty reference, and
/// `None` when the record no longer exists.
///
/// # Errors
///
/// Fails on a table mismatch, a store error or a decode error.
pub async fn deref_one<S, T>(
    store: &S,
    reference: &Reference,
    foreign: &Foreign<T>,
) -> Result<Option<T>>
where
    S: DocumentStore,
    T: Record + DeserializeOwned,
{
    if foreign.is_none() {
        debug!("empty reference, skipping fetch");
        return Ok(None);
    }
    let table = target_table::<T>(reference, &foreign.table)?;
    let filter = q("_id", foreign.id)?.cond();
    let options = FindOptions::new().limit(1)?;
    let docs = store.find(table, filter, &options).await?;
    docs.into_iter().next().map(decode).transpose()
}

/// Fetches every record `list` points at.
///
/// Zero identifiers are skipped; an empty list does not touch the store.
///
/// # Errors
///
/// Fails on a table mismatch, a store error or a decode error.
pub async fn deref_many<S, T>(
    store: &S,
    reference: &Reference,
    list: &ForeignList<T>,
) -> Result<Vec<T>>
where
    S: DocumentStore,
    T: Record + DeserializeOwned,
{
    let ids = list.ids();
    if ids.is_empty() {
        debug!("empty reference list, skipping fetch");
        return Ok(Vec::new());
    }
    let expected = reference.require_table::<T>()?;
    for foreign in list.iter().filter(|f| !f.is_none()) {
        target_table::<T>(reference, &foreign.table)?;
    }
    let filter = q("_id__in", ids)?.cond();
    let docs = store.find(expected, filter, &FindOptions::new()).await?;
    docs.into_iter().map(decode).collect()
}
