//! The document store boundary.
//!
//! The ODM never talks to a database directly: everything goes through a
//! [`DocumentStore`], which only needs to run finds and counts.

use std::future::Future;

use bson::{doc, Bson, Document};
use serde::de::DeserializeOwned;

use crate::error::{OdmError, Result};

/// Order direction for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (1)
    Asc,
    /// Descending order (-1)
    Desc,
}

/// An ordering specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Field to order by
    pub field: String,
    /// Order direction
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Creates a new ascending order specification.
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: OrderDirection::Asc,
        }
    }

    /// Creates a new descending order specification.
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: OrderDirection::Desc,
        }
    }

    /// Parses a Django-style order specification.
    ///
    /// Prefix with `-` for descending order.
    /// Example: `"-created_at"` for descending, `"name"` for ascending.
    pub fn parse(spec: &str) -> Self {
        if let Some(field) = spec.strip_prefix('-') {
            Self::desc(field)
        } else {
            Self::asc(spec)
        }
    }

    /// Returns the sort value the store expects.
    #[must_use]
    pub const fn sort_value(&self) -> i32 {
        match self.direction {
            OrderDirection::Asc => 1,
            OrderDirection::Desc => -1,
        }
    }
}

/// Options for a find.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Fields to include (1) or exclude (0).
    pub projection: Option<Document>,
    /// Sort specification.
    pub sort: Option<Document>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects fields; a `-` prefix excludes the field instead.
    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let projection = self.projection.get_or_insert_with(Document::new);
        for field in fields {
            let field = field.as_ref();
            match field.strip_prefix('-') {
                Some(excluded) => projection.insert(excluded, 0),
                None => projection.insert(field, 1),
            };
        }
        self
    }

    /// Merges raw projection entries.
    #[must_use]
    pub fn project(mut self, projection: Document) -> Self {
        let target = self.projection.get_or_insert_with(Document::new);
        for (k, v) in projection {
            target.insert(k, v);
        }
        self
    }

    /// Appends a sort key.
    #[must_use]
    pub fn order_by(mut self, order: &OrderBy) -> Self {
        self.sort
            .get_or_insert_with(Document::new)
            .insert(order.field.clone(), Bson::Int32(order.sort_value()));
        self
    }

    /// Skips the first `n` documents.
    #[must_use]
    pub fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    /// Returns at most `n` documents.
    ///
    /// # Errors
    ///
    /// Fails if `n` is 0.
    pub fn limit(mut self, n: u64) -> Result<Self> {
        if n == 0 {
            return Err(OdmError::InvalidPaging("limit must be at least 1".into()));
        }
        self.limit = Some(n);
        Ok(self)
    }

    /// Returns page `page_no` (1-based) of `page_size` documents.
    ///
    /// # Errors
    ///
    /// Fails if either argument is 0 or the page starts past `u64::MAX`.
    pub fn page(mut self, page_no: u64, page_size: u64) -> Result<Self> {
        if page_no == 0 || page_size == 0 {
            return Err(OdmError::InvalidPaging(
                "page number and page size must be at least 1".into(),
            ));
        }
        let skip = page_size
            .checked_mul(page_no - 1)
            .ok_or_else(|| OdmError::InvalidPaging(format!("page {page_no} is out of range")))?;
        self.skip = Some(skip);
        self.limit = Some(page_size);
        Ok(self)
    }

    /// Options selecting only the identifier field.
    #[must_use]
    pub fn ids_only() -> Self {
        Self {
            projection: Some(doc! { "_id": 1 }),
            ..Self::default()
        }
    }
}

/// Decodes a stored document into a record.
pub(crate) fn decode<T: DeserializeOwned>(doc: Document) -> Result<T> {
    Ok(bson::from_document(doc)?)
}

/// A document store that can run finds and counts.
///
/// Implementations return store errors through [`OdmError::Store`] so they
/// reach the caller unchanged.
pub trait DocumentStore: Send + Sync {
    /// Returns the documents of `collection` matching `filter`.
    fn find(
        &self,
        collection: &str,
        filter: Document,
        options: &FindOptions,
    ) -> impl Future<Output = Result<Vec<Document>>> + Send;

    /// Counts the documents of `collection` matching `filter`.
    fn count(&self, collection: &str, filter: Document)
        -> impl Future<Output = Result<u64>> + Send;
}
