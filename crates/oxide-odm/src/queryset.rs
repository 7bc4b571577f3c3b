//! QuerySet implementation for lazy, chainable reads.
//!
//! QuerySets are lazy: nothing reaches the store until a method like
//! `fetch_all()`, `first()` or `count()` is awaited. Every execution
//! resolves relationship conditions anew.

use std::fmt;
use std::marker::PhantomData;

use bson::{Bson, Document};
use oxide_query::{Cond, Query, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{OdmError, Result};
use crate::foreign::{deref_many, deref_one, Foreign, ForeignList};
use crate::registry::{Record, Reference};
use crate::resolver;
use crate::store::{decode, DocumentStore, FindOptions, OrderBy};

/// A document store paired with the registry describing its tables.
///
/// # Example
///
/// ```ignore
/// let db = Database::new(store, Reference::global()?);
///
/// let books = db
///     .collection::<Book>()?
///     .filter("author", cond! { "name__istartswith" => "le" })
///     .order_by("-published")
///     .limit(10)
///     .fetch_all(&db)
///     .await?;
/// ```
#[derive(Debug)]
pub struct Database<'r, S> {
    store: S,
    reference: &'r Reference,
}

impl<'r, S: DocumentStore> Database<'r, S> {
    /// Creates a database over `store`.
    pub const fn new(store: S, reference: &'r Reference) -> Self {
        Self { store, reference }
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the registry.
    pub const fn reference(&self) -> &'r Reference {
        self.reference
    }

    /// Returns a QuerySet over the raw documents of `table`.
    #[must_use]
    pub fn table(&self, table: &str) -> QuerySet<Document> {
        QuerySet::new(table)
    }

    /// Returns a QuerySet over the table `R` is registered under.
    ///
    /// # Errors
    ///
    /// Fails if `R` is not registered.
    pub fn collection<R: Record>(&self) -> Result<QuerySet<R>> {
        self.reference.require_table::<R>().map(QuerySet::new)
    }

    /// Fetches the record `foreign` points at.
    ///
    /// # Errors
    ///
    /// See [`deref_one`].
    pub async fn deref<T>(&self, foreign: &Foreign<T>) -> Result<Option<T>>
    where
        T: Record + DeserializeOwned,
    {
        deref_one(&self.store, self.reference, foreign).await
    }

    /// Fetches every record `list` points at.
    ///
    /// # Errors
    ///
    /// See [`deref_many`].
    pub async fn deref_list<T>(&self, list: &ForeignList<T>) -> Result<Vec<T>>
    where
        T: Record + DeserializeOwned,
    {
        deref_many(&self.store, self.reference, list).await
    }
}

/// Paging information returned by [`QuerySet::page_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Paging {
    /// Current page, 1-based
    pub page_no: u64,
    /// Documents per page
    pub page_size: u64,
    /// Total matching documents
    pub total: u64,
    /// Total pages
    pub page_total: u64,
}

impl Paging {
    /// Computes paging for `total` documents, clamping `page_no` into range.
    #[must_use]
    pub fn new(page_no: u64, page_size: u64, total: u64) -> Self {
        let page_total = total.div_ceil(page_size.max(1));
        Self {
            page_no: page_no.clamp(1, page_total.max(1)),
            page_size,
            total,
            page_total,
        }
    }
}

/// A lazy, chainable read over one table.
///
/// Conditions accumulate in a [`Cond`]: setting a key twice keeps the
/// later value. Conditions on relationship fields are resolved against
/// the target table when the QuerySet runs.
///
/// # Example
///
/// ```ignore
/// let open = db
///     .table("tickets")
///     .filter("status", "open")
///     .exclude("priority__lt", 3)
///     .order_by("-created_at")
///     .page(2, 20);
///
/// let tickets = open.fetch_all(&db).await?;
/// ```
pub struct QuerySet<T = Document> {
    table: String,
    cond: Cond,
    select: Vec<String>,
    projection: Document,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
    page: Option<(u64, u64)>,
    _marker: PhantomData<fn() -> T>,
}

// Manual Clone implementation to avoid T: Clone bound
impl<T> Clone for QuerySet<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            cond: self.cond.clone(),
            select: self.select.clone(),
            projection: self.projection.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            offset: self.offset,
            page: self.page,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for QuerySet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("table", &self.table)
            .field("cond", &self.cond)
            .field("select", &self.select)
            .field("order_by", &self.order_by)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("page", &self.page)
            .finish_non_exhaustive()
    }
}

impl<T> QuerySet<T> {
    /// Creates an unfiltered QuerySet over `table`.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            cond: Cond::new(),
            select: Vec::new(),
            projection: Document::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            page: None,
            _marker: PhantomData,
        }
    }

    /// Returns the table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Returns the accumulated conditions.
    #[must_use]
    pub const fn conditions(&self) -> &Cond {
        &self.cond
    }

    /// Adds a condition.
    ///
    /// On a relationship field, `value` is a condition map on the target
    /// table.
    #[must_use]
    pub fn filter(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.cond.insert(key, value);
        self
    }

    /// Adds every condition of `cond`.
    #[must_use]
    pub fn filters(mut self, cond: Cond) -> Self {
        self.cond.extend(cond);
        self
    }

    /// Adds a negated condition.
    #[must_use]
    pub fn exclude(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.cond.insert(format!("~{key}"), value);
        self
    }

    /// Selects fields; a `-` prefix excludes the field instead.
    #[must_use]
    pub fn select<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Sets a raw projection entry.
    #[must_use]
    pub fn projection(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.projection.insert(field, value.into());
        self
    }

    /// Appends an ordering; use a `-` prefix for descending order.
    ///
    /// # Example
    ///
    /// ```ignore
    /// // Order by created_at descending, then name ascending
    /// qs.order_by("-created_at").order_by("name")
    /// ```
    #[must_use]
    pub fn order_by(mut self, spec: &str) -> Self {
        self.order_by.push(OrderBy::parse(spec));
        self
    }

    /// Limits the number of results.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skips the first `n` results.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Restricts results to page `page_no` (1-based) of `page_size`.
    ///
    /// Overrides `limit` and `offset`.
    #[must_use]
    pub const fn page(mut self, page_no: u64, page_size: u64) -> Self {
        self.page = Some((page_no, page_size));
        self
    }

    /// Builds the find options.
    ///
    /// # Errors
    ///
    /// Fails on a zero limit, page number or page size.
    pub fn find_options(&self) -> Result<FindOptions> {
        let mut options = FindOptions::new();
        if !self.select.is_empty() {
            options = options.select(&self.select);
        }
        if !self.projection.is_empty() {
            options = options.project(self.projection.clone());
        }
        for order in &self.order_by {
            options = options.order_by(order);
        }
        match self.page {
            Some((page_no, page_size)) => options.page(page_no, page_size),
            None => {
                if let Some(offset) = self.offset {
                    options = options.skip(offset);
                }
                match self.limit {
                    Some(n) => options.limit(n),
                    None => Ok(options),
                }
            }
        }
    }

    /// Resolves relationships and builds the query.
    ///
    /// # Errors
    ///
    /// Fails on malformed conditions, empty relationship conditions or
    /// store errors raised while resolving them.
    pub async fn build_query<S: DocumentStore>(&self, db: &Database<'_, S>) -> Result<Query> {
        resolver::build_query(db.store(), db.reference(), &self.table, self.cond.clone()).await
    }

    /// Returns the compiled filter as JSON.
    ///
    /// # Errors
    ///
    /// See [`QuerySet::build_query`].
    pub async fn to_json<S: DocumentStore>(&self, db: &Database<'_, S>) -> Result<String> {
        Ok(self.build_query(db).await?.to_json())
    }

    /// Counts matching documents, ignoring limit, offset and page.
    ///
    /// # Errors
    ///
    /// See [`QuerySet::build_query`]; store errors are returned unchanged.
    pub async fn count<S: DocumentStore>(&self, db: &Database<'_, S>) -> Result<u64> {
        let filter = self.build_query(db).await?.cond();
        debug!(
            collection = %self.table,
            filter = %Bson::Document(filter.clone()).into_relaxed_extjson(),
            "count"
        );
        db.store().count(&self.table, filter).await
    }

    /// Whether any document matches, honoring the offset.
    ///
    /// # Errors
    ///
    /// See [`QuerySet::build_query`]; store errors are returned unchanged.
    pub async fn exists<S: DocumentStore>(&self, db: &Database<'_, S>) -> Result<bool> {
        let filter = self.build_query(db).await?.cond();
        let mut options = FindOptions::ids_only().limit(1)?;
        if let Some(offset) = self.offset {
            options = options.skip(offset);
        }
        let docs = db.store().find(&self.table, filter, &options).await?;
        Ok(!docs.is_empty())
    }

    async fn find_docs<S: DocumentStore>(
        &self,
        db: &Database<'_, S>,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        let filter = self.build_query(db).await?.cond();
        debug!(
            collection = %self.table,
            filter = %Bson::Document(filter.clone()).into_relaxed_extjson(),
            skip = ?options.skip,
            limit = ?options.limit,
            "find"
        );
        db.store().find(&self.table, filter, options).await
    }
}

impl<T: DeserializeOwned> QuerySet<T> {
    /// Returns every matching record.
    ///
    /// # Errors
    ///
    /// Fails on invalid paging, query errors, store errors and documents
    /// that do not decode into `T`.
    pub async fn fetch_all<S: DocumentStore>(&self, db: &Database<'_, S>) -> Result<Vec<T>> {
        let options = self.find_options()?;
        let docs = self.find_docs(db, &options).await?;
        docs.into_iter().map(decode).collect()
    }

    /// Returns the first matching record, or `None` if nothing matches.
    ///
    /// # Errors
    ///
    /// See [`QuerySet::fetch_all`].
    pub async fn first<S: DocumentStore>(&self, db: &Database<'_, S>) -> Result<Option<T>> {
        let mut qs = self.clone();
        qs.page = None;
        let options = qs.limit(1).find_options()?;
        let docs = self.find_docs(db, &options).await?;
        docs.into_iter().next().map(decode).transpose()
    }

    /// Returns one page of records and the paging summary.
    ///
    /// The page number is clamped into `1..=page_total`.
    ///
    /// # Errors
    ///
    /// Fails with [`OdmError::InvalidPaging`] before touching the store if
    /// either argument is 0; otherwise see [`QuerySet::fetch_all`].
    pub async fn page_data<S: DocumentStore>(
        &self,
        db: &Database<'_, S>,
        page_no: u64,
        page_size: u64,
    ) -> Result<(Vec<T>, Paging)> {
        if page_no == 0 || page_size == 0 {
            return Err(OdmError::InvalidPaging(
                "page number and page size must be at least 1".into(),
            ));
        }
        let total = self.count(db).await?;
        let paging = Paging::new(page_no, page_size, total);
        let items = self
            .clone()
            .page(paging.page_no, page_size)
            .fetch_all(db)
            .await?;
        Ok((items, paging))
    }
}
