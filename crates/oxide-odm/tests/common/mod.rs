#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Mutex;

use bson::oid::ObjectId;
use bson::{doc, Document};
use oxide_odm::{
    DocumentStore, FindOptions, Foreign, ForeignList, MatchMode, OdmError, Record, Reference,
    Relation, Result, Schema,
};
use serde::{Deserialize, Serialize};

pub const HEX_A: &str = "5f1f1f1f1f1f1f1f1f1f1f1a";
pub const HEX_B: &str = "5f1f1f1f1f1f1f1f1f1f1f1b";
pub const HEX_C: &str = "5f1f1f1f1f1f1f1f1f1f1f1c";

pub fn oid(hex: &str) -> ObjectId {
    ObjectId::parse_str(hex).unwrap_or_else(|e| panic!("bad hex {hex}: {e}"))
}

/// A store call recorded by [`MockStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Find {
        collection: String,
        filter: Document,
        options: FindOptions,
    },
    Count {
        collection: String,
        filter: Document,
    },
}

/// A store that returns canned documents per collection and records every
/// call it receives. Filters are never evaluated; `skip` and `limit` are.
#[derive(Debug, Default)]
pub struct MockStore {
    docs: HashMap<String, Vec<Document>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<Call>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the documents returned for `collection`.
    pub fn with_docs(mut self, collection: &str, docs: Vec<Document>) -> Self {
        self.docs.insert(collection.to_string(), docs);
        self
    }

    /// Makes every call on `collection` fail.
    pub fn failing(mut self, collection: &str) -> Self {
        self.failing.insert(collection.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Filters of every find dispatched to `collection`, in call order.
    pub fn find_filters(&self, collection: &str) -> Vec<Document> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Find {
                    collection: c,
                    filter,
                    ..
                } if c == collection => Some(filter),
                _ => None,
            })
            .collect()
    }

    /// Options of every find dispatched to `collection`, in call order.
    pub fn find_options(&self, collection: &str) -> Vec<FindOptions> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Find {
                    collection: c,
                    options,
                    ..
                } if c == collection => Some(options),
                _ => None,
            })
            .collect()
    }

    fn check(&self, collection: &str) -> Result<()> {
        if self.failing.contains(collection) {
            return Err(OdmError::store(io::Error::other(format!(
                "connection reset on {collection}"
            ))));
        }
        Ok(())
    }
}

impl DocumentStore for MockStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        self.calls.lock().unwrap().push(Call::Find {
            collection: collection.to_string(),
            filter,
            options: options.clone(),
        });
        self.check(collection)?;

        let skip = options.skip.map_or(0, |n| usize::try_from(n).unwrap());
        let limit = options.limit.map_or(usize::MAX, |n| usize::try_from(n).unwrap());
        Ok(self
            .docs
            .get(collection)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .skip(skip)
            .take(limit)
            .collect())
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64> {
        self.calls.lock().unwrap().push(Call::Count {
            collection: collection.to_string(),
            filter,
        });
        self.check(collection)?;
        Ok(self.docs.get(collection).map_or(0, |d| d.len() as u64))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
}

impl Record for Author {
    fn id(&self) -> ObjectId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub label: String,
}

impl Record for Tag {
    fn id(&self) -> ObjectId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub author: Foreign<Author>,
    #[serde(default)]
    pub tags: ForeignList<Tag>,
}

impl Record for Book {
    fn schema() -> Schema {
        Schema::of::<Self>()
            .relation(Relation::to::<Author>("author", MatchMode::Default))
            .relation(Relation::to::<Tag>("tags", MatchMode::Default))
    }

    fn id(&self) -> ObjectId {
        self.id
    }
}

/// Library registry: books point at authors and tags.
pub fn library() -> Reference {
    Reference::builder()
        .register::<Author>("authors")
        .and_then(|b| b.register::<Tag>("tags"))
        .and_then(|b| b.register::<Book>("books"))
        .and_then(oxide_odm::ReferenceBuilder::finalize)
        .unwrap_or_else(|e| panic!("Failed to build registry: {e}"))
}

pub fn author_doc(hex: &str, name: &str) -> Document {
    doc! { "_id": oid(hex), "name": name }
}

pub fn tag_doc(hex: &str, label: &str) -> Document {
    doc! { "_id": oid(hex), "label": label }
}

pub fn book_doc(hex: &str, title: &str, author_hex: &str) -> Document {
    doc! {
        "_id": oid(hex),
        "title": title,
        "author": { "$ref": "authors", "$id": oid(author_hex) },
        "tags": [],
    }
}
