//! # oxide-odm
//!
//! A Django-like document mapper on top of [`oxide_query`].
//!
//! This crate provides:
//! - [`Reference`], the registry of tables and their relationship fields
//! - [`Foreign`] and [`ForeignList`] for storing references to records
//! - [`QuerySet`] for lazy, chainable reads with relationship conditions
//! - [`DocumentStore`], the boundary every store implements
//! - `MongoStore`, a MongoDB store (behind the `mongodb` feature)
//!
//! ## Quick Start
//!
//! ```ignore
//! use oxide_odm::{cond, Database, MatchMode, Record, Reference, Relation, Schema};
//!
//! impl Record for Book {
//!     fn schema() -> Schema {
//!         Schema::of::<Self>().relation(Relation::to::<Author>("author", MatchMode::Default))
//!     }
//!
//!     fn id(&self) -> ObjectId {
//!         self.id
//!     }
//! }
//!
//! let reference = Reference::builder()
//!     .register::<Author>("authors")?
//!     .register::<Book>("books")?
//!     .finalize()?
//!     .install()?;
//!
//! let db = Database::new(MongoStore::connect(uri, "library").await?, reference);
//!
//! // Books whose author's name starts with "Le", newest first
//! let books = db
//!     .collection::<Book>()?
//!     .filter("author", cond! { "name__startswith" => "Le" })
//!     .order_by("-published")
//!     .fetch_all(&db)
//!     .await?;
//!
//! // Follow a stored reference
//! let author = db.deref(&books[0].author).await?;
//! ```
//!
//! ## Relationship conditions
//!
//! A condition on a relationship field is a condition on the target table.
//! It runs first, selecting ids only, and the outer condition is rewritten
//! to match those ids. The relationship's [`MatchMode`] decides how:
//!
//! | Mode | Compiles to |
//! |---|---|
//! | `Default` | `{"field.$id": {"$in": ids}}` |
//! | `All` | `{"field.$id": {"$all": ids}}` |
//! | `Match` | `{"field.$id": {"$all": ids}, "field": {"$size": n}}` |

mod error;
mod foreign;
#[cfg(feature = "mongodb")]
mod mongo;
mod queryset;
mod registry;
mod resolver;
mod store;

pub use error::{OdmError, Result};
pub use foreign::{deref_many, deref_one, Foreign, ForeignList};
#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;
pub use queryset::{Database, Paging, QuerySet};
pub use registry::{
    is_zero_id, Record, RefTarget, Reference, ReferenceBuilder, Relation, Schema, ShapeId,
};
pub use resolver::{build_query, resolve};
pub use store::{DocumentStore, FindOptions, OrderBy, OrderDirection};

pub use oxide_query::{cond, mix_q, not_q, q, Cond, MatchMode, Query, Value};
