//! # oxide-query
//!
//! A Django-style filter DSL that compiles to MongoDB query documents.
//!
//! This crate provides:
//! - [`q`], [`not_q`] and [`mix_q`] for building predicates from
//!   `field__operator` keys
//! - [`Query`] for composing predicates with AND, OR and NOR
//! - [`Cond`] and the [`cond!`] macro for map-style conditions
//! - Pattern operators (`contains`, `istartswith`, ...) compiled to regexes
//! - Geo operators (`geo_within_center_sphere`, `near`, ...)
//!
//! Nothing here talks to a database: a [`Query`] compiles to a
//! [`bson::Document`] and that is all.
//!
//! ## Quick Start
//!
//! ```
//! use oxide_query::{cond, mix_q, not_q, q, Query};
//! use bson::doc;
//!
//! // Single predicates
//! let adults = q("age__gte", 18)?;
//! let not_banned = not_q("status", "banned")?;
//!
//! // Combined
//! let query = Query::all_of([adults, not_banned]);
//! assert_eq!(
//!     query.cond(),
//!     doc! { "age": { "$gte": 18 }, "status": { "$not": { "$eq": "banned" } } }
//! );
//!
//! // The same thing as a condition map
//! let mixed = mix_q(cond! { "age__gte" => 18, "~status" => "banned" })?;
//! assert_eq!(mixed.cond(), query.cond());
//! # Ok::<(), oxide_query::QueryError>(())
//! ```
//!
//! ## Operators
//!
//! | Suffix | Compiles to |
//! |---|---|
//! | *(none)*, `eq`, `ne`, `gt`, `gte`, `lt`, `lte` | comparison |
//! | `in`, `nin`, `all`, `size`, `exists`, `mod`, `regex` | same-named operator |
//! | `startswith`, `endswith`, `contains` and `i` variants | `$regex` |
//! | `match` | `$elemMatch` |
//! | `geo_within_center_sphere`, `geo_within_2d_center` | `$geoWithin` circle |
//! | `geo_within_2d_box`, `geo_within_2d_polygon` | `$geoWithin` planar shape |
//! | `geo_within_polygon`, `geo_within_multi_polygon` | `$geoWithin` with GeoJSON |
//! | `geo_intersects_polygon` | `$geoIntersects` |
//! | `near`, `near_sphere` | `$near`, `$nearSphere` |

mod cond;
mod error;
mod node;
mod query;
pub mod translate;
mod value;

pub use cond::{is_combinator, Cond, COMBINATORS};
pub use error::{QueryError, Result};
pub use node::{ExprNode, Operator};
pub use query::{mix_q, not_q, q, Query};
pub use value::{MatchMode, ResolvedRef, Value};

// Re-export so callers can build operands without a direct bson dependency.
pub use bson;
