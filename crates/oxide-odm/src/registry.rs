//! The reference registry.
//!
//! Tables are registered on a [`ReferenceBuilder`] together with the
//! relationship fields of their record shape. Relationships name their
//! target by shape, not by table; [`ReferenceBuilder::finalize`] resolves
//! every target to its table and returns a frozen [`Reference`] that only
//! supports lookups.

use std::any::{type_name, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use bson::oid::ObjectId;
use oxide_query::MatchMode;
use tracing::debug;

use crate::error::{OdmError, Result};

static GLOBAL: OnceLock<Reference> = OnceLock::new();

/// Identity of a record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId {
    id: TypeId,
    name: &'static str,
}

impl ShapeId {
    /// Returns the identity of `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Returns the type name, for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// A relationship field declared by a record shape.
#[derive(Debug, Clone)]
pub struct Relation {
    field: String,
    target: ShapeId,
    mode: MatchMode,
}

impl Relation {
    /// Declares `field` as a reference to records of shape `T`.
    pub fn to<T: 'static>(field: &str, mode: MatchMode) -> Self {
        Self {
            field: field.to_string(),
            target: ShapeId::of::<T>(),
            mode,
        }
    }

    /// Returns the field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the target shape.
    #[must_use]
    pub const fn target(&self) -> ShapeId {
        self.target
    }

    /// Returns the match mode.
    #[must_use]
    pub const fn mode(&self) -> MatchMode {
        self.mode
    }
}

/// The declared shape of a record: its identity and relationship fields.
#[derive(Debug, Clone)]
pub struct Schema {
    shape: ShapeId,
    relations: Vec<Relation>,
}

impl Schema {
    /// Creates a schema for shape `T` with no relationships.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            shape: ShapeId::of::<T>(),
            relations: Vec::new(),
        }
    }

    /// Adds a relationship field.
    #[must_use]
    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Returns the shape identity.
    #[must_use]
    pub const fn shape(&self) -> ShapeId {
        self.shape
    }

    /// Returns the relationship fields.
    #[must_use]
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }
}

/// A record type stored in a table.
///
/// # Example
///
/// ```
/// use bson::oid::ObjectId;
/// use oxide_odm::{MatchMode, Record, Relation, Schema};
///
/// struct Author {
///     id: ObjectId,
/// }
///
/// struct Book {
///     id: ObjectId,
/// }
///
/// impl Record for Author {
///     fn id(&self) -> ObjectId {
///         self.id
///     }
/// }
///
/// impl Record for Book {
///     fn schema() -> Schema {
///         Schema::of::<Self>().relation(Relation::to::<Author>("author", MatchMode::Default))
///     }
///
///     fn id(&self) -> ObjectId {
///         self.id
///     }
/// }
/// ```
pub trait Record: 'static {
    /// Returns the record's schema.
    ///
    /// Defaults to a schema without relationships.
    fn schema() -> Schema
    where
        Self: Sized,
    {
        Schema::of::<Self>()
    }

    /// Returns the record's identifier; zero when the record is unsaved.
    fn id(&self) -> ObjectId;
}

/// Whether `id` is the zero identifier.
#[must_use]
pub fn is_zero_id(id: &ObjectId) -> bool {
    id.bytes() == [0; 12]
}

/// A resolved relationship: target table and match mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefTarget {
    /// Target table name.
    pub table: String,
    /// How resolved ids are compared.
    pub mode: MatchMode,
}

/// Collects table registrations before the registry is frozen.
#[derive(Debug, Default)]
pub struct ReferenceBuilder {
    tables: HashMap<String, Vec<Relation>>,
    shapes: HashMap<ShapeId, String>,
}

impl ReferenceBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers record type `R` under `table`.
    ///
    /// # Errors
    ///
    /// See [`ReferenceBuilder::register_schema`].
    pub fn register<R: Record>(self, table: &str) -> Result<Self> {
        self.register_schema(table, R::schema())
    }

    /// Registers `schema` under `table`.
    ///
    /// # Errors
    ///
    /// Fails if the table or the shape is already registered, or if a
    /// relationship field contains `__` or is declared twice.
    pub fn register_schema(mut self, table: &str, schema: Schema) -> Result<Self> {
        if self.tables.contains_key(table) {
            return Err(OdmError::DuplicateTable(table.to_string()));
        }
        if let Some(existing) = self.shapes.get(&schema.shape) {
            return Err(OdmError::DuplicateShape {
                shape: schema.shape.name,
                table: existing.clone(),
            });
        }
        if let Some(bad) = schema.relations.iter().find(|r| r.field.contains("__")) {
            return Err(OdmError::InvalidRelationField {
                table: table.to_string(),
                field: bad.field.clone(),
            });
        }
        let duplicate = {
            let mut seen = HashSet::with_capacity(schema.relations.len());
            schema
                .relations
                .iter()
                .find(|r| !seen.insert(r.field.as_str()))
                .map(|r| r.field.clone())
        };
        if let Some(field) = duplicate {
            return Err(OdmError::DuplicateRelationField {
                table: table.to_string(),
                field,
            });
        }

        debug!(
            table,
            shape = schema.shape.name,
            relations = schema.relations.len(),
            "registered table"
        );
        self.shapes.insert(schema.shape, table.to_string());
        self.tables.insert(table.to_string(), schema.relations);
        Ok(self)
    }

    /// Resolves every relationship target and freezes the registry.
    ///
    /// # Errors
    ///
    /// Fails if a relationship targets a shape that was never registered.
    pub fn finalize(self) -> Result<Reference> {
        let mut tables = HashMap::with_capacity(self.tables.len());
        for (table, relations) in self.tables {
            let mut fields = HashMap::with_capacity(relations.len());
            for relation in relations {
                let Some(target) = self.shapes.get(&relation.target) else {
                    return Err(OdmError::UnresolvedTarget {
                        table,
                        field: relation.field,
                        shape: relation.target.name,
                    });
                };
                fields.insert(
                    relation.field,
                    RefTarget {
                        table: target.clone(),
                        mode: relation.mode,
                    },
                );
            }
            tables.insert(table, fields);
        }
        Ok(Reference {
            tables,
            shapes: self.shapes,
        })
    }
}

/// The frozen registry of tables and their relationship fields.
#[derive(Debug)]
pub struct Reference {
    tables: HashMap<String, HashMap<String, RefTarget>>,
    shapes: HashMap<ShapeId, String>,
}

impl Reference {
    /// Starts a new registry.
    #[must_use]
    pub fn builder() -> ReferenceBuilder {
        ReferenceBuilder::new()
    }

    /// Returns the relationship declared on `table.field`, if any.
    #[must_use]
    pub fn lookup(&self, table: &str, field: &str) -> Option<&RefTarget> {
        self.tables.get(table)?.get(field)
    }

    /// Whether `table` is registered.
    #[must_use]
    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Returns the table record type `R` is registered under.
    #[must_use]
    pub fn table_of<R: 'static>(&self) -> Option<&str> {
        self.table_of_shape(ShapeId::of::<R>())
    }

    /// Returns the table a shape is registered under.
    #[must_use]
    pub fn table_of_shape(&self, shape: ShapeId) -> Option<&str> {
        self.shapes.get(&shape).map(String::as_str)
    }

    /// Like [`Reference::table_of`], failing for unregistered types.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::UnregisteredShape`] if `R` has no table.
    pub fn require_table<R: 'static>(&self) -> Result<&str> {
        self.table_of::<R>()
            .ok_or_else(|| OdmError::UnregisteredShape(type_name::<R>()))
    }

    /// Iterates over the relationship fields of `table`.
    pub fn relations<'a>(&'a self, table: &str) -> impl Iterator<Item = (&'a str, &'a RefTarget)> {
        self.tables
            .get(table)
            .into_iter()
            .flat_map(|fields| fields.iter().map(|(f, t)| (f.as_str(), t)))
    }

    /// Installs this registry as the process-wide one.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::AlreadyInstalled`] if one was installed before.
    pub fn install(self) -> Result<&'static Self> {
        GLOBAL.set(self).map_err(|_| OdmError::AlreadyInstalled)?;
        Self::global()
    }

    /// Returns the process-wide registry.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::NotInstalled`] before [`Reference::install`].
    pub fn global() -> Result<&'static Self> {
        GLOBAL.get().ok_or(OdmError::NotInstalled)
    }
}
