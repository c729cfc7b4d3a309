//! Static attribute declarations.
//!
//! Every entity type exposes a `&'static [AttributeDecl]` table describing
//! its persistent shape. The table is normally emitted by
//! `#[derive(Model)]`, but the `const` builders below make hand-written
//! declarations just as short:
//!
//! ```ignore
//! static ATTRIBUTES: &[AttributeDecl] = &[
//!     AttributeDecl::column("id", SqlType::BigInt).id(),
//!     AttributeDecl::column("username", SqlType::Text).length(64).unique(),
//!     AttributeDecl::to_one(
//!         "team",
//!         RelationDecl::many_to_one(EntityType::of::<Team>(), "team_id").lazy(),
//!     ),
//!     AttributeDecl::transient("login_attempts"),
//! ];
//! ```

use crate::Result;
use crate::metadata::EntityMetadata;
use crate::model::{AnyModel, Model};
use crate::types::SqlType;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Default declared length for text columns.
pub const DEFAULT_LENGTH: u32 = 255;

/// How a to-one relationship is loaded by the row mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Load the related entity with a nested primary-key lookup.
    #[default]
    Eager,
    /// Keep only the foreign-key value.
    Lazy,
}

/// Cardinality of a to-one relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    OneToOne,
    ManyToOne,
}

/// Cascade flags of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cascade {
    /// `persist` of the owner persists the related entity first.
    pub persist: bool,
    /// Deleting the related row deletes owners (`ON DELETE CASCADE`).
    pub delete: bool,
}

impl Cascade {
    pub const NONE: Cascade = Cascade {
        persist: false,
        delete: false,
    };
    pub const PERSIST: Cascade = Cascade {
        persist: true,
        delete: false,
    };
    pub const DELETE: Cascade = Cascade {
        persist: false,
        delete: true,
    };
    pub const ALL: Cascade = Cascade {
        persist: true,
        delete: true,
    };
}

/// Handle to another entity type, usable in `static` declarations.
#[derive(Clone, Copy)]
pub struct EntityType {
    type_id: fn() -> TypeId,
    name: &'static str,
    resolve: fn() -> Result<Arc<EntityMetadata>>,
    instantiate: fn() -> Arc<dyn AnyModel>,
}

impl EntityType {
    /// Describe entity type `M`.
    pub const fn of<M: Model>() -> Self {
        Self {
            type_id: TypeId::of::<M>,
            name: M::NAME,
            resolve: crate::metadata::resolve::<M>,
            instantiate: crate::model::new_instance::<M>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Resolve (or fetch the cached) metadata of the described type.
    pub fn metadata(&self) -> Result<Arc<EntityMetadata>> {
        (self.resolve)()
    }

    /// A fresh `M::default()` behind an erased handle.
    pub fn instantiate(&self) -> Arc<dyn AnyModel> {
        (self.instantiate)()
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityType").field(&self.name).finish()
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

/// What a relationship attribute points at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityTarget {
    /// Another entity type.
    Entity(EntityType),
    /// A plain value: a relationship declared on a raw id attribute.
    /// Accepted by the resolver, rejected when generating schema.
    Scalar(SqlType),
}

/// Declaration of a to-one relationship.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationDecl {
    pub target: EntityTarget,
    pub join_column: &'static str,
    pub cardinality: Cardinality,
    pub fetch: FetchMode,
    pub cascade: Cascade,
}

impl RelationDecl {
    pub const fn many_to_one(target: EntityType, join_column: &'static str) -> Self {
        Self {
            target: EntityTarget::Entity(target),
            join_column,
            cardinality: Cardinality::ManyToOne,
            fetch: FetchMode::Eager,
            cascade: Cascade::NONE,
        }
    }

    pub const fn one_to_one(target: EntityType, join_column: &'static str) -> Self {
        Self {
            cardinality: Cardinality::OneToOne,
            ..Self::many_to_one(target, join_column)
        }
    }

    /// Relationship whose target is not an entity type.
    pub const fn scalar(
        sql_type: SqlType,
        join_column: &'static str,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            target: EntityTarget::Scalar(sql_type),
            join_column,
            cardinality,
            fetch: FetchMode::Eager,
            cascade: Cascade::NONE,
        }
    }

    pub const fn fetch(mut self, fetch: FetchMode) -> Self {
        self.fetch = fetch;
        self
    }

    pub const fn lazy(self) -> Self {
        self.fetch(FetchMode::Lazy)
    }

    pub const fn cascade(mut self, cascade: Cascade) -> Self {
        self.cascade = cascade;
        self
    }
}

/// Declaration of a scalar column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDecl {
    pub sql_type: SqlType,
    pub nullable: bool,
    pub unique: bool,
    pub length: u32,
}

/// Classification of a declared attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeKind {
    Column(ColumnDecl),
    ToOne(RelationDecl),
    /// One-to-many or many-to-many collection; never persisted.
    ToMany,
    /// Not persisted at all.
    Transient,
}

/// Static declaration of a single entity attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeDecl {
    /// Rust attribute (field) name
    pub name: &'static str,
    /// Declared column name; defaults to the lowercased attribute name
    pub column: Option<&'static str>,
    /// Whether this attribute is the primary key
    pub id: bool,
    pub kind: AttributeKind,
}

impl AttributeDecl {
    /// A scalar column with default length, nullable and not unique.
    pub const fn column(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            column: None,
            id: false,
            kind: AttributeKind::Column(ColumnDecl {
                sql_type,
                nullable: true,
                unique: false,
                length: DEFAULT_LENGTH,
            }),
        }
    }

    pub const fn to_one(name: &'static str, relation: RelationDecl) -> Self {
        Self {
            name,
            column: None,
            id: false,
            kind: AttributeKind::ToOne(relation),
        }
    }

    pub const fn to_many(name: &'static str) -> Self {
        Self {
            name,
            column: None,
            id: false,
            kind: AttributeKind::ToMany,
        }
    }

    pub const fn transient(name: &'static str) -> Self {
        Self {
            name,
            column: None,
            id: false,
            kind: AttributeKind::Transient,
        }
    }

    /// Mark this attribute as the primary key.
    pub const fn id(mut self) -> Self {
        self.id = true;
        self
    }

    /// Override the column name.
    pub const fn named(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    pub const fn nullable(mut self, nullable: bool) -> Self {
        if let AttributeKind::Column(ref mut column) = self.kind {
            column.nullable = nullable;
        }
        self
    }

    pub const fn unique(mut self) -> Self {
        if let AttributeKind::Column(ref mut column) = self.kind {
            column.unique = true;
        }
        self
    }

    pub const fn length(mut self, length: u32) -> Self {
        if let AttributeKind::Column(ref mut column) = self.kind {
            column.length = length;
        }
        self
    }

    /// Whether the attribute takes part in persistence and dirty checking.
    pub const fn is_persistent(&self) -> bool {
        matches!(self.kind, AttributeKind::Column(_) | AttributeKind::ToOne(_))
    }
}
