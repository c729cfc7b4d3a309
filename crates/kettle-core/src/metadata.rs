//! Entity metadata resolution.
//!
//! Turns a type's static [`AttributeDecl`] table into the resolved
//! [`EntityMetadata`] the rest of the engine works with: table name, column
//! names, the primary key and relationship descriptors. Results are cached
//! process-wide per `TypeId`; the first resolution wins and later calls are
//! read-only lookups.

use crate::Result;
use crate::error::{MetadataError, MetadataErrorKind};
use crate::field::{AttributeDecl, AttributeKind, Cardinality, Cascade, EntityTarget, FetchMode};
use crate::model::Model;
use crate::types::SqlType;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// A resolved scalar column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub attribute: &'static str,
    pub column: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub unique: bool,
    pub length: u32,
    pub primary_key: bool,
}

/// A resolved to-one relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationMeta {
    pub attribute: &'static str,
    pub join_column: String,
    pub target: EntityTarget,
    pub cardinality: Cardinality,
    pub fetch: FetchMode,
    pub cascade: Cascade,
}

/// How a persistent attribute maps onto the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapping {
    Column(ColumnMeta),
    Relation(RelationMeta),
}

impl Mapping {
    pub fn attribute(&self) -> &'static str {
        match self {
            Mapping::Column(c) => c.attribute,
            Mapping::Relation(r) => r.attribute,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Mapping::Column(c) => &c.column,
            Mapping::Relation(r) => &r.join_column,
        }
    }

    fn is_primary_key(&self) -> bool {
        matches!(self, Mapping::Column(c) if c.primary_key)
    }
}

/// Immutable, resolved description of an entity type.
#[derive(Debug)]
pub struct EntityMetadata {
    type_id: TypeId,
    name: &'static str,
    table: String,
    mappings: Vec<Mapping>,
    primary_key: ColumnMeta,
    ignored: Vec<&'static str>,
}

impl EntityMetadata {
    /// Resolve metadata from a declaration table without caching.
    pub fn build(
        type_id: TypeId,
        name: &'static str,
        table: Option<&'static str>,
        attributes: &[AttributeDecl],
    ) -> Result<Self> {
        let table = table.map_or_else(|| name.to_lowercase(), str::to_string);
        let mut mappings = Vec::with_capacity(attributes.len());
        let mut ignored = Vec::new();
        let mut primary_key = None;
        let mut seen_columns = HashSet::new();

        for decl in attributes {
            let column = decl
                .column
                .map_or_else(|| decl.name.to_lowercase(), str::to_string);

            let mapping = match decl.kind {
                AttributeKind::Transient | AttributeKind::ToMany => {
                    ignored.push(decl.name);
                    continue;
                }
                AttributeKind::Column(c) => Mapping::Column(ColumnMeta {
                    attribute: decl.name,
                    column,
                    sql_type: c.sql_type,
                    nullable: c.nullable && !decl.id,
                    unique: c.unique,
                    length: c.length,
                    primary_key: decl.id,
                }),
                AttributeKind::ToOne(r) => Mapping::Relation(RelationMeta {
                    attribute: decl.name,
                    join_column: r.join_column.to_string(),
                    target: r.target,
                    cardinality: r.cardinality,
                    fetch: r.fetch,
                    cascade: r.cascade,
                }),
            };

            if decl.id {
                if !matches!(mapping, Mapping::Column(_)) {
                    return Err(MetadataError::new(
                        MetadataErrorKind::InvalidAttribute,
                        name,
                        format!("{name}.{} is a relationship and cannot be the id", decl.name),
                    )
                    .into());
                }
                if primary_key.is_some() {
                    return Err(MetadataError::new(
                        MetadataErrorKind::MultiplePrimaryKeys,
                        name,
                        format!("Multiple ids declared in {name}"),
                    )
                    .into());
                }
                if let Mapping::Column(c) = &mapping {
                    primary_key = Some(c.clone());
                }
            }

            if !seen_columns.insert(mapping.column().to_lowercase()) {
                return Err(MetadataError::new(
                    MetadataErrorKind::DuplicateColumn,
                    name,
                    format!("Column '{}' is mapped twice in {name}", mapping.column()),
                )
                .into());
            }

            mappings.push(mapping);
        }

        let primary_key = primary_key.ok_or_else(|| {
            MetadataError::new(
                MetadataErrorKind::MissingPrimaryKey,
                name,
                format!("No id found in {name}"),
            )
        })?;

        Ok(Self {
            type_id,
            name,
            table,
            mappings,
            primary_key,
            ignored,
        })
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The primary-key column.
    pub fn primary_key(&self) -> &ColumnMeta {
        &self.primary_key
    }

    /// Every persistent attribute in declaration order, key included.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Persistent attributes other than the primary key.
    pub fn non_key_mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.iter().filter(|m| !m.is_primary_key())
    }

    /// To-one relationships.
    pub fn relations(&self) -> impl Iterator<Item = &RelationMeta> {
        self.mappings.iter().filter_map(|m| match m {
            Mapping::Relation(r) => Some(r),
            Mapping::Column(_) => None,
        })
    }

    /// Look up the mapping of a persistent attribute.
    pub fn mapping(&self, attribute: &str) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.attribute() == attribute)
    }

    /// Whether the attribute is transient or a to-many collection.
    pub fn is_ignored(&self, attribute: &str) -> bool {
        self.ignored.iter().any(|name| *name == attribute)
    }
}

type Registry = RwLock<HashMap<TypeId, Arc<EntityMetadata>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Resolve the metadata of entity type `M`, caching the result.
///
/// Resolution failures are not cached; a broken declaration fails again on
/// every call.
pub fn resolve<M: Model>() -> Result<Arc<EntityMetadata>> {
    let type_id = TypeId::of::<M>();

    // Cached entries are immutable, so a poisoned lock still holds valid data.
    if let Some(meta) = registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&type_id)
    {
        return Ok(Arc::clone(meta));
    }

    let meta = Arc::new(EntityMetadata::build(
        type_id,
        M::NAME,
        M::TABLE,
        M::attributes(),
    )?);
    tracing::debug!(
        entity = M::NAME,
        table = meta.table(),
        columns = meta.mappings().len(),
        "Resolved entity metadata"
    );

    let mut cache = registry().write().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(cache.entry(type_id).or_insert(meta)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{EntityType, RelationDecl};
    use crate::testing::{Account, Team};

    struct Marker;

    fn build(attributes: &[AttributeDecl]) -> Result<EntityMetadata> {
        EntityMetadata::build(TypeId::of::<Marker>(), "Marker", None, attributes)
    }

    #[test]
    fn table_defaults_to_lowercased_name() {
        let meta = resolve::<Team>().unwrap();
        assert_eq!(meta.table(), "team");
        assert_eq!(meta.primary_key().column, "id");
    }

    #[test]
    fn declared_table_and_columns() {
        let meta = resolve::<Account>().unwrap();
        assert_eq!(meta.table(), "accounts");
        assert_eq!(meta.mapping("userName").unwrap().column(), "username");
        assert!(meta.is_ignored("login_attempts"));
        assert!(meta.is_ignored("sessions"));
        assert!(meta.mapping("login_attempts").is_none());

        let team = meta.relations().next().unwrap();
        assert_eq!(team.attribute, "team");
        assert_eq!(team.join_column, "team_id");
        assert!(team.cascade.persist);
    }

    #[test]
    fn non_key_mappings_skip_the_id() {
        let meta = resolve::<Account>().unwrap();
        let attrs: Vec<_> = meta.non_key_mappings().map(Mapping::attribute).collect();
        assert_eq!(attrs, vec!["userName", "active", "team"]);
    }

    #[test]
    fn resolution_is_cached() {
        let a = resolve::<Account>().unwrap();
        let b = resolve::<Account>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn concurrent_first_resolution_agrees() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| resolve::<Team>().unwrap()))
            .collect();
        let metas: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for meta in &metas[1..] {
            assert!(Arc::ptr_eq(&metas[0], meta));
        }
    }

    #[test]
    fn missing_primary_key() {
        let err = build(&[AttributeDecl::column("name", SqlType::Text)]).unwrap_err();
        match err {
            crate::Error::Metadata(e) => {
                assert_eq!(e.kind, MetadataErrorKind::MissingPrimaryKey);
                assert_eq!(e.entity, "Marker");
            }
            other => panic!("expected metadata error, got {other:?}"),
        }
    }

    #[test]
    fn two_primary_keys() {
        let err = build(&[
            AttributeDecl::column("a", SqlType::BigInt).id(),
            AttributeDecl::column("b", SqlType::BigInt).id(),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Metadata(MetadataError {
                kind: MetadataErrorKind::MultiplePrimaryKeys,
                ..
            })
        ));
    }

    #[test]
    fn duplicate_columns() {
        let err = build(&[
            AttributeDecl::column("id", SqlType::BigInt).id(),
            AttributeDecl::column("name", SqlType::Text),
            AttributeDecl::column("alias", SqlType::Text).named("NAME"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Metadata(MetadataError {
                kind: MetadataErrorKind::DuplicateColumn,
                ..
            })
        ));
    }

    #[test]
    fn primary_key_is_not_nullable() {
        let meta = build(&[AttributeDecl::column("id", SqlType::BigInt).id()]).unwrap();
        assert!(!meta.primary_key().nullable);
    }

    #[test]
    fn relationship_cannot_be_id() {
        let decl = AttributeDecl::to_one(
            "team",
            RelationDecl::many_to_one(EntityType::of::<Team>(), "team_id"),
        )
        .id();
        assert!(build(&[decl]).is_err());
    }
}
