//! Row-to-entity mapping.
//!
//! [`AutoRowMapper`] builds entities from result rows using their resolved
//! metadata. Eager to-one relationships are loaded with nested primary-key
//! lookups on the same connection; lazy ones keep only the foreign key.
//!
//! Every instance a mapper produces is recorded in its fetch scope, keyed
//! by (type, primary key), before its own relationships are resolved. A row
//! whose identity is already in scope resolves to the existing instance,
//! which both preserves identity within one fetch and stops mutually
//! referencing eager relationships from recursing forever.
//!
//! Types with a registered [`RowMapper`] bypass auto-mapping entirely.

use crate::identity_map::IdentityMap;
use kettle_core::error::{PersistenceError, PersistenceErrorKind, TypeError};
use kettle_core::model::{downcast, erase};
use kettle_core::{
    AnyModel, AttributeValue, Connection, EntityTarget, EntityType, Error, FetchMode, Mapping,
    Model, ModelRef, RelatedValue, Result, Row, Value, model_ref,
};
use kettle_schema::{Dialect, statement};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Custom conversion of a result row into an entity.
///
/// Closures `Fn(&Row) -> Result<M>` implement this trait.
pub trait RowMapper<M: Model>: Send + Sync {
    fn map_row(&self, row: &Row) -> Result<M>;
}

impl<M, F> RowMapper<M> for F
where
    M: Model,
    F: Fn(&Row) -> Result<M> + Send + Sync,
{
    fn map_row(&self, row: &Row) -> Result<M> {
        self(row)
    }
}

/// Type-erased view of a registered mapper.
trait ErasedRowMapper: Send + Sync {
    fn map_erased(&self, row: &Row) -> Result<Arc<dyn AnyModel>>;
}

struct Registered<M: Model> {
    mapper: Arc<dyn RowMapper<M>>,
}

impl<M: Model> ErasedRowMapper for Registered<M> {
    fn map_erased(&self, row: &Row) -> Result<Arc<dyn AnyModel>> {
        Ok(erase(&model_ref(self.mapper.map_row(row)?)))
    }
}

/// Custom row mappers, keyed by entity type.
#[derive(Default)]
pub struct MapperRegistry {
    mappers: RwLock<HashMap<TypeId, Arc<dyn ErasedRowMapper>>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `mapper` for `M`, replacing any earlier registration.
    pub fn register<M: Model>(&self, mapper: impl RowMapper<M> + 'static) {
        let entry: Arc<dyn ErasedRowMapper> = Arc::new(Registered::<M> {
            mapper: Arc::new(mapper),
        });
        self.mappers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<M>(), entry);
        tracing::debug!(entity = M::NAME, "Registered custom row mapper");
    }

    /// Whether a custom mapper is registered for `M`.
    pub fn contains<M: Model>(&self) -> bool {
        self.get(TypeId::of::<M>()).is_some()
    }

    fn get(&self, type_id: TypeId) -> Option<Arc<dyn ErasedRowMapper>> {
        self.mappers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.mappers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperRegistry")
            .field("mappers", &self.len())
            .finish()
    }
}

/// Instances seen during one fetch.
struct FetchScope<'a> {
    /// Session identity map consulted before anything is loaded
    known: Option<&'a IdentityMap>,
    loaded: IdentityMap,
    order: Vec<Arc<dyn AnyModel>>,
}

impl FetchScope<'_> {
    fn get(&self, type_id: TypeId, pk: &Value) -> Option<Arc<dyn AnyModel>> {
        self.known
            .and_then(|known| known.get(type_id, pk))
            .or_else(|| self.loaded.get(type_id, pk))
    }

    fn record(&mut self, pk: &Value, entity: &Arc<dyn AnyModel>) {
        self.loaded.insert(pk, Arc::clone(entity));
        self.order.push(Arc::clone(entity));
    }
}

/// Maps result rows into entities, loading eager relationships.
pub struct AutoRowMapper<'a> {
    conn: &'a mut dyn Connection,
    dialect: &'a dyn Dialect,
    mappers: &'a MapperRegistry,
    scope: FetchScope<'a>,
}

impl<'a> AutoRowMapper<'a> {
    pub fn new(
        conn: &'a mut dyn Connection,
        dialect: &'a dyn Dialect,
        mappers: &'a MapperRegistry,
    ) -> Self {
        Self {
            conn,
            dialect,
            mappers,
            scope: FetchScope {
                known: None,
                loaded: IdentityMap::new(),
                order: Vec::new(),
            },
        }
    }

    /// Resolve identities against `known` before creating new instances.
    #[must_use]
    pub fn with_identity(mut self, known: &'a IdentityMap) -> Self {
        self.scope.known = Some(known);
        self
    }

    /// Map one row into an `M`.
    pub fn map_row<M: Model>(&mut self, row: &Row) -> Result<ModelRef<M>> {
        let entity = self.map_erased(EntityType::of::<M>(), row)?;
        downcast::<M>(entity).map_err(|e| Error::mapping(M::NAME, e))
    }

    /// Map every row into an `M`.
    pub fn map_rows<M: Model>(&mut self, rows: &[Row]) -> Result<Vec<ModelRef<M>>> {
        rows.iter().map(|row| self.map_row::<M>(row)).collect()
    }

    /// Load an `M` by primary key.
    pub fn find<M: Model>(&mut self, id: Value) -> Result<Option<ModelRef<M>>> {
        match self.load(EntityType::of::<M>(), id)? {
            Some(entity) => Ok(Some(
                downcast::<M>(entity).map_err(|e| Error::mapping(M::NAME, e))?,
            )),
            None => Ok(None),
        }
    }

    /// Instances created by this mapper, in creation order. Instances that
    /// were resolved from the seeded identity map are not included.
    pub fn into_loaded(self) -> Vec<Arc<dyn AnyModel>> {
        self.scope.order
    }

    fn map_erased(&mut self, target: EntityType, row: &Row) -> Result<Arc<dyn AnyModel>> {
        self.map_erased_inner(target, row)
            .map_err(|e| Error::mapping(target.name(), e))
    }

    fn map_erased_inner(&mut self, target: EntityType, row: &Row) -> Result<Arc<dyn AnyModel>> {
        if let Some(custom) = self.mappers.get(target.type_id()) {
            let entity = custom.map_erased(row)?;
            let pk = kettle_core::primary_key_of(entity.as_ref())?;
            self.scope.record(&pk, &entity);
            return Ok(entity);
        }

        let meta = target.metadata()?;
        let pk_meta = meta.primary_key();
        let pk = column(row, &pk_meta.column)?.clone().coerce(pk_meta.sql_type)?;
        if let Some(existing) = self.scope.get(target.type_id(), &pk) {
            return Ok(existing);
        }

        let entity = target.instantiate();
        if !pk.is_null() {
            entity.write_attribute(pk_meta.attribute, AttributeValue::Scalar(pk.clone()))?;
        }
        self.scope.record(&pk, &entity);

        for mapping in meta.non_key_mappings() {
            match mapping {
                Mapping::Column(c) => {
                    let value = column(row, &c.column)?.clone();
                    if value.is_null() {
                        continue;
                    }
                    let value = value.coerce(c.sql_type)?;
                    entity.write_attribute(c.attribute, AttributeValue::Scalar(value))?;
                }
                Mapping::Relation(r) => {
                    let fk = column(row, &r.join_column)?.clone();
                    if fk.is_null() {
                        continue;
                    }
                    let value = match (r.target, r.fetch) {
                        (EntityTarget::Scalar(sql_type), _) => {
                            AttributeValue::Scalar(fk.coerce(sql_type)?)
                        }
                        (EntityTarget::Entity(related), fetch) => {
                            // Keys compare by value, so store them in the
                            // target's declared width.
                            let fk = fk.coerce(related.metadata()?.primary_key().sql_type)?;
                            if fetch == FetchMode::Lazy {
                                AttributeValue::Related(RelatedValue::Key(fk))
                            } else {
                                match self.load(related, fk.clone())? {
                                    Some(loaded) => AttributeValue::Related(RelatedValue::Loaded(loaded)),
                                    None => AttributeValue::Related(RelatedValue::Key(fk)),
                                }
                            }
                        }
                    };
                    entity.write_attribute(r.attribute, value)?;
                }
            }
        }

        Ok(entity)
    }

    /// Primary-key lookup of `target`, served from scope when possible.
    fn load(&mut self, target: EntityType, id: Value) -> Result<Option<Arc<dyn AnyModel>>> {
        let meta = target.metadata()?;
        let id = id.coerce(meta.primary_key().sql_type)?;
        if let Some(existing) = self.scope.get(target.type_id(), &id) {
            tracing::trace!(entity = target.name(), "Resolved from fetch scope");
            return Ok(Some(existing));
        }

        let sql = statement::select_by_id(&meta, self.dialect);
        tracing::debug!(sql = %sql, params = 1, "Loading by id");
        let rows = self
            .conn
            .query(&sql, std::slice::from_ref(&id))
            .map_err(|e| Error::persistence(format!("Failed to load {}", target.name()), &sql, e))?;

        match rows.as_slice() {
            [] => Ok(None),
            [row] => self.map_erased(target, row).map(Some),
            _ => Err(too_many_rows(&sql)),
        }
    }
}

fn column<'r>(row: &'r Row, name: &str) -> Result<&'r Value> {
    row.get_by_name(name).ok_or_else(|| {
        Error::Type(TypeError {
            expected: "column",
            actual: format!("column '{name}' not found"),
            column: Some(name.to_string()),
        })
    })
}

pub(crate) fn too_many_rows(sql: &str) -> Error {
    Error::Persistence(PersistenceError {
        kind: PersistenceErrorKind::TooManyRows,
        message: "Query returned more than 1 row".to_string(),
        sql: Some(sql.to_string()),
        source: None,
    })
}
