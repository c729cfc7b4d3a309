//! Model trait for entity-to-table mapping.
//!
//! The `Model` trait defines the contract for structs that can be
//! mapped to database tables. It is typically derived using the
//! `#[derive(Model)]` macro from `kettle-macros`.

use crate::Result;
use crate::error::{Error, MetadataError, MetadataErrorKind};
use crate::field::AttributeDecl;
use crate::metadata::{self, EntityMetadata};
use crate::value::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Trait for types that can be mapped to database tables.
///
/// # Example
///
/// ```ignore
/// use kettle::Model;
///
/// #[derive(Model, Default)]
/// #[kettle(table = "users")]
/// struct User {
///     #[kettle(id)]
///     id: Option<i64>,
///     #[kettle(unique, length = 64)]
///     username: String,
///     password: String,
/// }
/// ```
pub trait Model: Default + Send + Sync + 'static {
    /// Simple type name, used for the default table name and in errors.
    const NAME: &'static str;

    /// Declared table name. `None` means the lowercased type name.
    const TABLE: Option<&'static str> = None;

    /// Static declaration of every attribute, in declaration order.
    fn attributes() -> &'static [AttributeDecl];

    /// Read the current value of a persistent attribute.
    fn read(&self, attribute: &str) -> Result<AttributeValue>;

    /// Assign a persistent attribute.
    fn write(&mut self, attribute: &str, value: AttributeValue) -> Result<()>;
}

/// A shared, lockable entity instance.
///
/// Sessions hand out and track entities through this handle; two handles
/// refer to the same entity exactly when `Arc::ptr_eq` holds.
pub type ModelRef<M> = Arc<RwLock<M>>;

/// Wrap an entity value in a [`ModelRef`].
pub fn model_ref<M: Model>(model: M) -> ModelRef<M> {
    Arc::new(RwLock::new(model))
}

/// Value of a persistent attribute as seen by the engine.
#[derive(Clone)]
pub enum AttributeValue {
    Scalar(Value),
    Related(RelatedValue),
}

/// Type-erased state of a to-one relationship.
#[derive(Clone)]
pub enum RelatedValue {
    /// No related entity.
    Empty,
    /// Only the foreign-key value is known (lazy fetch).
    Key(Value),
    /// The related entity is loaded.
    Loaded(Arc<dyn AnyModel>),
}

impl AttributeValue {
    /// Unwrap a scalar, failing for relationship values.
    pub fn into_scalar(self, entity: &'static str, attribute: &str) -> Result<Value> {
        match self {
            AttributeValue::Scalar(v) => Ok(v),
            AttributeValue::Related(_) => Err(invalid_attribute(
                entity,
                format!("{entity}.{attribute} is a relationship, not a column"),
            )),
        }
    }

    /// Unwrap a relationship value. A scalar is taken as a foreign key.
    pub fn into_related(self) -> RelatedValue {
        match self {
            AttributeValue::Related(r) => r,
            AttributeValue::Scalar(Value::Null) => RelatedValue::Empty,
            AttributeValue::Scalar(v) => RelatedValue::Key(v),
        }
    }

    /// The comparable representation used for snapshots and dirty
    /// checking: the value itself for scalars, the related entity's primary
    /// key for relationships.
    pub fn comparable(&self) -> Result<Value> {
        match self {
            AttributeValue::Scalar(v) => Ok(v.clone()),
            AttributeValue::Related(r) => r.key(),
        }
    }
}

impl RelatedValue {
    /// Foreign-key value this relationship stands for.
    pub fn key(&self) -> Result<Value> {
        match self {
            RelatedValue::Empty => Ok(Value::Null),
            RelatedValue::Key(v) => Ok(v.clone()),
            RelatedValue::Loaded(entity) => primary_key_of(entity.as_ref()),
        }
    }
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Scalar(v) => f.debug_tuple("Scalar").field(v).finish(),
            AttributeValue::Related(r) => f.debug_tuple("Related").field(r).finish(),
        }
    }
}

impl fmt::Debug for RelatedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelatedValue::Empty => write!(f, "Empty"),
            RelatedValue::Key(v) => f.debug_tuple("Key").field(v).finish(),
            RelatedValue::Loaded(e) => f.debug_tuple("Loaded").field(&e.model_name()).finish(),
        }
    }
}

pub(crate) fn invalid_attribute(entity: &'static str, message: String) -> Error {
    Error::Metadata(MetadataError::new(
        MetadataErrorKind::InvalidAttribute,
        entity,
        message,
    ))
}

/// Object-safe view of a `RwLock<M>` so sessions can track entities of
/// different types side by side.
pub trait AnyModel: Send + Sync {
    /// `TypeId` of the entity type (not of the lock).
    fn model_type_id(&self) -> TypeId;

    fn model_name(&self) -> &'static str;

    fn metadata(&self) -> Result<Arc<EntityMetadata>>;

    fn read_attribute(&self, attribute: &str) -> Result<AttributeValue>;

    fn write_attribute(&self, attribute: &str, value: AttributeValue) -> Result<()>;

    /// Upcast for downcasting back to `RwLock<M>`.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<M: Model> AnyModel for RwLock<M> {
    fn model_type_id(&self) -> TypeId {
        TypeId::of::<M>()
    }

    fn model_name(&self) -> &'static str {
        M::NAME
    }

    fn metadata(&self) -> Result<Arc<EntityMetadata>> {
        metadata::resolve::<M>()
    }

    fn read_attribute(&self, attribute: &str) -> Result<AttributeValue> {
        let guard = self.read().map_err(|_| poisoned(M::NAME))?;
        guard.read(attribute)
    }

    fn write_attribute(&self, attribute: &str, value: AttributeValue) -> Result<()> {
        let mut guard = self.write().map_err(|_| poisoned(M::NAME))?;
        guard.write(attribute, value)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

fn poisoned(entity: &'static str) -> Error {
    Error::Custom(format!("{entity} lock poisoned"))
}

/// Erase a typed handle.
pub fn erase<M: Model>(entity: &ModelRef<M>) -> Arc<dyn AnyModel> {
    Arc::clone(entity) as Arc<dyn AnyModel>
}

/// A default-constructed entity behind an erased handle.
pub fn new_instance<M: Model>() -> Arc<dyn AnyModel> {
    erase(&model_ref(M::default()))
}

/// Recover a typed handle from an erased one.
pub fn downcast<M: Model>(entity: Arc<dyn AnyModel>) -> Result<ModelRef<M>> {
    let name = entity.model_name();
    entity.into_any().downcast::<RwLock<M>>().map_err(|_| {
        invalid_attribute(
            M::NAME,
            format!("expected an instance of {}, got {}", M::NAME, name),
        )
    })
}

/// Identity of a tracked entity: the address of its shared allocation.
///
/// Only meaningful while a strong reference is held, which the persistence
/// context guarantees for everything it tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(usize);

impl EntityId {
    pub fn of(entity: &Arc<dyn AnyModel>) -> Self {
        Self(Arc::as_ptr(entity).cast::<()>() as usize)
    }

    pub fn of_ref<M: Model>(entity: &ModelRef<M>) -> Self {
        Self(Arc::as_ptr(entity).cast::<()>() as usize)
    }
}

/// Read the primary-key value of an erased entity.
pub fn primary_key_of(entity: &dyn AnyModel) -> Result<Value> {
    let meta = entity.metadata()?;
    let pk = meta.primary_key();
    entity
        .read_attribute(pk.attribute)?
        .into_scalar(meta.name(), pk.attribute)
}

/// Write the primary-key value of an erased entity.
pub fn set_primary_key(entity: &dyn AnyModel, value: Value) -> Result<()> {
    let meta = entity.metadata()?;
    let pk = meta.primary_key();
    let value = value.coerce(pk.sql_type)?;
    entity.write_attribute(pk.attribute, AttributeValue::Scalar(value))
}
