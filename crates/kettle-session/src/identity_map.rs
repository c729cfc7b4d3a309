//! Identity Map pattern for tracking unique object instances per primary key.
//!
//! Within one unit of work every (entity type, primary key) pair maps to at
//! most one instance. Entries hold the shared handle itself, so a lookup
//! hands back the very same `Arc` that was registered.

use chrono::{NaiveDate, NaiveDateTime};
use kettle_core::model::downcast;
use kettle_core::{AnyModel, Model, ModelRef, Value};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Hashable, normalized form of a primary-key value.
///
/// All integer widths collapse to one variant, so `Int(5)` and `BigInt(5)`
/// name the same row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PkKey {
    Integer(i64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
    /// Bit pattern of a floating-point key
    Double(u64),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl PkKey {
    /// Normalize a key value. NULL is not an identity and yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Null => return None,
            Value::Int(v) => PkKey::Integer(i64::from(*v)),
            Value::BigInt(v) => PkKey::Integer(*v),
            Value::Bool(v) => PkKey::Bool(*v),
            Value::Text(v) => PkKey::Text(v.clone()),
            Value::Bytes(v) => PkKey::Bytes(v.clone()),
            Value::Double(v) => PkKey::Double(v.to_bits()),
            Value::Date(v) => PkKey::Date(*v),
            Value::Timestamp(v) => PkKey::Timestamp(*v),
        })
    }
}

/// Key of an identity-map entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    type_id: TypeId,
    pk: PkKey,
}

impl IdentityKey {
    /// Key for entity type `type_id` with primary key `pk`; `None` for NULL.
    pub fn new(type_id: TypeId, pk: &Value) -> Option<Self> {
        PkKey::from_value(pk).map(|pk| Self { type_id, pk })
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn pk(&self) -> &PkKey {
        &self.pk
    }
}

/// Identity Map for tracking unique object instances.
#[derive(Default)]
pub struct IdentityMap {
    entries: HashMap<IdentityKey, Arc<dyn AnyModel>>,
}

impl IdentityMap {
    /// Create a new empty identity map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entity` under `pk`.
    ///
    /// If another instance is already registered for the same key, the
    /// existing one is kept and returned; otherwise `entity` is returned.
    /// A NULL key registers nothing.
    pub fn insert(&mut self, pk: &Value, entity: Arc<dyn AnyModel>) -> Arc<dyn AnyModel> {
        let Some(key) = IdentityKey::new(entity.model_type_id(), pk) else {
            return entity;
        };
        Arc::clone(self.entries.entry(key).or_insert(entity))
    }

    /// Look up the instance of entity type `type_id` with primary key `pk`.
    pub fn get(&self, type_id: TypeId, pk: &Value) -> Option<Arc<dyn AnyModel>> {
        let key = IdentityKey::new(type_id, pk)?;
        self.entries.get(&key).cloned()
    }

    /// Typed lookup.
    pub fn get_typed<M: Model>(&self, pk: &Value) -> Option<ModelRef<M>> {
        let found = self.get(TypeId::of::<M>(), pk)?;
        downcast::<M>(found).ok()
    }

    /// Check if an instance with the given key exists in the map.
    pub fn contains(&self, type_id: TypeId, pk: &Value) -> bool {
        IdentityKey::new(type_id, pk).is_some_and(|key| self.entries.contains_key(&key))
    }

    /// Clear all entries from the identity map.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Get the number of entries in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for IdentityMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityMap")
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Author, Book};
    use kettle_core::model::erase;
    use kettle_core::model_ref;

    fn author(id: i64) -> ModelRef<Author> {
        model_ref(Author {
            id: Some(id),
            name: format!("author-{id}"),
            ..Author::default()
        })
    }

    #[test]
    fn integer_widths_share_a_key() {
        assert_eq!(
            PkKey::from_value(&Value::Int(5)),
            PkKey::from_value(&Value::BigInt(5))
        );
        assert!(PkKey::from_value(&Value::Null).is_none());
    }

    #[test]
    fn same_key_returns_same_instance() {
        let mut map = IdentityMap::new();
        let a = author(1);
        map.insert(&Value::BigInt(1), erase(&a));

        let found = map.get_typed::<Author>(&Value::Int(1)).unwrap();
        assert!(Arc::ptr_eq(&found, &a));
    }

    #[test]
    fn first_registration_wins() {
        let mut map = IdentityMap::new();
        let first = author(1);
        let second = author(1);
        map.insert(&Value::BigInt(1), erase(&first));
        let kept = map.insert(&Value::BigInt(1), erase(&second));
        assert!(Arc::ptr_eq(&downcast::<Author>(kept).unwrap(), &first));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn types_have_separate_namespaces() {
        let mut map = IdentityMap::new();
        map.insert(&Value::BigInt(1), erase(&author(1)));
        assert!(map.contains(TypeId::of::<Author>(), &Value::BigInt(1)));
        assert!(!map.contains(TypeId::of::<Book>(), &Value::BigInt(1)));
        assert!(map.get_typed::<Book>(&Value::BigInt(1)).is_none());
    }

    #[test]
    fn null_key_is_not_registered() {
        let mut map = IdentityMap::new();
        map.insert(&Value::Null, erase(&model_ref(Author::default())));
        assert!(map.is_empty());
    }

    #[test]
    fn clear_drops_every_entry() {
        let mut map = IdentityMap::new();
        map.insert(&Value::BigInt(1), erase(&author(1)));
        map.insert(&Value::BigInt(2), erase(&author(2)));
        assert_eq!(map.len(), 2);
        map.clear();
        assert!(map.is_empty());
    }
}
