//! Change tracking and dirty detection.
//!
//! A snapshot freezes the comparable view of every persistent attribute at
//! the moment an entity becomes managed: scalars as their value, to-one
//! relationships as the related entity's primary key. Dirty checking
//! compares the live view against it, so replacing a related object with a
//! different instance carrying the same key is not a change.

use kettle_core::{AnyModel, EntityId, Result, Value};
use std::collections::HashMap;

/// Snapshot of an entity's persistent state.
#[derive(Debug, Clone)]
pub struct EntitySnapshot {
    values: Vec<(&'static str, Value)>,
}

impl EntitySnapshot {
    /// Capture the comparable view of every persistent attribute.
    pub fn capture(entity: &dyn AnyModel) -> Result<Self> {
        let meta = entity.metadata()?;
        let mut values = Vec::with_capacity(meta.mappings().len());
        for mapping in meta.mappings() {
            let value = entity.read_attribute(mapping.attribute())?.comparable()?;
            values.push((mapping.attribute(), value));
        }
        Ok(Self { values })
    }

    /// Frozen value of an attribute.
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| *name == attribute)
            .map(|(_, value)| value)
    }

    /// Iterate over (attribute, value) pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }
}

/// Tracks snapshots of managed entities.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    snapshots: HashMap<EntityId, EntitySnapshot>,
}

impl ChangeTracker {
    /// Create a new empty change tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take (or replace) the snapshot of an entity.
    #[tracing::instrument(level = "trace", skip(self, entity), fields(entity = entity.model_name()))]
    pub fn snapshot(&mut self, id: EntityId, entity: &dyn AnyModel) -> Result<()> {
        let snapshot = EntitySnapshot::capture(entity)?;
        tracing::trace!(attributes = snapshot.values.len(), "Taking entity snapshot");
        self.snapshots.insert(id, snapshot);
        Ok(())
    }

    /// Get the snapshot of an entity.
    pub fn get(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.snapshots.get(&id)
    }

    /// Check if an entity has changed since its snapshot.
    ///
    /// Returns `true` if:
    /// - the entity has no snapshot
    /// - any persistent attribute differs from the snapshot
    /// - an attribute cannot be read
    pub fn is_dirty(&self, id: EntityId, entity: &dyn AnyModel) -> bool {
        let Some(snapshot) = self.snapshots.get(&id) else {
            tracing::trace!(entity = entity.model_name(), "No snapshot - treating as dirty");
            return true;
        };

        let dirty = match self.first_change(snapshot, entity) {
            Ok(changed) => changed.is_some(),
            Err(e) => {
                tracing::trace!(error = %e, "Dirty check failed - treating as dirty");
                true
            }
        };
        tracing::trace!(entity = entity.model_name(), dirty, "Dirty check result");
        dirty
    }

    /// Attributes whose current value differs from the snapshot.
    pub fn changed_attributes(&self, id: EntityId, entity: &dyn AnyModel) -> Result<Vec<&'static str>> {
        let Some(snapshot) = self.snapshots.get(&id) else {
            let meta = entity.metadata()?;
            return Ok(meta.mappings().iter().map(|m| m.attribute()).collect());
        };
        let mut changed = Vec::new();
        for (attribute, frozen) in snapshot.iter() {
            if entity.read_attribute(attribute)?.comparable()? != *frozen {
                changed.push(attribute);
            }
        }
        Ok(changed)
    }

    fn first_change(
        &self,
        snapshot: &EntitySnapshot,
        entity: &dyn AnyModel,
    ) -> Result<Option<&'static str>> {
        for (attribute, frozen) in snapshot.iter() {
            if entity.read_attribute(attribute)?.comparable()? != *frozen {
                return Ok(Some(attribute));
            }
        }
        Ok(None)
    }

    /// Clear all snapshots.
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
