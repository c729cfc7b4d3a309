//! Persistence context: the per-session record of tracked entities.
//!
//! Holds three things for the lifetime of one unit of work:
//!
//! - the lifecycle state of every tracked entity, keyed by identity
//! - the identity map of managed entities, keyed by (type, primary key)
//! - snapshots of managed entities for dirty checking
//!
//! Tracked entities are kept in first-scheduled order so commit phases run
//! in the order callers scheduled them.

use crate::change_tracker::ChangeTracker;
use crate::identity_map::IdentityMap;
use kettle_core::error::{PersistenceError, PersistenceErrorKind};
use kettle_core::{AnyModel, EntityId, Error, Result, primary_key_of};
use std::collections::HashMap;
use std::sync::Arc;

/// Lifecycle state of a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// Scheduled for insertion
    New,
    /// Has an identity and participates in dirty checking
    Managed,
    /// Scheduled for deletion
    Removed,
}

struct Tracked {
    entity: Arc<dyn AnyModel>,
    state: EntityState,
}

/// Tracks entity states, identities and snapshots for one session.
#[derive(Default)]
pub struct PersistenceContext {
    tracked: Vec<Tracked>,
    index: HashMap<EntityId, usize>,
    identity: IdentityMap,
    changes: ChangeTracker,
}

impl PersistenceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `entity` managed: register it in the identity map and capture a
    /// fresh snapshot.
    ///
    /// Fails when the entity has no primary-key value yet, or when another
    /// instance is already managed under the same key.
    pub fn manage(&mut self, entity: Arc<dyn AnyModel>) -> Result<()> {
        let pk = primary_key_of(entity.as_ref())?;
        if pk.is_null() {
            return Err(Error::Persistence(PersistenceError {
                kind: PersistenceErrorKind::NullPrimaryKey,
                message: format!("Cannot manage {} without an ID", entity.model_name()),
                sql: None,
                source: None,
            }));
        }

        let registered = self.identity.insert(&pk, Arc::clone(&entity));
        if !Arc::ptr_eq(&registered, &entity) {
            return Err(Error::Persistence(PersistenceError {
                kind: PersistenceErrorKind::DuplicateIdentity,
                message: format!(
                    "Another instance of {} with the same ID is already managed",
                    entity.model_name()
                ),
                sql: None,
                source: None,
            }));
        }

        let id = EntityId::of(&entity);
        self.changes.snapshot(id, entity.as_ref())?;
        self.set_state(entity, EntityState::Managed);
        Ok(())
    }

    /// Schedule `entity` for insertion unless it is already tracked.
    pub fn schedule_for_insertion(&mut self, entity: Arc<dyn AnyModel>) {
        if !self.index.contains_key(&EntityId::of(&entity)) {
            self.set_state(entity, EntityState::New);
        }
    }

    /// Schedule `entity` for deletion, whatever its current state.
    pub fn schedule_for_removal(&mut self, entity: Arc<dyn AnyModel>) {
        self.set_state(entity, EntityState::Removed);
    }

    fn set_state(&mut self, entity: Arc<dyn AnyModel>, state: EntityState) {
        let id = EntityId::of(&entity);
        match self.index.get(&id) {
            Some(&slot) => self.tracked[slot].state = state,
            None => {
                self.index.insert(id, self.tracked.len());
                self.tracked.push(Tracked { entity, state });
            }
        }
    }

    /// Lifecycle state of a tracked entity.
    pub fn state_of(&self, id: EntityId) -> Option<EntityState> {
        self.index.get(&id).map(|&slot| self.tracked[slot].state)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Whether a tracked entity differs from its snapshot.
    ///
    /// Entities without a snapshot (never managed) count as dirty.
    pub fn is_dirty(&self, entity: &Arc<dyn AnyModel>) -> bool {
        self.changes.is_dirty(EntityId::of(entity), entity.as_ref())
    }

    /// Entities currently in `state`, in scheduling order.
    pub fn entities_in(&self, state: EntityState) -> Vec<Arc<dyn AnyModel>> {
        self.tracked
            .iter()
            .filter(|t| t.state == state)
            .map(|t| Arc::clone(&t.entity))
            .collect()
    }

    /// The managed instances, keyed by (type, primary key).
    pub fn identity_map(&self) -> &IdentityMap {
        &self.identity
    }

    pub fn change_tracker(&self) -> &ChangeTracker {
        &self.changes
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Forget every entity, identity and snapshot.
    pub fn clear(&mut self) {
        self.tracked.clear();
        self.index.clear();
        self.identity.clear();
        self.changes.clear();
    }
}

impl std::fmt::Debug for PersistenceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceContext")
            .field("tracked", &self.tracked.len())
            .field("identity", &self.identity)
            .field("snapshots", &self.changes.len())
            .finish()
    }
}
