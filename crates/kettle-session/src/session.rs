//! The unit of work.
//!
//! A [`Session`] owns one pooled connection and a fresh
//! [`PersistenceContext`]. Entities enter the context when they are loaded
//! or explicitly scheduled; nothing reaches the database until
//! [`Session::commit`] runs the three flush phases inside the session's
//! transaction:
//!
//! 1. INSERT every `New` entity, write back its key and manage it
//! 2. UPDATE every `Managed` entity that differs from its snapshot
//! 3. DELETE every `Removed` entity
//!
//! Each phase runs in scheduling order. Any failure rolls the whole
//! transaction back. Whatever the outcome, the context is cleared and the
//! session leaves the transaction.

use crate::context::{EntityState, PersistenceContext};
use crate::engine::Engine;
use crate::mapper::AutoRowMapper;
use crate::persister;
use kettle_core::error::{TransactionError, TransactionErrorKind};
use kettle_core::model::erase;
use kettle_core::{
    AnyModel, AttributeValue, EntityId, Error, Model, ModelRef, RelatedValue, Result, Value,
    metadata,
};
use kettle_pool::PooledConnection;
use std::collections::HashSet;
use std::sync::Arc;

/// A unit of work over one pooled connection.
pub struct Session {
    engine: Arc<Engine>,
    conn: PooledConnection,
    context: PersistenceContext,
    transaction_active: bool,
}

impl Session {
    /// Open a session on a connection taken from the engine's pool.
    pub fn new(engine: Arc<Engine>) -> Result<Self> {
        let conn = engine.pool().acquire()?;
        tracing::debug!("Session opened");
        Ok(Self {
            engine,
            conn,
            context: PersistenceContext::new(),
            transaction_active: false,
        })
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Start the transaction that the next commit or rollback ends.
    pub fn begin_transaction(&mut self) -> Result<()> {
        if self.transaction_active {
            return Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::AlreadyActive,
                message: "A transaction is already active in this session".to_string(),
            }));
        }
        self.conn.begin()?;
        self.transaction_active = true;
        tracing::debug!("Transaction started");
        Ok(())
    }

    pub fn is_transaction_active(&self) -> bool {
        self.transaction_active
    }

    /// Flush every tracked change and commit.
    ///
    /// On failure the transaction is rolled back and the cause is returned
    /// as [`Error::CommitFailed`].
    #[tracing::instrument(level = "debug", skip(self), fields(tracked = self.context.len()))]
    pub fn commit(&mut self) -> Result<()> {
        if !self.transaction_active {
            return Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::NotActive,
                message: "No active transaction to commit".to_string(),
            }));
        }

        let outcome = self.flush().and_then(|()| self.conn.commit());
        self.transaction_active = false;
        self.context.clear();

        match outcome {
            Ok(()) => {
                tracing::debug!("Transaction committed");
                Ok(())
            }
            Err(cause) => {
                tracing::debug!(error = %cause, "Commit failed, rolling back");
                if self.conn.in_transaction() {
                    if let Err(e) = self.conn.rollback() {
                        tracing::warn!(error = %e, "Rollback after failed commit also failed");
                    }
                }
                Err(Error::CommitFailed(Box::new(cause)))
            }
        }
    }

    /// Roll back the active transaction and forget every tracked entity.
    ///
    /// Does nothing when no transaction is active.
    pub fn rollback(&mut self) -> Result<()> {
        if !self.transaction_active {
            return Ok(());
        }
        self.transaction_active = false;
        self.context.clear();
        self.conn.rollback()?;
        tracing::debug!("Transaction rolled back");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let dialect = self.engine.dialect();

        for entity in self.context.entities_in(EntityState::New) {
            persister::insert(&mut *self.conn, dialect, entity.as_ref())?;
            self.context.manage(entity)?;
        }

        let mut updated = 0_usize;
        for entity in self.context.entities_in(EntityState::Managed) {
            if self.context.is_dirty(&entity) {
                persister::update(&mut *self.conn, dialect, entity.as_ref())?;
                self.context.manage(entity)?;
                updated += 1;
            }
        }

        let removed = self.context.entities_in(EntityState::Removed);
        for entity in &removed {
            persister::delete(&mut *self.conn, dialect, entity.as_ref())?;
        }

        tracing::debug!(updated, deleted = removed.len(), "Flush complete");
        Ok(())
    }

    // ========================================================================
    // Unit of work
    // ========================================================================

    /// Schedule `entity` for insertion.
    ///
    /// Related entities reached through cascade-persist relationships are
    /// persisted first, so they are inserted before `entity`. Entities that
    /// are already managed are left alone.
    #[tracing::instrument(level = "debug", skip(self, entity), fields(entity = M::NAME))]
    pub fn persist<M: Model>(&mut self, entity: &ModelRef<M>) -> Result<()> {
        let mut visited = HashSet::new();
        self.cascade_persist(erase(entity), &mut visited)
    }

    fn cascade_persist(
        &mut self,
        entity: Arc<dyn AnyModel>,
        visited: &mut HashSet<EntityId>,
    ) -> Result<()> {
        let id = EntityId::of(&entity);
        if !visited.insert(id) {
            return Ok(());
        }
        if self.context.state_of(id) == Some(EntityState::Managed) {
            tracing::trace!(entity = entity.model_name(), "Already managed");
            return Ok(());
        }

        let meta = entity.metadata()?;
        for relation in meta.relations() {
            if !relation.cascade.persist {
                continue;
            }
            if let AttributeValue::Related(RelatedValue::Loaded(related)) =
                entity.read_attribute(relation.attribute)?
            {
                self.cascade_persist(related, visited)?;
            }
        }

        self.context.schedule_for_insertion(entity);
        Ok(())
    }

    /// Schedule `entity` for deletion. Does not cascade.
    pub fn remove<M: Model>(&mut self, entity: &ModelRef<M>) {
        self.context.schedule_for_removal(erase(entity));
    }

    /// Look up an `M` by primary key.
    ///
    /// Returns the tracked instance when the session already holds one;
    /// otherwise loads the row and manages it along with every entity it
    /// eagerly references.
    #[tracing::instrument(level = "debug", skip(self, id), fields(entity = M::NAME))]
    pub fn find_by_id<M: Model>(&mut self, id: impl Into<Value>) -> Result<Option<ModelRef<M>>> {
        let meta = metadata::resolve::<M>()?;
        let id = id.into().coerce(meta.primary_key().sql_type)?;

        if let Some(found) = self.context.identity_map().get_typed::<M>(&id) {
            tracing::trace!("Identity map hit");
            return Ok(Some(found));
        }

        let (found, loaded) = {
            let mut mapper =
                AutoRowMapper::new(&mut *self.conn, self.engine.dialect(), self.engine.mappers())
                    .with_identity(self.context.identity_map());
            let found = mapper.find::<M>(id)?;
            (found, mapper.into_loaded())
        };

        for entity in loaded {
            if !kettle_core::primary_key_of(entity.as_ref())?.is_null() {
                self.context.manage(entity)?;
            }
        }
        Ok(found)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Whether a tracked entity differs from its snapshot.
    pub fn is_dirty<M: Model>(&self, entity: &ModelRef<M>) -> bool {
        self.context.is_dirty(&erase(entity))
    }

    pub fn state_of<M: Model>(&self, entity: &ModelRef<M>) -> Option<EntityState> {
        self.context.state_of(EntityId::of_ref(entity))
    }

    pub fn contains<M: Model>(&self, entity: &ModelRef<M>) -> bool {
        self.context.contains(EntityId::of_ref(entity))
    }

    /// Attributes of a managed entity that changed since its snapshot.
    pub fn changed_attributes<M: Model>(&self, entity: &ModelRef<M>) -> Result<Vec<&'static str>> {
        self.context
            .change_tracker()
            .changed_attributes(EntityId::of_ref(entity), erase(entity).as_ref())
    }

    pub fn context(&self) -> &PersistenceContext {
        &self.context
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Roll back any active transaction and return the connection.
    pub fn close(mut self) -> Result<()> {
        self.rollback()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.transaction_active {
            tracing::debug!("Session dropped with an active transaction, rolling back");
            if let Err(e) = self.rollback() {
                tracing::warn!(error = %e, "Rollback on drop failed");
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("transaction_active", &self.transaction_active)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
