//! Unit of work for kettle.
//!
//! `kettle-session` is the layer that turns in-memory entity changes into
//! SQL at commit time.
//!
//! # Role In The Architecture
//!
//! - **Identity map**: one instance per (type, primary key) in a session.
//! - **Change tracking**: snapshots taken when an entity becomes managed
//!   drive dirty checking; only changed entities are updated.
//! - **Row mapping**: result rows become entities, with eager to-one
//!   relationships loaded on the same connection.
//! - **Transactional safety**: every commit runs in one database
//!   transaction and rolls back as a whole on failure.
//!
//! # Example
//!
//! ```ignore
//! let engine = Arc::new(Engine::new(pool, DatabaseType::Sqlite.dialect()));
//! let mut session = engine.open_session()?;
//!
//! session.begin_transaction()?;
//! session.persist(&book)?;          // cascades to the book's author
//! session.commit()?;
//!
//! let again = session.find_by_id::<Book>(10_i64)?;
//! ```

pub mod change_tracker;
pub mod context;
pub mod engine;
pub mod identity_map;
pub mod mapper;
pub mod persister;
pub mod session;

#[cfg(test)]
mod fixtures;

pub use change_tracker::{ChangeTracker, EntitySnapshot};
pub use context::{EntityState, PersistenceContext};
pub use engine::Engine;
pub use identity_map::{IdentityKey, IdentityMap, PkKey};
pub use mapper::{AutoRowMapper, MapperRegistry, RowMapper};
pub use session::Session;
