//! Execution of single-entity INSERT / UPDATE / DELETE statements.

use kettle_core::error::{PersistenceError, PersistenceErrorKind};
use kettle_core::{AnyModel, Connection, Error, Result, primary_key_of, set_primary_key};
use kettle_schema::{Dialect, Statement, statement};

/// Insert `entity` and write the generated key back into it.
///
/// An entity that already carries a key keeps it when the driver reports
/// no generated key.
pub fn insert(conn: &mut dyn Connection, dialect: &dyn Dialect, entity: &dyn AnyModel) -> Result<()> {
    let name = entity.model_name();
    let Statement { sql, params } = statement::insert(entity, dialect)?;
    tracing::debug!(entity = name, sql = %sql, params = params.len(), "Executing INSERT");

    let generated = conn
        .insert(&sql, &params)
        .map_err(|e| Error::persistence(format!("Failed to insert {name}"), &sql, e))?;

    match generated {
        Some(key) if !key.is_null() => set_primary_key(entity, key),
        _ if !primary_key_of(entity)?.is_null() => Ok(()),
        _ => Err(Error::Persistence(PersistenceError {
            kind: PersistenceErrorKind::NullPrimaryKey,
            message: format!("No key was generated for {name}"),
            sql: Some(sql),
            source: None,
        })),
    }
}

/// Update every non-key column of `entity`. Returns the affected row count.
pub fn update(conn: &mut dyn Connection, dialect: &dyn Dialect, entity: &dyn AnyModel) -> Result<u64> {
    let name = entity.model_name();
    let Some(Statement { sql, params }) = statement::update(entity, dialect)? else {
        tracing::trace!(entity = name, "Nothing to update");
        return Ok(0);
    };
    tracing::debug!(entity = name, sql = %sql, params = params.len(), "Executing UPDATE");

    conn.execute(&sql, &params)
        .map_err(|e| Error::persistence(format!("Failed to update {name}"), &sql, e))
}

/// Delete `entity` by primary key. Returns the affected row count.
pub fn delete(conn: &mut dyn Connection, dialect: &dyn Dialect, entity: &dyn AnyModel) -> Result<u64> {
    let name = entity.model_name();
    let Statement { sql, params } = statement::delete(entity, dialect)?;
    tracing::debug!(entity = name, sql = %sql, params = params.len(), "Executing DELETE");

    conn.execute(&sql, &params)
        .map_err(|e| Error::persistence(format!("Failed to delete {name}"), &sql, e))
}
