//! Parameterized DML for single entities.
//!
//! Every builder reads the entity through its erased [`AnyModel`] view and
//! produces SQL with positional placeholders plus the matching parameters.
//! Relationship columns are bound to the related entity's primary key.

use crate::dialect::Dialect;
use kettle_core::error::{PersistenceError, PersistenceErrorKind};
use kettle_core::{AnyModel, EntityMetadata, Error, Mapping, Result, Value};

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// `SELECT * FROM <table> WHERE <pk> = <placeholder>`.
pub fn select_by_id(meta: &EntityMetadata, dialect: &dyn Dialect) -> String {
    format!(
        "SELECT * FROM {} WHERE {} = {}",
        meta.table(),
        meta.primary_key().column,
        dialect.placeholder(1)
    )
}

/// INSERT naming every persistent column except the primary key.
///
/// Dialects that report generated keys through a result set get a
/// `RETURNING` clause.
pub fn insert(entity: &dyn AnyModel, dialect: &dyn Dialect) -> Result<Statement> {
    let meta = entity.metadata()?;
    let mut columns = Vec::new();
    let mut params = Vec::new();

    for mapping in meta.non_key_mappings() {
        columns.push(mapping.column());
        params.push(column_value(entity, mapping)?);
    }

    let mut sql = if columns.is_empty() {
        dialect.empty_insert(meta.table())
    } else {
        let placeholders: Vec<_> = (1..=columns.len()).map(|i| dialect.placeholder(i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            meta.table(),
            columns.join(", "),
            placeholders.join(", ")
        )
    };
    if let Some(returning) = dialect.returning_clause(&meta.primary_key().column) {
        sql.push(' ');
        sql.push_str(&returning);
    }

    Ok(Statement { sql, params })
}

/// UPDATE of every non-key column, keyed by primary key.
///
/// Returns `None` when the entity has no columns besides its key.
pub fn update(entity: &dyn AnyModel, dialect: &dyn Dialect) -> Result<Option<Statement>> {
    let meta = entity.metadata()?;
    let id = primary_key(entity, &meta)?;

    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for mapping in meta.non_key_mappings() {
        params.push(column_value(entity, mapping)?);
        assignments.push(format!(
            "{} = {}",
            mapping.column(),
            dialect.placeholder(params.len())
        ));
    }
    if assignments.is_empty() {
        return Ok(None);
    }

    params.push(id);
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        meta.table(),
        assignments.join(", "),
        meta.primary_key().column,
        dialect.placeholder(params.len())
    );
    Ok(Some(Statement { sql, params }))
}

/// DELETE by primary key.
///
/// A null key is bound as is and matches no row: an entity that was never
/// stored has nothing to delete.
pub fn delete(entity: &dyn AnyModel, dialect: &dyn Dialect) -> Result<Statement> {
    let meta = entity.metadata()?;
    let id = key_value(entity, &meta)?;
    Ok(Statement {
        sql: format!(
            "DELETE FROM {} WHERE {} = {}",
            meta.table(),
            meta.primary_key().column,
            dialect.placeholder(1)
        ),
        params: vec![id],
    })
}

fn column_value(entity: &dyn AnyModel, mapping: &Mapping) -> Result<Value> {
    entity.read_attribute(mapping.attribute())?.comparable()
}

fn key_value(entity: &dyn AnyModel, meta: &EntityMetadata) -> Result<Value> {
    let pk = meta.primary_key();
    entity
        .read_attribute(pk.attribute)?
        .into_scalar(meta.name(), pk.attribute)
}

fn primary_key(entity: &dyn AnyModel, meta: &EntityMetadata) -> Result<Value> {
    let id = key_value(entity, meta)?;
    if id.is_null() {
        return Err(Error::Persistence(PersistenceError {
            kind: PersistenceErrorKind::NullPrimaryKey,
            message: "Cannot update entity with null ID".to_string(),
            sql: None,
            source: None,
        }));
    }
    Ok(id)
}
