//! CREATE TABLE statement builder.

use crate::dialect::Dialect;
use kettle_core::error::{SchemaError, SchemaErrorKind};
use kettle_core::{
    Cardinality, ColumnMeta, EntityMetadata, EntityTarget, Error, Mapping, RelationMeta, Result,
};
use std::sync::Arc;

/// Build the `CREATE TABLE IF NOT EXISTS` statement for an entity.
///
/// Columns follow declaration order, then the primary-key clause, then one
/// foreign-key constraint per relationship. Relationship targets must be
/// entity types; their metadata is resolved to find the referenced table
/// and key type.
pub fn create_table(meta: &EntityMetadata, dialect: &dyn Dialect) -> Result<String> {
    let mut parts = Vec::with_capacity(meta.mappings().len() + 1);
    let mut constraints = Vec::new();

    for mapping in meta.mappings() {
        match mapping {
            Mapping::Column(column) => parts.push(column_definition(column, dialect)),
            Mapping::Relation(relation) => {
                let target = relation_target(meta, relation)?;
                let target_pk = target.primary_key();

                let mut def = format!(
                    "{} {}",
                    relation.join_column,
                    dialect.column_type(target_pk.sql_type, target_pk.length)
                );
                if relation.cardinality == Cardinality::OneToOne {
                    def.push_str(" UNIQUE");
                }
                parts.push(def);

                let mut fk = format!(
                    "FOREIGN KEY ({}) REFERENCES {}({})",
                    relation.join_column,
                    target.table(),
                    target_pk.column
                );
                if relation.cascade.delete {
                    fk.push_str(" ON DELETE CASCADE");
                }
                constraints.push(fk);
            }
        }
    }

    parts.push(format!("PRIMARY KEY ({})", meta.primary_key().column));
    parts.extend(constraints);

    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        meta.table(),
        parts.join(", ")
    );
    tracing::debug!(dialect = dialect.name(), table = meta.table(), "Generated DDL");
    Ok(sql)
}

fn column_definition(column: &ColumnMeta, dialect: &dyn Dialect) -> String {
    if column.primary_key {
        // PRIMARY KEY already implies NOT NULL, and SQLite only aliases the
        // rowid for a bare INTEGER key.
        return format!(
            "{} {}",
            column.column,
            dialect.identity_type(column.sql_type, column.length)
        );
    }

    let mut def = format!(
        "{} {}",
        column.column,
        dialect.column_type(column.sql_type, column.length)
    );
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if column.unique {
        def.push_str(" UNIQUE");
    }
    def
}

fn relation_target(meta: &EntityMetadata, relation: &RelationMeta) -> Result<Arc<EntityMetadata>> {
    match relation.target {
        EntityTarget::Entity(target) => target.metadata(),
        EntityTarget::Scalar(sql_type) => Err(Error::Schema(SchemaError {
            kind: SchemaErrorKind::InvalidRelationTarget,
            message: format!(
                "Relation {}.{} must point to another entity, not a {} value",
                meta.name(),
                relation.attribute,
                sql_type.name()
            ),
        })),
    }
}
