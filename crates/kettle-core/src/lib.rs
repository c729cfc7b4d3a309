//! Core types and traits for kettle.
//!
//! This crate provides the foundations the other kettle crates build on:
//!
//! - `Model` trait and the static `AttributeDecl` declaration table
//! - `metadata` resolver turning declarations into cached `EntityMetadata`
//! - `Related<T>` for to-one relationships
//! - `Value` / `Row` for parameters and results
//! - `Connection` / `Connector` traits implemented by drivers
//! - the shared `Error` type

pub mod connection;
pub mod error;
pub mod field;
pub mod metadata;
pub mod model;
pub mod relationship;
pub mod row;
pub mod types;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{Connection, Connector};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, MetadataError, MetadataErrorKind,
    PersistenceError, PersistenceErrorKind, PoolError, PoolErrorKind, QueryError, QueryErrorKind,
    Result, SchemaError, SchemaErrorKind, TransactionError, TransactionErrorKind, TypeError,
};
pub use field::{
    AttributeDecl, AttributeKind, Cardinality, Cascade, ColumnDecl, EntityTarget, EntityType,
    FetchMode, RelationDecl,
};
pub use metadata::{ColumnMeta, EntityMetadata, Mapping, RelationMeta};
pub use model::{
    AnyModel, AttributeValue, EntityId, Model, ModelRef, RelatedValue, model_ref, primary_key_of,
    set_primary_key,
};
pub use relationship::Related;
pub use row::{ColumnInfo, FromValue, Row};
pub use types::{SqlType, TypeInfo};
pub use value::Value;
