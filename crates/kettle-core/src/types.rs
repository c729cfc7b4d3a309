//! Semantic attribute types.

use chrono::{NaiveDate, NaiveDateTime};

/// Semantic type of a persistent attribute.
///
/// Dialects translate these into vendor column types; the row mapper uses
/// them to coerce driver values back into the declared shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Text,
    Integer,
    BigInt,
    Boolean,
    Double,
    Date,
    Timestamp,
    Blob,
}

impl SqlType {
    /// Get a portable name for this type (used in error messages).
    pub const fn name(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Double => "DOUBLE",
            SqlType::Date => "DATE",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Blob => "BLOB",
        }
    }

    /// Whether values of this type can be generated by the database as keys.
    pub const fn is_integer(&self) -> bool {
        matches!(self, SqlType::Integer | SqlType::BigInt)
    }
}

/// Static type information for Rust types usable as entity attributes.
///
/// The derive macro reads these constants to build the declaration table,
/// so a field's column type and nullability follow from its Rust type.
pub trait TypeInfo {
    /// The semantic SQL type for this Rust type.
    const SQL_TYPE: SqlType;

    /// Whether this type accepts NULL.
    const NULLABLE: bool = false;
}

macro_rules! impl_type_info {
    ($($ty:ty => $sql:expr),* $(,)?) => {
        $(
            impl TypeInfo for $ty {
                const SQL_TYPE: SqlType = $sql;
            }
        )*
    };
}

impl_type_info! {
    bool => SqlType::Boolean,
    i32 => SqlType::Integer,
    i64 => SqlType::BigInt,
    f64 => SqlType::Double,
    String => SqlType::Text,
    Vec<u8> => SqlType::Blob,
    NaiveDate => SqlType::Date,
    NaiveDateTime => SqlType::Timestamp,
}

impl<T: TypeInfo> TypeInfo for Option<T> {
    const SQL_TYPE: SqlType = T::SQL_TYPE;
    const NULLABLE: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_is_nullable() {
        assert!(!<i64 as TypeInfo>::NULLABLE);
        assert!(<Option<i64> as TypeInfo>::NULLABLE);
        assert_eq!(<Option<String> as TypeInfo>::SQL_TYPE, SqlType::Text);
    }

    #[test]
    fn integer_types() {
        assert!(SqlType::Integer.is_integer());
        assert!(SqlType::BigInt.is_integer());
        assert!(!SqlType::Text.is_integer());
    }
}
