//! Result rows and typed extraction from them.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::types::TypeInfo;
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Arc;

/// Column names of one result set, shared by its rows through an `Arc`.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    /// Column names in order
    names: Vec<String>,
    /// Lowercased name -> index mapping
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    pub fn new(names: Vec<String>) -> Self {
        let mut name_to_index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            // First occurrence wins for duplicated names (e.g. joins)
            name_to_index.entry(name.to_lowercase()).or_insert(i);
        }
        Self {
            names,
            name_to_index,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of `name`, ignoring case; vendors fold unquoted
    /// identifiers differently.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(&name.to_lowercase()).copied()
    }
}

/// One result row.
#[derive(Debug, Clone)]
pub struct Row {
    values: Vec<Value>,
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// A standalone row. Drivers building many rows share one
    /// [`ColumnInfo`] through [`Row::with_columns`].
    pub fn new(names: Vec<String>, values: Vec<Value>) -> Self {
        Self::with_columns(Arc::new(ColumnInfo::new(names)), values)
    }

    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let index = self.columns.index_of(name)?;
        self.values.get(index)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.index_of(name).is_some()
    }

    /// Typed value of column `name`. Type errors name the column.
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T> {
        let Some(value) = self.get_by_name(name) else {
            return Err(Error::Type(TypeError {
                expected: std::any::type_name::<T>(),
                actual: format!("no column named '{name}'"),
                column: Some(name.to_string()),
            }));
        };
        T::from_value(value).map_err(|err| match err {
            Error::Type(type_error) => Error::Type(TypeError {
                column: Some(name.to_string()),
                ..type_error
            }),
            other => other,
        })
    }
}

/// Extraction of a Rust value from a [`Value`].
///
/// Conversions go through [`Value::coerce`], so wire representations
/// (text dates, integer booleans, 64-bit keys) are accepted.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(expected: &'static str, value: &Value) -> Error {
    Error::Type(TypeError {
        expected,
        actual: value.type_name().to_string(),
        column: None,
    })
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self> {
                    match value.clone().coerce(<$ty as TypeInfo>::SQL_TYPE)? {
                        Value::$variant(v) => Ok(v),
                        _ => Err(mismatch(stringify!($ty), value)),
                    }
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Bool,
    i32 => Int,
    i64 => BigInt,
    f64 => Double,
    String => Text,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            present => Ok(Some(T::from_value(present)?)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}
