use std::fmt::Display;

use chrono::NaiveDateTime;
use sqlx::{QueryBuilder, Row, Sqlite, sqlite::SqliteRow};

use crate::{Error, Result, query::PushToQuery};

/// Textual form date-time values are stored in.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A quoted SQL identifier.
pub struct ColumnName {
    column_name: String,
}

impl ColumnName {
    pub fn new(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
        }
    }
}

/// Quote a single identifier, doubling any embedded quotes.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

impl Display for ColumnName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", quote_ident(&self.column_name))
    }
}

impl PushToQuery for ColumnName {
    fn push_to(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(self.to_string());
    }
}

/// The relational column types entity fields can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    BigInt,
    Varchar,
    DateTime,
    Bit,
    Decimal,
}

impl ColumnType {
    /// Map a Rust primitive type name onto its column type.
    ///
    /// Only the last path segment is considered, so `chrono::NaiveDateTime` and
    /// `NaiveDateTime` are the same thing.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedType`] for anything outside of `i32`, `i64`, `String`,
    /// `NaiveDateTime`, `bool` and `f64`.
    pub fn from_type_name(type_name: &str) -> Result<Self> {
        let last_segment = type_name.rsplit("::").next().unwrap_or(type_name).trim();

        match last_segment {
            "i32" => Ok(Self::Int),
            "i64" => Ok(Self::BigInt),
            "String" => Ok(Self::Varchar),
            "NaiveDateTime" => Ok(Self::DateTime),
            "bool" => Ok(Self::Bit),
            "f64" => Ok(Self::Decimal),
            _ => Err(Error::UnsupportedType {
                type_name: type_name.to_string(),
            }),
        }
    }

    /// The keyword used for this type in `CREATE TABLE` statements.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::BigInt => "BIGINT",
            // unbounded in SQLite
            Self::Varchar => "VARCHAR",
            Self::DateTime => "DATETIME",
            Self::Bit => "BIT",
            Self::Decimal => "DECIMAL",
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// A single field value on its way into the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    BigInt(i64),
    Text(String),
    DateTime(NaiveDateTime),
    Bool(bool),
    Double(f64),
}

impl Value {
    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        match self {
            Self::Int(_) => ColumnType::Int,
            Self::BigInt(_) => ColumnType::BigInt,
            Self::Text(_) => ColumnType::Varchar,
            Self::DateTime(_) => ColumnType::DateTime,
            Self::Bool(_) => ColumnType::Bit,
            Self::Double(_) => ColumnType::Decimal,
        }
    }
}

impl PushToQuery for Value {
    fn push_to(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Self::Int(e) => builder.push_bind(*e),
            Self::BigInt(e) => builder.push_bind(*e),
            Self::Text(e) => builder.push_bind(e.clone()),
            Self::DateTime(e) => builder.push_bind(e.format(DATE_TIME_FORMAT).to_string()),
            Self::Bool(e) => builder.push_bind(*e),
            Self::Double(e) => builder.push_bind(*e),
        };
    }
}

/// A Rust type that can be stored in a single column.
pub trait Primitive: Sized {
    fn to_value(&self) -> Value;

    /// Read the column named `column` out of a result row.
    ///
    /// # Errors
    ///
    /// If the column is missing or its value cannot be decoded into `Self`.
    fn decode(row: &SqliteRow, column: &str) -> Result<Self, sqlx::Error>;
}

impl Primitive for i32 {
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn decode(row: &SqliteRow, column: &str) -> Result<Self, sqlx::Error> {
        row.try_get(column)
    }
}

impl Primitive for i64 {
    fn to_value(&self) -> Value {
        Value::BigInt(*self)
    }

    fn decode(row: &SqliteRow, column: &str) -> Result<Self, sqlx::Error> {
        row.try_get(column)
    }
}

impl Primitive for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn decode(row: &SqliteRow, column: &str) -> Result<Self, sqlx::Error> {
        row.try_get(column)
    }
}

impl Primitive for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn decode(row: &SqliteRow, column: &str) -> Result<Self, sqlx::Error> {
        row.try_get(column)
    }
}

impl Primitive for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn decode(row: &SqliteRow, column: &str) -> Result<Self, sqlx::Error> {
        row.try_get(column)
    }
}

impl Primitive for f64 {
    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    // DECIMAL has numeric affinity, whole numbers come back stored as integers.
    fn decode(row: &SqliteRow, column: &str) -> Result<Self, sqlx::Error> {
        row.try_get_unchecked(column)
    }
}
