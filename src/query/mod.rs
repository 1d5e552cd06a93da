//! SQL statement generation.
//!
//! Every value ends up as a bound parameter; the only free text that reaches the database
//! verbatim is a caller-supplied filter (see [`select::Select::filter`]).

pub mod parse;
pub mod select;

use itertools::Itertools;
use sqlx::{QueryBuilder, Sqlite};

use crate::entity::{
    column::{ColumnName, Value},
    metadata::{EntityMetadata, IDENTITY_COLUMN},
};

/// Anything that can be pushed into a [`QueryBuilder`], i.e. any kind of query fragment, like an
/// identifier or a bound value.
pub trait PushToQuery {
    /// Push the object's contents into a query builder.
    fn push_to(&self, builder: &mut QueryBuilder<'_, Sqlite>);
}

impl PushToQuery for String {
    fn push_to(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(self);
    }
}

/// `left = right`
pub(crate) struct Assignment<'a> {
    column: ColumnName,
    value: &'a Value,
}

impl PushToQuery for Assignment<'_> {
    fn push_to(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        self.column.push_to(builder);
        builder.push(" = ");
        self.value.push_to(builder);
    }
}

/// Push `items` separated by `, `.
fn push_list<T: PushToQuery>(builder: &mut QueryBuilder<'_, Sqlite>, items: &[T]) {
    items.iter().enumerate().for_each(|(i, e)| {
        if i > 0 {
            builder.push(", ");
        }
        e.push_to(builder);
    });
}

/// `CREATE TABLE <table> ("Id" <auto-increment key>, <column> <type>, ...)`, columns in
/// declaration order.
#[must_use]
pub fn create_table(metadata: &EntityMetadata) -> String {
    let definitions = std::iter::once(format!(
        "{} INTEGER PRIMARY KEY AUTOINCREMENT",
        ColumnName::new(IDENTITY_COLUMN)
    ))
    .chain(
        metadata
            .columns
            .iter()
            .map(|e| format!("{} {}", ColumnName::new(e.column), e.column_type)),
    )
    .join(", ");

    format!(
        "CREATE TABLE {} ({definitions})",
        ColumnName::new(metadata.table)
    )
}

/// Count the catalog entries for the table called `table`. SQLite identifiers ignore case, so
/// does the comparison.
#[must_use]
pub fn table_exists(table: &str) -> QueryBuilder<'static, Sqlite> {
    let mut builder =
        QueryBuilder::new("SELECT COUNT(name) FROM sqlite_master WHERE type = 'table' AND name = ");
    builder.push_bind(table.to_string());
    builder.push(" COLLATE NOCASE");
    builder
}

/// Fetch the stored `CREATE TABLE` text of `table`.
#[must_use]
pub fn table_definition(table: &str) -> QueryBuilder<'static, Sqlite> {
    let mut builder =
        QueryBuilder::new("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ");
    builder.push_bind(table.to_string());
    builder.push(" COLLATE NOCASE");
    builder
}

/// `INSERT INTO <table> (<columns>) VALUES (<values>)`. `values` must line up with
/// [`EntityMetadata::columns`].
#[must_use]
pub fn insert(metadata: &EntityMetadata, values: &[Value]) -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::new("INSERT INTO ");
    ColumnName::new(metadata.table).push_to(&mut builder);

    if values.is_empty() {
        builder.push(" DEFAULT VALUES");
        return builder;
    }

    builder.push(" (");
    push_list(&mut builder, &metadata.column_names());
    builder.push(") VALUES (");
    push_list(&mut builder, values);
    builder.push(")");

    builder
}

/// `UPDATE <table> SET <column> = <value>, ... WHERE "Id" = <id>`. `values` must line up with
/// [`EntityMetadata::columns`].
#[must_use]
pub fn update(metadata: &EntityMetadata, values: &[Value], id: i64) -> QueryBuilder<'static, Sqlite> {
    let identity = ColumnName::new(IDENTITY_COLUMN);

    let mut builder = QueryBuilder::new("UPDATE ");
    ColumnName::new(metadata.table).push_to(&mut builder);
    builder.push(" SET ");

    if values.is_empty() {
        // nothing to change, but the statement still reports whether the row exists
        builder.push(format_args!("{identity} = {identity}"));
    } else {
        let assignments = metadata
            .columns
            .iter()
            .zip(values)
            .map(|(column, value)| Assignment {
                column: ColumnName::new(column.column),
                value,
            })
            .collect::<Vec<_>>();
        push_list(&mut builder, &assignments);
    }

    builder.push(format_args!(" WHERE {identity} = "));
    builder.push_bind(id);

    builder
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;

    use super::{create_table, insert, table_exists, update};
    use crate::entity::{
        column::{ColumnType, Value},
        metadata::{ColumnBinding, EntityMetadata},
    };

    fn user_metadata() -> EntityMetadata {
        EntityMetadata {
            entity: "User",
            table: "Users",
            identity_field: "id",
            columns: vec![
                ColumnBinding {
                    field: "username",
                    column: "Username",
                    column_type: ColumnType::Varchar,
                },
                ColumnBinding {
                    field: "age",
                    column: "Age",
                    column_type: ColumnType::Int,
                },
                ColumnBinding {
                    field: "registration_date",
                    column: "RegistrationDate",
                    column_type: ColumnType::DateTime,
                },
            ],
        }
    }

    fn user_values() -> Vec<Value> {
        vec![
            Value::Text("Peshkata".to_string()),
            Value::Int(21),
            Value::DateTime(
                NaiveDate::from_ymd_opt(2017, 3, 4)
                    .and_then(|d| d.and_hms_opt(10, 20, 30))
                    .expect("valid date"),
            ),
        ]
    }

    #[test]
    fn test_create_table() {
        assert_eq!(
            create_table(&user_metadata()),
            "CREATE TABLE \"Users\" (\"Id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"Username\" VARCHAR, \"Age\" INT, \"RegistrationDate\" DATETIME)"
        );
    }

    #[test]
    fn test_create_table_without_columns() {
        let metadata = EntityMetadata {
            columns: vec![],
            ..user_metadata()
        };

        assert_eq!(
            create_table(&metadata),
            "CREATE TABLE \"Users\" (\"Id\" INTEGER PRIMARY KEY AUTOINCREMENT)"
        );
    }

    #[test]
    fn test_table_exists() {
        assert_eq!(
            table_exists("Users").sql(),
            "SELECT COUNT(name) FROM sqlite_master WHERE type = 'table' AND name = ? COLLATE NOCASE"
        );
    }

    #[test]
    fn test_insert() {
        assert_eq!(
            insert(&user_metadata(), &user_values()).sql(),
            "INSERT INTO \"Users\" (\"Username\", \"Age\", \"RegistrationDate\") VALUES (?, ?, ?)"
        );

        let metadata = EntityMetadata {
            columns: vec![],
            ..user_metadata()
        };
        assert_eq!(
            insert(&metadata, &[]).sql(),
            "INSERT INTO \"Users\" DEFAULT VALUES"
        );
    }

    #[test]
    fn test_update() {
        assert_eq!(
            update(&user_metadata(), &user_values(), 4).sql(),
            "UPDATE \"Users\" SET \"Username\" = ?, \"Age\" = ?, \"RegistrationDate\" = ? WHERE \"Id\" = ?"
        );
    }

    #[test]
    fn test_update_without_columns() {
        let metadata = EntityMetadata {
            columns: vec![],
            ..user_metadata()
        };

        assert_eq!(
            update(&metadata, &[], 4).sql(),
            "UPDATE \"Users\" SET \"Id\" = \"Id\" WHERE \"Id\" = ?"
        );
    }
}
