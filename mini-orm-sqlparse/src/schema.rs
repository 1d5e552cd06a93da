use serde::{Deserialize, Serialize};
use sqlparser::ast::{ColumnDef, ColumnOption, CreateTable, ObjectNamePart};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SqlColumn {
    pub name: String,
    /// The declared type as written in the table definition, e.g. `VARCHAR` or `INT`.
    pub column_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

impl SqlColumn {
    /// Whether the declared type is `keyword`, ignoring case.
    #[must_use]
    pub fn has_type(&self, keyword: &str) -> bool {
        self.column_type.eq_ignore_ascii_case(keyword)
    }
}

impl From<&ColumnDef> for SqlColumn {
    fn from(value: &ColumnDef) -> Self {
        Self {
            name: value.name.value.clone(),
            column_type: value.data_type.to_string(),
            nullable: value
                .options
                .iter()
                .find_map(|e| match e.option {
                    ColumnOption::Null => Some(true),
                    ColumnOption::NotNull => Some(false),
                    _ => None,
                })
                .unwrap_or(true),
            primary_key: value.options.iter().any(|e| {
                matches!(
                    e.option,
                    ColumnOption::Unique {
                        is_primary: true,
                        ..
                    }
                )
            }),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SqlTable {
    pub name: String,
    pub columns: Vec<SqlColumn>,
    pub primary_key: Option<String>,
}

impl SqlTable {
    /// Look up a column by name. SQLite identifiers are case-insensitive, and so is this.
    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&SqlColumn> {
        self.columns.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }
}

impl From<&CreateTable> for SqlTable {
    fn from(create_table: &CreateTable) -> Self {
        let columns: Vec<SqlColumn> = create_table.columns.iter().map(SqlColumn::from).collect();

        Self {
            name: create_table
                .name
                .0
                .iter()
                .map(|e| {
                    let ObjectNamePart::Identifier(ident) = e;

                    ident.value.clone()
                })
                .next_back()
                .unwrap_or_default(),
            primary_key: columns
                .iter()
                .find_map(|e| e.primary_key.then(|| e.name.clone()))
                .or(create_table.primary_key.as_ref().map(|e| e.to_string())),
            columns,
        }
    }
}

/// Every table of a database.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SqlSchema {
    pub tables: Vec<SqlTable>,
}

impl SqlSchema {
    #[must_use]
    pub fn find_table(&self, name: &str) -> Option<&SqlTable> {
        self.tables.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }
}
