use sqlparser::{
    ast::Statement,
    dialect::SQLiteDialect,
    parser::{Parser, ParserError},
};

use crate::schema::SqlTable;

/// Parse every `CREATE TABLE` statement contained in `query`, ignoring anything else.
///
/// # Errors
///
/// If `query` is not valid SQL.
pub fn parse_tables(query: &str) -> Result<Vec<SqlTable>, ParserError> {
    let ast = Parser::parse_sql(&SQLiteDialect {}, query)?;

    Ok(ast
        .iter()
        .filter_map(|e| {
            if let Statement::CreateTable(statement) = e {
                Some(SqlTable::from(statement))
            } else {
                None
            }
        })
        .collect())
}

/// Parse the first `CREATE TABLE` statement contained in `query`.
///
/// # Errors
///
/// If `query` is not valid SQL, or contains no `CREATE TABLE` statement.
pub fn parse_create_table(query: &str) -> Result<SqlTable, ParserError> {
    parse_tables(query)?
        .into_iter()
        .next()
        .ok_or_else(|| ParserError::ParserError("no CREATE TABLE statement found".to_string()))
}
