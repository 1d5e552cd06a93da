use std::path::PathBuf;

use clap::Parser;
use eyre::Context;
use futures::TryStreamExt;
use mini_orm::EngineConfig;
use mini_orm_sqlparse::{query::parse_tables, schema::SqlSchema};
use sqlx::{Connection, SqliteConnection};
use tracing::info;

/// Dump the definition of every table in the database in JSON format
#[derive(Parser, Debug)]
pub struct GenerateSchema {
    /// Where to write the schema to. Defaults to `mini_orm/schema.json` in the current
    /// directory.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl GenerateSchema {
    pub async fn run(&self, config: &EngineConfig) -> eyre::Result<()> {
        let schema = generate_sqlite_schema(config).await?;

        let schema_file = match &self.output {
            Some(output) => output.clone(),
            None => std::env::current_dir()
                .context("Failed to determine current directory")?
                .join("mini_orm")
                .join("schema.json"),
        };

        if let Some(parent) = schema_file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create schema directory")?;
        }

        tokio::fs::write(
            &schema_file,
            serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?,
        )
        .await
        .context("Failed to write schema")?;

        info!(
            tables = schema.tables.len(),
            "Schema file updated under {}",
            schema_file.display()
        );

        Ok(())
    }
}

pub async fn generate_sqlite_schema(config: &EngineConfig) -> eyre::Result<SqlSchema> {
    let mut conn = SqliteConnection::connect_with(&config.connect_options()?)
        .await
        .context("Failed to connect to database")?;

    let tables = sqlx::query_scalar::<_, String>(
        "SELECT sql FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch(&mut conn)
    .map_err(|e| eyre::eyre!("Failed to execute DB query: {e}"))
    .and_then(async |sql| parse_tables(&sql).map_err(|e| eyre::eyre!("Failed to parse table SQL: {e}")))
    .try_collect::<Vec<_>>()
    .await
    .context("Failed to gather tables")?
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();

    conn.close().await.context("Failed to close connection")?;

    Ok(SqlSchema { tables })
}
