//! The persistence engine.
//!
//! Every public operation opens its own connection, runs its statements one after another and
//! closes the connection again before returning. Nothing is kept between calls, so two
//! operations never share a connection or any in-process state.

use mini_orm_sqlparse::{query::parse_create_table, schema::SqlTable};
use sqlx::{Connection, SqliteConnection};
use tracing::{debug, info, warn};

use crate::{
    EngineConfig, Error, Result,
    entity::{
        Entity,
        column::Value,
        metadata::{EntityMetadata, IDENTITY_COLUMN},
    },
    query::{self, select::Select},
};

/// Binds [`Entity`] types to tables and saves and loads their instances.
#[derive(Debug, Clone)]
pub struct EntityManager {
    config: EngineConfig,
}

impl EntityManager {
    /// Create an engine talking to the database at `connection_string`. With
    /// `auto_create_tables` set, a missing table is created on the first [`persist`] of its
    /// entity type.
    ///
    /// [`persist`]: Self::persist
    pub fn new(connection_string: impl Into<String>, auto_create_tables: bool) -> Self {
        Self::with_config(EngineConfig::new(connection_string, auto_create_tables))
    }

    #[must_use]
    pub const fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn connect(&self) -> Result<SqliteConnection> {
        let options = self.config.connect_options()?;

        Ok(SqliteConnection::connect_with(&options).await?)
    }

    /// Save `entity`, inserting it if it has no identity yet and updating the row it names
    /// otherwise. After an insert, the identity generated by the database is written back into
    /// `entity`.
    ///
    /// Returns `false` without touching the data if the entity's table does not exist and
    /// cannot be created, or if the database reports that no row was affected.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] or [`Error::UnsupportedType`] if `T` is not declared properly,
    /// [`Error::Reconstruction`] if the generated identity does not fit into the identity field
    /// (the insert is rolled back), [`Error::Database`] if there's been a problem communicating
    /// with the database.
    pub async fn persist<T: Entity>(&self, entity: &mut T) -> Result<bool> {
        let metadata = T::metadata()?;
        let values = column_values(entity, &metadata)?;

        let mut connection = self.connect().await?;
        let persisted = self
            .persist_on(&mut connection, entity, &metadata, &values)
            .await?;
        connection.close().await?;

        Ok(persisted)
    }

    async fn persist_on<T: Entity>(
        &self,
        connection: &mut SqliteConnection,
        entity: &mut T,
        metadata: &EntityMetadata,
        values: &[Value],
    ) -> Result<bool> {
        if !table_exists(connection, metadata.table).await? {
            if !self.config.auto_create_tables {
                warn!(
                    table = metadata.table,
                    "table does not exist and automatic table creation is disabled"
                );
                return Ok(false);
            }

            if !create_table(connection, metadata).await? {
                warn!(table = metadata.table, "table could not be created");
                return Ok(false);
            }
        }

        match entity.identity() {
            None => insert(connection, entity, metadata, values).await,
            Some(id) => update(connection, metadata, values, id).await,
        }
    }

    /// Load the entity with identity `id`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if there is no such row, see [`Select::one`] otherwise.
    pub async fn find_by_id<T: Entity>(&self, id: i64) -> Result<T> {
        let metadata = T::metadata()?;
        self.fetch_one(Select::new(&metadata).by_id(id)).await
    }

    /// Load every row of `T`'s table, in the order the database returns them.
    ///
    /// # Errors
    ///
    /// See [`Select::all`].
    pub async fn find_all<T: Entity>(&self) -> Result<Vec<T>> {
        let metadata = T::metadata()?;
        self.fetch_all(Select::new(&metadata)).await
    }

    /// Load every row of `T`'s table matched by the raw SQL fragment `filter`, e.g.
    /// `WHERE [Username] = 'X'`. No match yields an empty list.
    ///
    /// `filter` is appended to the query verbatim; keeping it correct and free of untrusted
    /// input is the caller's job.
    ///
    /// # Errors
    ///
    /// See [`Select::all`].
    pub async fn find_all_where<T: Entity>(&self, filter: &str) -> Result<Vec<T>> {
        let metadata = T::metadata()?;
        self.fetch_all(Select::new(&metadata).filter(filter)).await
    }

    /// Load the first row of `T`'s table.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the table is empty, see [`Select::one`] otherwise.
    pub async fn find_first<T: Entity>(&self) -> Result<T> {
        let metadata = T::metadata()?;
        self.fetch_one(Select::new(&metadata).first()).await
    }

    /// Load the first row of `T`'s table matched by the raw SQL fragment `filter`. The same
    /// caveats as for [`find_all_where`](Self::find_all_where) apply. `filter` may carry its
    /// own `ORDER BY` and `LIMIT`; the first of the rows it selects is returned.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if nothing matched, see [`Select::one`] otherwise.
    pub async fn find_first_where<T: Entity>(&self, filter: &str) -> Result<T> {
        let metadata = T::metadata()?;
        self.fetch_one(Select::new(&metadata).filter(filter).first())
            .await
    }

    /// Whether the table of `T` exists.
    ///
    /// # Errors
    ///
    /// If `T` is not declared properly, or there's been a problem communicating with the
    /// database.
    pub async fn table_exists<T: Entity>(&self) -> Result<bool> {
        let metadata = T::metadata()?;

        let mut connection = self.connect().await?;
        let exists = table_exists(&mut connection, metadata.table).await?;
        connection.close().await?;

        Ok(exists)
    }

    /// The stored definition of `T`'s table, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// If `T` is not declared properly, the stored definition cannot be parsed, or there's
    /// been a problem communicating with the database.
    pub async fn describe_table<T: Entity>(&self) -> Result<Option<SqlTable>> {
        let metadata = T::metadata()?;

        let mut connection = self.connect().await?;
        let sql = query::table_definition(metadata.table)
            .build_query_scalar::<String>()
            .fetch_optional(&mut connection)
            .await?;
        connection.close().await?;

        sql.map(|sql| {
            parse_create_table(&sql).map_err(|e| {
                Error::configuration(format!(
                    "cannot parse the stored definition of table `{}`: {e}",
                    metadata.table
                ))
            })
        })
        .transpose()
    }

    /// Check that `T`'s table has the identity column and a column of the right type for every
    /// column binding. `persist` never does this on its own.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the table does not exist, [`Error::Configuration`] listing every
    /// difference between the table and the entity's bindings.
    pub async fn verify_schema<T: Entity>(&self) -> Result<()> {
        let metadata = T::metadata()?;

        let Some(table) = self.describe_table::<T>().await? else {
            return Err(Error::NotFound {
                table: metadata.table.to_string(),
                criteria: "a table definition".to_string(),
            });
        };

        let mut problems = metadata
            .columns
            .iter()
            .filter_map(|binding| match table.find_column(binding.column) {
                None => Some(format!("missing column `{}`", binding.column)),
                Some(column) if !column.has_type(binding.column_type.keyword()) => Some(format!(
                    "column `{}` is `{}`, expected `{}`",
                    binding.column, column.column_type, binding.column_type
                )),
                Some(_) => None,
            })
            .collect::<Vec<_>>();

        if table.find_column(IDENTITY_COLUMN).is_none() {
            problems.push(format!("missing identity column `{IDENTITY_COLUMN}`"));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::configuration(format!(
                "table `{}` does not match entity `{}`: {}",
                metadata.table,
                metadata.entity,
                problems.join("; ")
            )))
        }
    }

    async fn fetch_one<T: Entity>(&self, select: Select<T>) -> Result<T> {
        let mut connection = self.connect().await?;
        let entity = select.one(&mut connection).await?;
        connection.close().await?;

        Ok(entity)
    }

    async fn fetch_all<T: Entity>(&self, select: Select<T>) -> Result<Vec<T>> {
        let mut connection = self.connect().await?;
        let entities = select.all(&mut connection).await?;
        connection.close().await?;

        Ok(entities)
    }
}

/// The values of every column-bound field, in column order.
fn column_values<T: Entity>(entity: &T, metadata: &EntityMetadata) -> Result<Vec<Value>> {
    metadata
        .columns
        .iter()
        .map(|column| {
            let value = entity.column_value(column.field).ok_or_else(|| {
                Error::configuration(format!(
                    "entity `{}` has no value for the column-bound field `{}`",
                    metadata.entity, column.field
                ))
            })?;

            if value.column_type() == column.column_type {
                Ok(value)
            } else {
                Err(Error::configuration(format!(
                    "field `{}::{}` is declared as {} but holds a {} value",
                    metadata.entity,
                    column.field,
                    column.column_type,
                    value.column_type()
                )))
            }
        })
        .collect()
}

async fn table_exists(connection: &mut SqliteConnection, table: &str) -> Result<bool> {
    let count = query::table_exists(table)
        .build_query_scalar::<i64>()
        .fetch_one(&mut *connection)
        .await?;

    Ok(count > 0)
}

/// Create the table of `metadata`, reporting whether it exists afterwards.
async fn create_table(connection: &mut SqliteConnection, metadata: &EntityMetadata) -> Result<bool> {
    let sql = query::create_table(metadata);

    debug!(sql = %sql, "creating table");
    sqlx::query(&sql).execute(&mut *connection).await?;

    let created = table_exists(connection, metadata.table).await?;
    if created {
        info!(table = metadata.table, "created table");
    }

    Ok(created)
}

async fn insert<T: Entity>(
    connection: &mut SqliteConnection,
    entity: &mut T,
    metadata: &EntityMetadata,
    values: &[Value],
) -> Result<bool> {
    let mut builder = query::insert(metadata, values);

    // The row only becomes durable once the entity has accepted its identity.
    let mut transaction = connection.begin().await?;

    debug!(sql = builder.sql(), "inserting row");
    let result = builder.build().execute(&mut *transaction).await?;

    if result.rows_affected() == 0 {
        transaction.rollback().await?;
        return Ok(false);
    }

    // Identity generated by this very statement on this connection.
    let id = result.last_insert_rowid();

    if let Err(e) = entity.set_identity(id) {
        warn!(table = metadata.table, id, "rolling back insert: {e}");
        transaction.rollback().await?;
        return Err(e);
    }

    transaction.commit().await?;

    info!(table = metadata.table, id, "inserted row");

    Ok(true)
}

async fn update(
    connection: &mut SqliteConnection,
    metadata: &EntityMetadata,
    values: &[Value],
    id: i64,
) -> Result<bool> {
    let mut builder = query::update(metadata, values, id);

    debug!(sql = builder.sql(), "updating row");
    let result = builder.build().execute(&mut *connection).await?;

    Ok(result.rows_affected() > 0)
}
