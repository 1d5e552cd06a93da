use std::marker::PhantomData;

use futures::TryStreamExt;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use crate::{
    Error, Result,
    entity::{
        Entity,
        column::ColumnName,
        metadata::{EntityMetadata, IDENTITY_COLUMN},
    },
};

use super::{PushToQuery, parse::reconstruct};

enum Condition {
    Unfiltered,
    Identity(i64),
    Raw(String),
}

/// `SELECT * FROM <table>`, optionally narrowed down by identity or a raw filter.
pub struct Select<T>
where
    T: Entity,
{
    marker: PhantomData<T>,
    table: &'static str,
    condition: Condition,
    limit: Option<u32>,
}

impl<T> Select<T>
where
    T: Entity,
{
    #[must_use]
    pub const fn new(metadata: &EntityMetadata) -> Self {
        Self {
            marker: PhantomData,
            table: metadata.table,
            condition: Condition::Unfiltered,
            limit: None,
        }
    }

    /// Only match the row with the given identity. Replaces any previous filter.
    #[must_use]
    pub fn by_id(mut self, id: i64) -> Self {
        self.condition = Condition::Identity(id);
        self
    }

    /// Append a raw SQL fragment, e.g. `WHERE [Username] = 'X'`, on its own line after the
    /// `FROM` clause. Replaces any previous filter.
    ///
    /// The fragment is sent to the database verbatim. Making it correct and safe against
    /// injection is up to the caller.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.condition = Condition::Raw(filter.into());
        self
    }

    /// Only request the first row.
    #[must_use]
    pub fn first(mut self) -> Self {
        self.limit = Some(1);
        self
    }

    /// Return the raw SQL query of this statement, with bound parameters shown as `?`.
    #[must_use]
    pub fn query(&self) -> String {
        let mut builder = QueryBuilder::new("");
        self.push_to(&mut builder);
        builder.into_sql()
    }

    /// Human readable description of what this select looks for.
    fn criteria(&self) -> String {
        match &self.condition {
            Condition::Unfiltered => "an unfiltered query".to_string(),
            Condition::Identity(id) => format!("{IDENTITY_COLUMN} = {id}"),
            Condition::Raw(filter) => format!("filter `{filter}`"),
        }
    }

    /// Execute the query, returning the first result.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no row matched, [`Error::Reconstruction`] if the row does not fit
    /// `T`, or [`Error::Database`] if there's been a problem communicating with the database.
    pub async fn one(self, connection: &mut SqliteConnection) -> Result<T> {
        let mut builder = QueryBuilder::new("");
        self.push_to(&mut builder);

        debug!(sql = builder.sql(), "fetching one row");

        let row = builder.build().fetch_optional(&mut *connection).await?;

        match row {
            Some(row) => reconstruct(&row),
            None => Err(Error::NotFound {
                table: self.table.to_string(),
                criteria: self.criteria(),
            }),
        }
    }

    /// Execute the query, returning all results in the order the database produced them.
    ///
    /// # Errors
    ///
    /// [`Error::Reconstruction`] if a row does not fit `T`, or [`Error::Database`] if there's
    /// been a problem communicating with the database.
    pub async fn all(self, connection: &mut SqliteConnection) -> Result<Vec<T>> {
        let mut builder = QueryBuilder::new("");
        self.push_to(&mut builder);

        debug!(sql = builder.sql(), "fetching all rows");

        let rows = builder
            .build()
            .fetch(&mut *connection)
            .try_collect::<Vec<_>>()
            .await?;

        rows.iter().map(reconstruct).collect()
    }
}

impl<T> PushToQuery for Select<T>
where
    T: Entity,
{
    fn push_to(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        // A raw filter may carry its own LIMIT, so the row limit goes on an outer query.
        let nested = self.limit.is_some() && matches!(self.condition, Condition::Raw(_));

        if nested {
            builder.push("SELECT * FROM (");
        }

        builder.push("SELECT * FROM ");
        ColumnName::new(self.table).push_to(builder);

        match &self.condition {
            Condition::Unfiltered => {}
            Condition::Identity(id) => {
                builder.push(" WHERE ");
                ColumnName::new(IDENTITY_COLUMN).push_to(builder);
                builder.push(" = ");
                builder.push_bind(*id);
            }
            Condition::Raw(filter) => {
                builder.push("\n");
                filter.push_to(builder);
            }
        }

        if nested {
            builder.push("\n)");
        }

        if let Some(limit) = self.limit {
            builder.push(format_args!("\nLIMIT {limit}"));
        }
    }
}

#[cfg(test)]
mod test {
    use super::Select;
    use crate::{
        Result,
        entity::{Entity, EntityDeclaration, column::Value, metadata::EntityMetadata},
        query::parse::EntityRow,
    };

    struct Probe;

    impl Entity for Probe {
        const DECLARATION: EntityDeclaration = EntityDeclaration {
            name: "Probe",
            table: Some("Probes"),
            fields: &[],
        };

        fn identity(&self) -> Option<i64> {
            None
        }

        fn set_identity(&mut self, _id: i64) -> Result<()> {
            Ok(())
        }

        fn column_value(&self, _field: &str) -> Option<Value> {
            None
        }

        fn from_row(_row: &EntityRow<'_>) -> Result<Self> {
            Ok(Self)
        }
    }

    fn metadata() -> EntityMetadata {
        EntityMetadata {
            entity: "Probe",
            table: "Probes",
            identity_field: "id",
            columns: vec![],
        }
    }

    #[test]
    fn test_select_all() {
        assert_eq!(
            Select::<Probe>::new(&metadata()).query(),
            "SELECT * FROM \"Probes\""
        );
    }

    #[test]
    fn test_select_by_id() {
        assert_eq!(
            Select::<Probe>::new(&metadata()).by_id(3).query(),
            "SELECT * FROM \"Probes\" WHERE \"Id\" = ?"
        );
    }

    #[test]
    fn test_select_filtered() {
        assert_eq!(
            Select::<Probe>::new(&metadata())
                .filter("WHERE [Username] = 'X'")
                .query(),
            "SELECT * FROM \"Probes\"\nWHERE [Username] = 'X'"
        );
    }

    #[test]
    fn test_select_first() {
        assert_eq!(
            Select::<Probe>::new(&metadata()).first().query(),
            "SELECT * FROM \"Probes\"\nLIMIT 1"
        );
        assert_eq!(
            Select::<Probe>::new(&metadata())
                .filter("WHERE [Age] > 18 ORDER BY [Age]")
                .first()
                .query(),
            "SELECT * FROM (SELECT * FROM \"Probes\"\nWHERE [Age] > 18 ORDER BY [Age]\n)\nLIMIT 1"
        );
        assert_eq!(
            Select::<Probe>::new(&metadata())
                .filter("ORDER BY [Age] LIMIT 5")
                .first()
                .query(),
            "SELECT * FROM (SELECT * FROM \"Probes\"\nORDER BY [Age] LIMIT 5\n)\nLIMIT 1"
        );
    }

    #[test]
    fn test_criteria() {
        assert_eq!(
            Select::<Probe>::new(&metadata()).by_id(7).criteria(),
            "Id = 7"
        );
    }
}
