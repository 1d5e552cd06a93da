use sqlx::sqlite::SqliteRow;

use crate::{
    Error, Result,
    entity::{Entity, column::Primitive, metadata::IDENTITY_COLUMN},
};

/// Named-column view over a single result row, handed to [`Entity::from_row`].
pub struct EntityRow<'r> {
    row: &'r SqliteRow,
}

impl<'r> EntityRow<'r> {
    #[must_use]
    pub const fn new(row: &'r SqliteRow) -> Self {
        Self { row }
    }

    /// The value of the identity column.
    ///
    /// # Errors
    ///
    /// [`Error::Reconstruction`] if the row has no usable identity column.
    pub fn identity(&self) -> Result<i64> {
        self.get(IDENTITY_COLUMN)
    }

    /// The value of the column named `column`.
    ///
    /// # Errors
    ///
    /// [`Error::Reconstruction`] if the column is missing or cannot be decoded into `T`.
    pub fn get<T: Primitive>(&self, column: &str) -> Result<T> {
        T::decode(self.row, column)
            .map_err(|e| Error::Reconstruction(format!("column `{column}`: {e}")))
    }
}

/// Rebuild an entity from a row: the type's own deserializer first, then the identity column
/// is written into the identity field directly.
///
/// # Errors
///
/// See [`Entity::from_row`] and [`Entity::set_identity`].
pub fn reconstruct<T: Entity>(row: &SqliteRow) -> Result<T> {
    let view = EntityRow::new(row);

    let mut entity = T::from_row(&view)?;
    entity.set_identity(view.identity()?)?;

    Ok(entity)
}
