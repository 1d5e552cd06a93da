pub mod column;
pub mod identity;
pub mod metadata;

use std::sync::Arc;

use column::Value;
use metadata::EntityMetadata;

use crate::{Result, query::parse::EntityRow};

/// The declarative mapping of a record type, exactly as written on the type.
///
/// Nothing in here is validated yet; see [`metadata`] for the checks applied on first use.
#[derive(Debug, Clone, Copy)]
pub struct EntityDeclaration {
    /// The Rust name of the entity, used in error messages.
    pub name: &'static str,
    /// The table binding, if one was declared.
    pub table: Option<&'static str>,
    /// Every field carrying an identity marker and/or a column binding, in declaration order.
    pub fields: &'static [FieldDeclaration],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDeclaration {
    /// The field's name on the Rust type.
    pub name: &'static str,
    /// The field's type as written, e.g. `i32` or `NaiveDateTime`.
    pub type_name: &'static str,
    /// The column this field is bound to, if any.
    pub column: Option<&'static str>,
    /// Whether this field is the surrogate key.
    pub identity: bool,
}

/// A record type that can be persisted by the [`EntityManager`](crate::EntityManager).
///
/// Usually implemented through `#[derive(Entity)]`, but hand-written implementations are fine
/// as long as [`Entity::column_value`] answers for every column-bound field.
pub trait Entity: Sized + Send + 'static {
    const DECLARATION: EntityDeclaration;

    /// The current identity value, or `None` while the instance has not been persisted yet.
    fn identity(&self) -> Option<i64>;

    /// Write a store-generated identity into the identity field.
    ///
    /// # Errors
    ///
    /// If the type has no identity field, or the value does not fit into it.
    fn set_identity(&mut self, id: i64) -> Result<()>;

    /// The current value of the column-bound field `field`.
    fn column_value(&self, field: &str) -> Option<Value>;

    /// Build an instance from one result row. The identity field is left unset, the engine
    /// assigns it afterwards.
    ///
    /// # Errors
    ///
    /// If a bound column is missing from the row or holds a value of the wrong type.
    fn from_row(row: &EntityRow<'_>) -> Result<Self>;

    /// Resolved (and cached) metadata of this entity type.
    ///
    /// # Errors
    ///
    /// See [`metadata::resolve`].
    fn metadata() -> Result<Arc<EntityMetadata>> {
        metadata::resolve::<Self>()
    }
}
