//! Turns an [`EntityDeclaration`] into validated [`EntityMetadata`].
//!
//! Resolution happens the first time an entity type is used and the result is cached for the
//! lifetime of the process. Failed resolutions are not cached, so a broken declaration keeps
//! failing with the same error on every call.

use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

use itertools::Itertools;
use tracing::debug;

use super::{
    Entity, EntityDeclaration, FieldDeclaration,
    column::{ColumnName, ColumnType},
};
use crate::{Error, Result};

/// Name of the surrogate key column every mapped table carries.
pub const IDENTITY_COLUMN: &str = "Id";

static REGISTRY: LazyLock<RwLock<HashMap<TypeId, Arc<EntityMetadata>>>> =
    LazyLock::new(Default::default);

/// A field bound to a column, together with the column's relational type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnBinding {
    pub field: &'static str,
    pub column: &'static str,
    pub column_type: ColumnType,
}

/// Everything the engine needs to know about an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    pub entity: &'static str,
    pub table: &'static str,
    pub identity_field: &'static str,
    /// Column bindings in declaration order.
    pub columns: Vec<ColumnBinding>,
}

impl EntityMetadata {
    #[must_use]
    pub fn column_names(&self) -> Vec<ColumnName> {
        self.columns
            .iter()
            .map(|e| ColumnName::new(e.column))
            .collect()
    }
}

/// # Errors
///
/// If no table binding was declared, or the bound name is empty or whitespace.
pub fn resolve_table(declaration: &EntityDeclaration) -> Result<&'static str> {
    match declaration.table {
        None => Err(Error::configuration(format!(
            "entity `{}` has no table binding",
            declaration.name
        ))),
        Some(table) if table.trim().is_empty() => Err(Error::configuration(format!(
            "the table name of entity `{}` cannot be empty or whitespace",
            declaration.name
        ))),
        Some(table) => Ok(table),
    }
}

/// # Errors
///
/// If no field, or more than one field, is marked as identity.
pub fn resolve_identity_field(declaration: &EntityDeclaration) -> Result<&'static FieldDeclaration> {
    let fields: &'static [FieldDeclaration] = declaration.fields;

    match fields.iter().filter(|e| e.identity).collect::<Vec<_>>()[..] {
        [] => Err(Error::configuration(format!(
            "entity `{}` has no identity field, cannot operate without a primary key",
            declaration.name
        ))),
        [field] => Ok(field),
        ref many => Err(Error::configuration(format!(
            "entity `{}` marks more than one identity field: {}",
            declaration.name,
            many.iter().map(|e| e.name).join(", ")
        ))),
    }
}

/// # Errors
///
/// [`Error::Configuration`] naming the offending field if a column name is empty, clashes with
/// the identity column or is bound twice; [`Error::UnsupportedType`] if a field's type has no
/// column type.
pub fn resolve_columns(declaration: &EntityDeclaration) -> Result<Vec<ColumnBinding>> {
    let fields: &'static [FieldDeclaration] = declaration.fields;

    let columns = fields
        .iter()
        .filter_map(|field| field.column.map(|column| (field, column)))
        .map(|(field, column)| {
            if column.trim().is_empty() {
                return Err(Error::configuration(format!(
                    "the column name of field `{}::{}` cannot be empty or whitespace",
                    declaration.name, field.name
                )));
            }

            if field.identity {
                return Err(Error::configuration(format!(
                    "identity field `{}::{}` cannot also be bound to column `{column}`",
                    declaration.name, field.name
                )));
            }

            if column.eq_ignore_ascii_case(IDENTITY_COLUMN) {
                return Err(Error::configuration(format!(
                    "field `{}::{}` cannot be bound to the reserved identity column `{IDENTITY_COLUMN}`",
                    declaration.name, field.name
                )));
            }

            Ok(ColumnBinding {
                field: field.name,
                column,
                column_type: ColumnType::from_type_name(field.type_name)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if let Some(duplicate) = columns
        .iter()
        .duplicates_by(|e| e.column.to_ascii_lowercase())
        .next()
    {
        return Err(Error::configuration(format!(
            "column `{}` is bound more than once on entity `{}`",
            duplicate.column, declaration.name
        )));
    }

    Ok(columns)
}

/// Validate a declaration without touching the cache.
///
/// # Errors
///
/// See [`resolve_table`], [`resolve_identity_field`] and [`resolve_columns`].
pub fn resolve_declaration(declaration: &EntityDeclaration) -> Result<EntityMetadata> {
    let table = resolve_table(declaration)?;
    let identity_field = resolve_identity_field(declaration)?;
    let columns = resolve_columns(declaration)?;

    Ok(EntityMetadata {
        entity: declaration.name,
        table,
        identity_field: identity_field.name,
        columns,
    })
}

/// Resolve the metadata of `E`, consulting the process-wide cache first.
///
/// # Errors
///
/// See [`resolve_declaration`].
pub fn resolve<E: Entity>() -> Result<Arc<EntityMetadata>> {
    let key = TypeId::of::<E>();

    if let Some(metadata) = REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(Arc::clone(metadata));
    }

    let metadata = Arc::new(resolve_declaration(&E::DECLARATION)?);

    debug!(
        entity = metadata.entity,
        table = metadata.table,
        columns = metadata.columns.len(),
        "resolved entity metadata"
    );

    Ok(Arc::clone(
        REGISTRY
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(metadata),
    ))
}

#[cfg(test)]
mod test {
    use super::{
        ColumnBinding, IDENTITY_COLUMN, resolve_columns, resolve_declaration,
        resolve_identity_field, resolve_table,
    };
    use crate::{
        Error,
        entity::{EntityDeclaration, FieldDeclaration, column::ColumnType},
    };

    const ID: FieldDeclaration = FieldDeclaration {
        name: "id",
        type_name: "i32",
        column: None,
        identity: true,
    };

    const USERNAME: FieldDeclaration = FieldDeclaration {
        name: "username",
        type_name: "String",
        column: Some("Username"),
        identity: false,
    };

    const AGE: FieldDeclaration = FieldDeclaration {
        name: "age",
        type_name: "i32",
        column: Some("Age"),
        identity: false,
    };

    const fn declaration(
        table: Option<&'static str>,
        fields: &'static [FieldDeclaration],
    ) -> EntityDeclaration {
        EntityDeclaration {
            name: "User",
            table,
            fields,
        }
    }

    #[test]
    fn test_resolve_valid_declaration() {
        let metadata = resolve_declaration(&declaration(Some("Users"), &[ID, USERNAME, AGE]))
            .expect("declaration should resolve");

        assert_eq!(metadata.table, "Users");
        assert_eq!(metadata.identity_field, "id");
        assert_eq!(
            metadata.columns,
            vec![
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
            ]
        );
    }

    #[test]
    fn test_missing_or_blank_table() {
        for table in [None, Some(""), Some("   ")] {
            let err = resolve_table(&declaration(table, &[ID])).expect_err("should be rejected");
            assert!(matches!(err, Error::Configuration(_)), "{err}");
        }
    }

    #[test]
    fn test_identity_field_count() {
        let err = resolve_identity_field(&declaration(Some("Users"), &[USERNAME]))
            .expect_err("missing identity should be rejected");
        assert!(matches!(err, Error::Configuration(_)));

        const OTHER_ID: FieldDeclaration = FieldDeclaration {
            name: "other_id",
            type_name: "i64",
            column: None,
            identity: true,
        };

        let err = resolve_identity_field(&declaration(Some("Users"), &[ID, OTHER_ID]))
            .expect_err("two identities should be rejected");
        assert!(err.to_string().contains("other_id"), "{err}");
    }

    #[test]
    fn test_blank_column_names_the_field() {
        const BLANK: FieldDeclaration = FieldDeclaration {
            name: "nickname",
            type_name: "String",
            column: Some(" "),
            identity: false,
        };

        let err = resolve_columns(&declaration(Some("Users"), &[ID, BLANK]))
            .expect_err("blank column should be rejected");
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("nickname")));
    }

    #[test]
    fn test_reserved_and_duplicate_columns() {
        const SHADOW: FieldDeclaration = FieldDeclaration {
            name: "shadow",
            type_name: "i32",
            column: Some("id"),
            identity: false,
        };
        const SECOND_AGE: FieldDeclaration = FieldDeclaration {
            name: "age_again",
            type_name: "i64",
            column: Some("AGE"),
            identity: false,
        };

        let err = resolve_columns(&declaration(Some("Users"), &[ID, SHADOW]))
            .expect_err("identity column clash should be rejected");
        assert!(err.to_string().contains(IDENTITY_COLUMN), "{err}");

        let err = resolve_columns(&declaration(Some("Users"), &[ID, AGE, SECOND_AGE]))
            .expect_err("duplicate column should be rejected");
        assert!(matches!(err, Error::Configuration(_)), "{err}");
    }

    #[test]
    fn test_identity_field_with_column() {
        const BOUND_ID: FieldDeclaration = FieldDeclaration {
            name: "id",
            type_name: "i32",
            column: Some("UserId"),
            identity: true,
        };

        let err = resolve_columns(&declaration(Some("Users"), &[BOUND_ID]))
            .expect_err("bound identity should be rejected");
        assert!(matches!(err, Error::Configuration(_)), "{err}");
    }

    #[test]
    fn test_unsupported_column_type() {
        const FLAGS: FieldDeclaration = FieldDeclaration {
            name: "flags",
            type_name: "u8",
            column: Some("Flags"),
            identity: false,
        };

        let err = resolve_declaration(&declaration(Some("Users"), &[ID, FLAGS]))
            .expect_err("u8 should be rejected");
        assert!(matches!(err, Error::UnsupportedType { .. }), "{err}");
    }
}
