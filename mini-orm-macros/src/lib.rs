mod entity;

use entity::derive_entity;
use proc_macro::TokenStream;
use proc_macro_error2::proc_macro_error;

/// Implement `mini_orm::Entity` for a struct with named fields.
///
/// - `#[entity(table = "Users")]` on the struct binds it to a table.
/// - `#[entity(id)]` marks the identity field (`i32`, `i64` or an `Option` of either).
/// - `#[entity(column = "Username")]` binds a field to a column; a bare `#[entity(column)]`
///   uses the field name in PascalCase.
///
/// Fields without any of these are left out of the mapping and filled with their `Default`
/// value when loading.
#[proc_macro_error]
#[proc_macro_derive(Entity, attributes(entity))]
pub fn entity(input: TokenStream) -> TokenStream {
    derive_entity(input.into()).into()
}
