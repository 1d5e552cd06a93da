use convert_case::{Case, Casing};
use darling::{
    FromDeriveInput, FromField,
    ast::Data,
    util::{Flag, Override},
};
use proc_macro_error2::{abort, emit_error};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Generics, Ident, Type, parse2};

#[derive(FromField, Clone)]
#[darling(attributes(entity))]
struct DeriveEntityField {
    ident: Option<Ident>,
    ty: Type,
    column: Option<Override<String>>,
    id: Flag,
}

#[derive(FromDeriveInput)]
#[darling(attributes(entity))]
struct DeriveEntityTarget {
    ident: Ident,
    generics: Generics,
    table: Option<String>,
    data: Data<(), DeriveEntityField>,
}

#[derive(Clone)]
struct TargetField {
    field_ident: Ident,
    /// Last path segment of the field's type, e.g. `NaiveDateTime`.
    type_name: String,
    column: Option<String>,
    identity: bool,
}

impl TargetField {
    const fn is_bound(&self) -> bool {
        self.identity || self.column.is_some()
    }
}

fn type_name(ty: &Type) -> String {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            return segment.ident.to_string();
        }
    }

    quote!(#ty).to_string()
}

fn optional_str(value: Option<&str>) -> TokenStream {
    match value {
        Some(value) => quote! { ::core::option::Option::Some(#value) },
        None => quote! { ::core::option::Option::None },
    }
}

// Table, identity and column validity are checked by the runtime resolver, not here.
#[allow(clippy::too_many_lines)]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match parse2(input) {
        Ok(e) => e,
        Err(e) => return e.to_compile_error(),
    };

    let target = match DeriveEntityTarget::from_derive_input(&input) {
        Ok(r) => r,
        Err(e) => return e.write_errors(),
    };

    if !target.generics.params.is_empty() {
        abort! {
            target.generics, "Generic entities are not supported.";
            note = "Entities are bound to exactly one table, declare a concrete struct instead.";
        };
    }

    let Some(struct_data) = target.data.take_struct() else {
        abort! {
            input, "Target is not a struct.";
            note = "This macro must be run on a struct.";
        };
    };

    let fields = struct_data
        .fields
        .iter()
        .map(|e| {
            let Some(ident) = &e.ident else {
                abort! {
                    e.ident, "Field has no ident.";
                    note = "This macro cannot be run on tuple structs.";
                };
            };

            let column = e.column.as_ref().map(|column| match column {
                Override::Explicit(name) => name.clone(),
                Override::Inherit => ident.to_string().to_case(Case::Pascal),
            });

            if e.id.is_present() && column.is_some() {
                abort! {
                    ident.span(), "The identity field cannot be bound to a column.";
                    note = "The identity is always stored in the `Id` column, remove #[entity(column)] from this field.";
                };
            }

            TargetField {
                field_ident: ident.clone(),
                type_name: type_name(&e.ty),
                column,
                identity: e.id.is_present(),
            }
        })
        .collect::<Vec<_>>();

    // Make sure all columns have unique names.
    let clashes = |e: &TargetField| {
        fields
            .iter()
            .filter(|o| match (&e.column, &o.column) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => false,
            })
            .count()
            > 1
    };

    if let Some(duplicate) = fields.iter().find(|e| clashes(e)) {
        fields.iter().filter(|e| clashes(e)).for_each(|e| {
            emit_error! {
                e.field_ident.span(), "Clashing occurrence of column \"{}\" here.", e.column.as_deref().unwrap_or_default()
            };
        });

        abort! {
            duplicate.field_ident.span(), "Duplicate column definition \"{}\"", duplicate.column.as_deref().unwrap_or_default();
            note = "Columns must have unique names, if necessary use the #[entity(column = \"MyColumnName\")] attribute to specify a unique name.";
        }
    }

    let identity_fields = fields.iter().filter(|e| e.identity).collect::<Vec<_>>();

    if identity_fields.len() > 1 {
        identity_fields.iter().skip(1).for_each(|e| {
            emit_error! {
                e.field_ident.span(), "Additional identity field \"{}\" here.", e.field_ident
            };
        });

        abort! {
            identity_fields[0].field_ident.span(), "More than one identity field.";
            note = "Exactly one field may be marked with #[entity(id)].";
        }
    }

    let identity_field = identity_fields.first().map(|e| &e.field_ident);

    let entity_ident = &target.ident;
    let entity_name = entity_ident.to_string();
    let table = optional_str(target.table.as_deref());

    let declaration = {
        let field_decls = fields.iter().filter(|e| e.is_bound()).map(|e| {
            let name = e.field_ident.to_string();
            let type_name = &e.type_name;
            let column = optional_str(e.column.as_deref());
            let identity = e.identity;

            quote! {
                ::mini_orm::entity::FieldDeclaration {
                    name: #name,
                    type_name: #type_name,
                    column: #column,
                    identity: #identity,
                }
            }
        });

        quote! {
            const DECLARATION: ::mini_orm::entity::EntityDeclaration =
                ::mini_orm::entity::EntityDeclaration {
                    name: #entity_name,
                    table: #table,
                    fields: &[
                        #(#field_decls),*
                    ],
                };
        }
    };

    let identity_impl = match identity_field {
        Some(ident) => quote! {
            fn identity(&self) -> ::core::option::Option<i64> {
                ::mini_orm::entity::identity::IdentityValue::get(&self.#ident)
            }

            fn set_identity(&mut self, id: i64) -> ::mini_orm::Result<()> {
                ::mini_orm::entity::identity::IdentityValue::set(&mut self.#ident, id)
            }
        },
        // Resolution fails for entities without identity, which is the error to report.
        None => quote! {
            fn identity(&self) -> ::core::option::Option<i64> {
                ::core::option::Option::None
            }

            fn set_identity(&mut self, _id: i64) -> ::mini_orm::Result<()> {
                ::mini_orm::entity::metadata::resolve::<Self>().map(|_| ())
            }
        },
    };

    let column_fields = fields
        .iter()
        .filter_map(|e| e.column.as_ref().map(|column| (&e.field_ident, column)))
        .collect::<Vec<_>>();

    let column_value_impl = {
        let arms = column_fields.iter().map(|(ident, _)| {
            let name = ident.to_string();

            quote! {
                #name => ::core::option::Option::Some(
                    ::mini_orm::entity::column::Primitive::to_value(&self.#ident)
                ),
            }
        });

        quote! {
            fn column_value(&self, field: &str) -> ::core::option::Option<::mini_orm::entity::column::Value> {
                match field {
                    #(#arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    };

    let from_row_impl = {
        let identity_assignment = identity_field.map(|ident| {
            quote! {
                #ident: ::mini_orm::entity::identity::IdentityValue::unset(),
            }
        });

        let column_assignments = column_fields.iter().map(|(ident, column)| {
            quote! {
                #ident: row.get(#column)?,
            }
        });

        let default_assignments = fields.iter().filter(|e| !e.is_bound()).map(|e| {
            let ident = &e.field_ident;

            quote! {
                #ident: ::core::default::Default::default(),
            }
        });

        quote! {
            fn from_row(row: &::mini_orm::query::parse::EntityRow<'_>) -> ::mini_orm::Result<Self> {
                ::core::result::Result::Ok(Self {
                    #identity_assignment
                    #(#column_assignments)*
                    #(#default_assignments)*
                })
            }
        }
    };

    quote! {
        impl ::mini_orm::entity::Entity for #entity_ident {
            #declaration

            #identity_impl

            #column_value_impl

            #from_row_impl
        }
    }
}
