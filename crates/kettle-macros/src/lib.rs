//! Procedural macros for kettle.
//!
//! `kettle-macros` is the compile-time codegen layer. `#[derive(Model)]`
//! turns a struct into an entity type by generating its static attribute
//! declaration table and the attribute accessors the persistence engine
//! drives.
//!
//! These macros are used by application crates via the `kettle` facade.
//! Generated code refers to `kettle_core`, so crates deriving `Model` also
//! depend on `kettle-core`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

mod infer;
mod parse;
mod validate;

use parse::{CardinalityAttr, FieldDef, FieldKind, ModelDef, RelationAttr, parse_model};

/// Derive macro for the `Model` trait.
///
/// # Attributes
///
/// Struct level:
/// - `#[kettle(table = "name")]` - Override the table name (defaults to the
///   lowercased struct name)
///
/// Field level:
/// - `#[kettle(id)]` - Primary key (exactly one field)
/// - `#[kettle(column = "name")]` - Override the column name
/// - `#[kettle(nullable)]` / `#[kettle(nullable = false)]` - Override
///   nullability (defaults to whether the type is `Option<T>`)
/// - `#[kettle(unique)]` - Add a UNIQUE constraint
/// - `#[kettle(length = N)]` - Declared length for text columns (default 255)
/// - `#[kettle(transient)]` - Not persisted
/// - `#[kettle(one_to_many)]`, `#[kettle(many_to_many)]` - Collection, not
///   persisted
/// - `#[kettle(many_to_one(...))]`, `#[kettle(one_to_one(...))]` - To-one
///   relationship with `join_column = "c"`, `fetch = "eager" | "lazy"` and
///   `cascade(persist, delete)`
///
/// # Example
///
/// ```ignore
/// use kettle::{Model, Related};
///
/// #[derive(Model, Default)]
/// #[kettle(table = "heroes")]
/// struct Hero {
///     #[kettle(id)]
///     id: Option<i64>,
///
///     #[kettle(unique, length = 64)]
///     name: String,
///
///     #[kettle(many_to_one(join_column = "team_id", cascade(persist)))]
///     team: Related<Team>,
///
///     #[kettle(transient)]
///     power_level: u32,
/// }
/// ```
#[proc_macro_derive(Model, attributes(kettle))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let model = match parse_model(&input) {
        Ok(m) => m,
        Err(e) => return e.to_compile_error().into(),
    };

    if let Err(e) = validate::validate_model(&model) {
        return e.to_compile_error().into();
    }

    generate_model_impl(&model).into()
}

fn generate_model_impl(model: &ModelDef) -> TokenStream2 {
    let name = &model.name;
    let name_lit = name.to_string();
    let (impl_generics, ty_generics, where_clause) = model.generics.split_for_impl();

    let table = match &model.table {
        Some(table) => quote! { ::core::option::Option::Some(#table) },
        None => quote! { ::core::option::Option::None },
    };

    let decls = model.fields.iter().map(generate_decl);
    let read_arms = model.fields.iter().filter_map(generate_read_arm);
    let write_arms = model.fields.iter().filter_map(generate_write_arm);

    quote! {
        impl #impl_generics kettle_core::Model for #name #ty_generics #where_clause {
            const NAME: &'static str = #name_lit;
            const TABLE: ::core::option::Option<&'static str> = #table;

            fn attributes() -> &'static [kettle_core::AttributeDecl] {
                static ATTRIBUTES: &[kettle_core::AttributeDecl] = &[
                    #(#decls),*
                ];
                ATTRIBUTES
            }

            fn read(&self, attribute: &str) -> kettle_core::Result<kettle_core::AttributeValue> {
                match attribute {
                    #(#read_arms)*
                    other => ::core::result::Result::Err(
                        kettle_core::MetadataError::unknown_attribute(Self::NAME, other).into(),
                    ),
                }
            }

            fn write(
                &mut self,
                attribute: &str,
                value: kettle_core::AttributeValue,
            ) -> kettle_core::Result<()> {
                match attribute {
                    #(#write_arms)*
                    other => {
                        return ::core::result::Result::Err(
                            kettle_core::MetadataError::unknown_attribute(Self::NAME, other).into(),
                        );
                    }
                }
                ::core::result::Result::Ok(())
            }
        }
    }
}

/// One `AttributeDecl` expression of the static declaration table.
fn generate_decl(field: &FieldDef) -> TokenStream2 {
    let attr = field.name.to_string();
    let ty = &field.ty;

    let mut decl = match &field.kind {
        FieldKind::Transient => quote! { kettle_core::AttributeDecl::transient(#attr) },
        FieldKind::ToMany => quote! { kettle_core::AttributeDecl::to_many(#attr) },
        FieldKind::ToOne(relation) => {
            let relation = generate_relation(field, relation);
            quote! { kettle_core::AttributeDecl::to_one(#attr, #relation) }
        }
        FieldKind::Column => {
            let mut decl = quote! {
                kettle_core::AttributeDecl::column(
                    #attr,
                    <#ty as kettle_core::TypeInfo>::SQL_TYPE,
                )
            };
            decl = match field.nullable {
                Some(nullable) => quote! { #decl.nullable(#nullable) },
                None => quote! { #decl.nullable(<#ty as kettle_core::TypeInfo>::NULLABLE) },
            };
            if field.unique {
                decl = quote! { #decl.unique() };
            }
            if let Some(length) = field.length {
                decl = quote! { #decl.length(#length) };
            }
            decl
        }
    };

    if let Some(column) = &field.column {
        decl = quote! { #decl.named(#column) };
    }
    if field.id {
        decl = quote! { #decl.id() };
    }
    decl
}

fn generate_relation(field: &FieldDef, relation: &RelationAttr) -> TokenStream2 {
    let join = relation
        .join_column
        .as_ref()
        .map_or_else(|| field.name.to_string(), syn::LitStr::value);

    let mut decl = match infer::related_target(&field.ty) {
        Some(target) => {
            let ctor = match relation.cardinality {
                CardinalityAttr::ManyToOne => quote! { many_to_one },
                CardinalityAttr::OneToOne => quote! { one_to_one },
            };
            quote! {
                kettle_core::RelationDecl::#ctor(kettle_core::EntityType::of::<#target>(), #join)
            }
        }
        None => {
            let ty = &field.ty;
            let cardinality = match relation.cardinality {
                CardinalityAttr::ManyToOne => quote! { kettle_core::Cardinality::ManyToOne },
                CardinalityAttr::OneToOne => quote! { kettle_core::Cardinality::OneToOne },
            };
            quote! {
                kettle_core::RelationDecl::scalar(
                    <#ty as kettle_core::TypeInfo>::SQL_TYPE,
                    #join,
                    #cardinality,
                )
            }
        }
    };

    if relation.lazy {
        decl = quote! { #decl.lazy() };
    }
    let persist = relation.cascade_persist;
    let delete = relation.cascade_delete;
    if persist || delete {
        decl = quote! {
            #decl.cascade(kettle_core::Cascade { persist: #persist, delete: #delete })
        };
    }
    decl
}

/// Whether a field is read and written as a plain value.
fn is_scalar(field: &FieldDef) -> bool {
    match &field.kind {
        FieldKind::Column => true,
        FieldKind::ToOne(_) => infer::related_target(&field.ty).is_none(),
        FieldKind::Transient | FieldKind::ToMany => false,
    }
}

fn generate_read_arm(field: &FieldDef) -> Option<TokenStream2> {
    if !field.is_persistent() {
        return None;
    }
    let attr = field.name.to_string();
    let ident = &field.name;

    Some(if is_scalar(field) {
        quote! {
            #attr => ::core::result::Result::Ok(kettle_core::AttributeValue::Scalar(
                kettle_core::Value::from(::core::clone::Clone::clone(&self.#ident)),
            )),
        }
    } else {
        quote! {
            #attr => ::core::result::Result::Ok(kettle_core::AttributeValue::Related(
                self.#ident.to_erased(),
            )),
        }
    })
}

fn generate_write_arm(field: &FieldDef) -> Option<TokenStream2> {
    if !field.is_persistent() {
        return None;
    }
    let attr = field.name.to_string();
    let ident = &field.name;
    let ty = &field.ty;

    Some(if is_scalar(field) {
        quote! {
            #attr => {
                self.#ident = <#ty as kettle_core::FromValue>::from_value(
                    &value.into_scalar(Self::NAME, attribute)?,
                )?;
            }
        }
    } else {
        quote! {
            #attr => {
                self.#ident = <#ty>::from_erased(value.into_related())?;
            }
        }
    })
}
