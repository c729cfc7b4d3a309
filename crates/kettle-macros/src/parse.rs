//! Parsing logic for the Model derive macro.
//!
//! Extracts struct-level and field-level `#[kettle(...)]` attributes into
//! `ModelDef` / `FieldDef`, which code generation consumes.

use proc_macro2::Span;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Data, DeriveInput, Error, Field, Fields, Ident, Lit, LitStr, Result, Type};

/// Parsed model definition from a struct with `#[derive(Model)]`.
#[derive(Debug)]
pub struct ModelDef {
    /// The struct name (e.g., `User`).
    pub name: Ident,
    /// Declared table name, if any.
    pub table: Option<LitStr>,
    pub fields: Vec<FieldDef>,
    pub generics: syn::Generics,
}

/// Parsed field definition.
#[derive(Debug)]
pub struct FieldDef {
    /// The Rust field name, also the attribute name.
    pub name: Ident,
    pub ty: Type,
    pub column: Option<LitStr>,
    pub id: bool,
    /// Explicit nullability; `None` follows the Rust type.
    pub nullable: Option<bool>,
    pub unique: bool,
    pub length: Option<u32>,
    pub kind: FieldKind,
}

/// How a field takes part in persistence.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Column,
    Transient,
    /// `one_to_many` or `many_to_many`; never persisted.
    ToMany,
    ToOne(RelationAttr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalityAttr {
    OneToOne,
    ManyToOne,
}

/// Parsed `one_to_one(...)` / `many_to_one(...)` content.
#[derive(Debug, Clone)]
pub struct RelationAttr {
    pub cardinality: CardinalityAttr,
    pub join_column: Option<LitStr>,
    pub lazy: bool,
    pub cascade_persist: bool,
    pub cascade_delete: bool,
    /// Span of the relationship keyword, for error reporting.
    pub span: Span,
}

impl ModelDef {
    pub fn id_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.id)
    }
}

impl FieldDef {
    /// Column this field maps to: the declared name or the lowercased
    /// field name.
    pub fn column_name(&self) -> String {
        self.column
            .as_ref()
            .map_or_else(|| self.name.to_string().to_lowercase(), LitStr::value)
    }

    /// Whether the field takes part in persistence.
    pub fn is_persistent(&self) -> bool {
        matches!(self.kind, FieldKind::Column | FieldKind::ToOne(_))
    }
}

/// Parse a derive input into a model definition.
pub fn parse_model(input: &DeriveInput) -> Result<ModelDef> {
    let table = parse_struct_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => parse_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not unions",
            ));
        }
    };

    Ok(ModelDef {
        name: input.ident.clone(),
        table,
        fields,
        generics: input.generics.clone(),
    })
}

/// Parse struct-level `#[kettle(table = "name")]`.
fn parse_struct_attrs(attrs: &[Attribute]) -> Result<Option<LitStr>> {
    let mut table = None;

    for attr in attrs {
        if !attr.path().is_ident("kettle") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                table = Some(string_value(&meta, "table")?);
                Ok(())
            } else {
                Err(meta.error("unknown struct attribute, expected `table`"))
            }
        })?;
    }

    Ok(table)
}

fn parse_fields(fields: &Fields) -> Result<Vec<FieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_field).collect(),
        Fields::Unnamed(_) => Err(Error::new(
            Span::call_site(),
            "Model requires a struct with named fields, not a tuple struct",
        )),
        Fields::Unit => Err(Error::new(
            Span::call_site(),
            "Model requires a struct with fields, not a unit struct",
        )),
    }
}

fn parse_field(field: &Field) -> Result<FieldDef> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut def = FieldDef {
        name,
        ty: field.ty.clone(),
        column: None,
        id: false,
        nullable: None,
        unique: false,
        length: None,
        kind: FieldKind::Column,
    };

    for attr in &field.attrs {
        if !attr.path().is_ident("kettle") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("id") {
                def.id = true;
            } else if path.is_ident("unique") {
                def.unique = true;
            } else if path.is_ident("transient") {
                set_kind(&mut def, &meta, FieldKind::Transient)?;
            } else if path.is_ident("one_to_many") || path.is_ident("many_to_many") {
                set_kind(&mut def, &meta, FieldKind::ToMany)?;
            } else if path.is_ident("column") {
                def.column = Some(string_value(&meta, "column")?);
            } else if path.is_ident("nullable") {
                def.nullable = Some(if meta.input.peek(syn::Token![=]) {
                    bool_value(&meta, "nullable")?
                } else {
                    true
                });
            } else if path.is_ident("length") {
                let value: Lit = meta.value()?.parse()?;
                let Lit::Int(lit) = value else {
                    return Err(Error::new_spanned(value, "expected integer literal for length"));
                };
                def.length = Some(lit.base10_parse()?);
            } else if path.is_ident("one_to_one") {
                let relation = parse_relation(&meta, CardinalityAttr::OneToOne)?;
                set_kind(&mut def, &meta, FieldKind::ToOne(relation))?;
            } else if path.is_ident("many_to_one") {
                let relation = parse_relation(&meta, CardinalityAttr::ManyToOne)?;
                set_kind(&mut def, &meta, FieldKind::ToOne(relation))?;
            } else {
                return Err(meta.error(
                    "unknown field attribute, expected one of `id`, `column`, `nullable`, \
                     `unique`, `length`, `transient`, `one_to_one`, `many_to_one`, \
                     `one_to_many`, `many_to_many`",
                ));
            }
            Ok(())
        })?;
    }

    Ok(def)
}

fn set_kind(def: &mut FieldDef, meta: &ParseNestedMeta<'_>, kind: FieldKind) -> Result<()> {
    if !matches!(def.kind, FieldKind::Column) {
        return Err(meta.error(format!(
            "field `{}` already has a relationship or transient attribute",
            def.name
        )));
    }
    def.kind = kind;
    Ok(())
}

/// Parse `join_column = "c", fetch = "eager"|"lazy", cascade(persist, delete)`.
fn parse_relation(meta: &ParseNestedMeta<'_>, cardinality: CardinalityAttr) -> Result<RelationAttr> {
    let mut relation = RelationAttr {
        cardinality,
        join_column: None,
        lazy: false,
        cascade_persist: false,
        cascade_delete: false,
        span: meta.path.segments[0].ident.span(),
    };

    if !meta.input.peek(syn::token::Paren) {
        return Ok(relation);
    }

    meta.parse_nested_meta(|nested| {
        let path = &nested.path;
        if path.is_ident("join_column") {
            relation.join_column = Some(string_value(&nested, "join_column")?);
        } else if path.is_ident("fetch") {
            let fetch = string_value(&nested, "fetch")?;
            relation.lazy = match fetch.value().as_str() {
                "eager" => false,
                "lazy" => true,
                _ => {
                    return Err(Error::new_spanned(
                        fetch,
                        "fetch must be \"eager\" or \"lazy\"",
                    ));
                }
            };
        } else if path.is_ident("cascade") {
            nested.parse_nested_meta(|flag| {
                if flag.path.is_ident("persist") {
                    relation.cascade_persist = true;
                } else if flag.path.is_ident("delete") {
                    relation.cascade_delete = true;
                } else if flag.path.is_ident("all") {
                    relation.cascade_persist = true;
                    relation.cascade_delete = true;
                } else {
                    return Err(flag.error("expected `persist`, `delete` or `all`"));
                }
                Ok(())
            })?;
        } else {
            return Err(nested.error("expected `join_column`, `fetch` or `cascade`"));
        }
        Ok(())
    })?;

    Ok(relation)
}

fn string_value(meta: &ParseNestedMeta<'_>, key: &str) -> Result<LitStr> {
    let value: Lit = meta.value()?.parse()?;
    match value {
        Lit::Str(lit) => Ok(lit),
        other => Err(Error::new_spanned(
            other,
            format!("expected string literal for {key}"),
        )),
    }
}

fn bool_value(meta: &ParseNestedMeta<'_>, key: &str) -> Result<bool> {
    let value: Lit = meta.value()?.parse()?;
    match value {
        Lit::Bool(lit) => Ok(lit.value),
        other => Err(Error::new_spanned(
            other,
            format!("expected boolean for {key}"),
        )),
    }
}
