//! Compile-time validation for the Model derive macro.
//!
//! Every problem found is reported, combined into one error, so a single
//! build shows all of them.

use crate::parse::{FieldDef, FieldKind, ModelDef};
use std::collections::HashMap;
use syn::Error;

/// Validate a parsed model definition.
pub fn validate_model(model: &ModelDef) -> Result<(), Error> {
    let mut errors = Vec::new();

    validate_table_name(model, &mut errors);
    validate_primary_key(model, &mut errors);
    validate_no_duplicate_columns(model, &mut errors);
    for field in &model.fields {
        validate_field(field, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        let mut combined = errors.remove(0);
        for err in errors {
            combined.combine(err);
        }
        Err(combined)
    }
}

fn validate_table_name(model: &ModelDef, errors: &mut Vec<Error>) {
    if let Some(table) = &model.table {
        let value = table.value();
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            errors.push(Error::new_spanned(
                table,
                "table name must be non-empty and contain no whitespace",
            ));
        }
    }
}

fn validate_primary_key(model: &ModelDef, errors: &mut Vec<Error>) {
    let ids: Vec<&FieldDef> = model.id_fields().collect();
    match ids.as_slice() {
        [] => errors.push(Error::new(
            model.name.span(),
            format!(
                "{} has no primary key; mark one field with `#[kettle(id)]`",
                model.name
            ),
        )),
        [id] => {
            if !matches!(id.kind, FieldKind::Column) {
                errors.push(Error::new(
                    id.name.span(),
                    "the primary key must be a plain column",
                ));
            }
        }
        [_, extra @ ..] => {
            for field in extra {
                errors.push(Error::new(
                    field.name.span(),
                    format!("{} declares more than one primary key", model.name),
                ));
            }
        }
    }
}

fn validate_no_duplicate_columns(model: &ModelDef, errors: &mut Vec<Error>) {
    let mut seen: HashMap<String, &FieldDef> = HashMap::new();
    for field in model.fields.iter().filter(|f| f.is_persistent()) {
        let column = match &field.kind {
            FieldKind::ToOne(relation) => match &relation.join_column {
                Some(join) => join.value().to_lowercase(),
                None => continue,
            },
            _ => field.column_name(),
        };
        if let Some(first) = seen.get(&column) {
            errors.push(Error::new(
                field.name.span(),
                format!(
                    "column `{}` is already mapped by field `{}`",
                    column, first.name
                ),
            ));
        } else {
            seen.insert(column, field);
        }
    }
}

fn validate_field(field: &FieldDef, errors: &mut Vec<Error>) {
    match &field.kind {
        FieldKind::ToOne(relation) => {
            if relation.join_column.is_none() {
                errors.push(Error::new(
                    relation.span,
                    format!("relationship `{}` requires `join_column = \"...\"`", field.name),
                ));
            }
            if field.column.is_some() || field.length.is_some() {
                errors.push(Error::new(
                    field.name.span(),
                    "`column` and `length` do not apply to relationships; use `join_column`",
                ));
            }
        }
        FieldKind::Transient | FieldKind::ToMany => {
            if field.column.is_some() || field.unique || field.length.is_some() {
                errors.push(Error::new(
                    field.name.span(),
                    format!("`{}` is not persisted; column options have no effect", field.name),
                ));
            }
        }
        FieldKind::Column => {
            if field.length == Some(0) {
                errors.push(Error::new(field.name.span(), "length must be positive"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_model;
    use syn::{DeriveInput, parse_quote};

    fn check(input: DeriveInput) -> Result<(), Error> {
        validate_model(&parse_model(&input).unwrap())
    }

    #[test]
    fn accepts_valid_model() {
        check(parse_quote! {
            struct Hero {
                #[kettle(id)]
                id: Option<i64>,
                name: String,
                #[kettle(many_to_one(join_column = "team_id"))]
                team: Related<Team>,
            }
        })
        .unwrap();
    }

    #[test]
    fn requires_exactly_one_id() {
        let err = check(parse_quote! {
            struct NoId { name: String }
        })
        .unwrap_err();
        assert!(err.to_string().contains("no primary key"));

        let err = check(parse_quote! {
            struct TwoIds {
                #[kettle(id)] a: i64,
                #[kettle(id)] b: i64,
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("more than one primary key"));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let err = check(parse_quote! {
            struct Dup {
                #[kettle(id)] id: i64,
                name: String,
                #[kettle(column = "NAME")] other: String,
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("already mapped"));
    }

    #[test]
    fn join_column_collides_with_column() {
        let err = check(parse_quote! {
            struct Dup {
                #[kettle(id)] id: i64,
                team_id: i64,
                #[kettle(many_to_one(join_column = "team_id"))] team: Related<Team>,
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("already mapped"));
    }

    #[test]
    fn relationship_needs_join_column() {
        let err = check(parse_quote! {
            struct Hero {
                #[kettle(id)] id: i64,
                #[kettle(many_to_one)] team: Related<Team>,
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("join_column"));
    }

    #[test]
    fn relation_cannot_be_primary_key() {
        let err = check(parse_quote! {
            struct Hero {
                #[kettle(id, one_to_one(join_column = "x_id"))] x: Related<X>,
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("plain column"));
    }
}
