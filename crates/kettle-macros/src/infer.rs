//! Inference from Rust field types.
//!
//! Column types and nullability come from `kettle_core::TypeInfo` at
//! compile time of the user crate; the macro only needs to recognize
//! relationship wrappers.

use syn::{GenericArgument, PathArguments, Type};

/// The `T` of a `Related<T>` field type (any path ending in `Related`).
pub fn related_target(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Related" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}
