//! Structural schemas for contract types.
//!
//! Structs are registered once as components and referenced from every place
//! they are used. A struct's own fields reference other components by bare
//! key, everything else uses `#/components/schemas/<key>`.

use fabric_contract_types::{StructInfo, TypeInfo, TypeKind};
use serde_json::{json, Value};

use crate::{ComponentMetadata, ObjectMetadata};

/// Prefix of references to components from outside the components section
pub const COMPONENT_REF_PREFIX: &str = "#/components/schemas/";

/// Failed to describe a type
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub enum SchemaError {
    /// {0} was not a valid type
    InvalidType(String),
    /// Arrays must have length greater than 0
    EmptyArray,
}

/// Schema for `ty`, registering the structs it uses into `components`.
///
/// Property names follow the field annotations: a metadata name wins over a
/// serde rename, which wins over the identifier. Flattened fields contribute
/// their own fields to the parent. Pointers also accept `null`.
///
/// # Errors
/// If `ty`, or any type it is built from, has no schema.
pub fn get_schema(ty: &TypeInfo, components: &mut ComponentMetadata) -> Result<Value, SchemaError> {
    build(ty, components, false)
}

fn build(ty: &TypeInfo, components: &mut ComponentMetadata, nested: bool) -> Result<Value, SchemaError> {
    match &ty.kind {
        TypeKind::Basic(kind) => Ok(kind.schema()),
        TypeKind::Timestamp => Ok(json!({ "type": "string", "format": "date-time" })),
        TypeKind::Array { len: 0, .. } => Err(SchemaError::EmptyArray),
        TypeKind::Array { elem, .. } | TypeKind::Slice(elem) => Ok(json!({
            "type": "array",
            "items": build(elem, components, nested)?,
        })),
        TypeKind::Map { value, .. } => Ok(json!({
            "type": "object",
            "additionalProperties": build(value, components, nested)?,
        })),
        TypeKind::Struct(info) => struct_ref(ty, info, components, nested),
        TypeKind::Pointer(inner) => Ok(json!({
            "anyOf": [build(inner.pointee(), components, nested)?, { "type": "null" }],
        })),
        TypeKind::Error | TypeKind::Interface(_) | TypeKind::Unsupported => {
            Err(SchemaError::InvalidType(ty.name.clone()))
        }
    }
}

fn struct_ref(
    ty: &TypeInfo,
    info: &StructInfo,
    components: &mut ComponentMetadata,
    nested: bool,
) -> Result<Value, SchemaError> {
    let key = ty.component_key();
    add_component_if_not_exists(&key, info, components)?;

    let reference = if nested {
        key
    } else {
        format!("{COMPONENT_REF_PREFIX}{key}")
    };
    Ok(json!({ "$ref": reference }))
}

fn add_component_if_not_exists(
    key: &str,
    info: &StructInfo,
    components: &mut ComponentMetadata,
) -> Result<(), SchemaError> {
    if components.schemas.contains_key(key) {
        return Ok(());
    }

    // reserved before recursing so that self references terminate
    components.schemas.insert(
        key.to_owned(),
        ObjectMetadata {
            id: key.to_owned(),
            ..ObjectMetadata::default()
        },
    );

    let mut object = ObjectMetadata {
        id: key.to_owned(),
        ..ObjectMetadata::default()
    };
    for field in info.serialized_fields() {
        let schema = match build(&(field.ty)(), components, true) {
            Ok(schema) => schema,
            Err(err) => {
                components.schemas.remove(key);
                return Err(err);
            }
        };

        let name = field.property_name().to_owned();
        if field.is_required() {
            object.required.push(name.clone());
        }
        object.properties.insert(name, schema);
    }

    components.schemas.insert(key.to_owned(), object);
    Ok(())
}
