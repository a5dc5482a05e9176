//! Conversion between the string form of arguments and results and the
//! values transaction functions work with.

use chrono::{DateTime, SecondsFormat, Utc};
use fabric_contract_metadata::{CompiledSchema, ParameterMetadata, ReturnMetadata, SchemaViolations};
use fabric_contract_types::{BasicKind, ConversionError, TypeInfo, TypeKind};
use serde_json::Value;

use crate::parameter::Normalize;

/// Failure converting an argument or result
#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    /// The string is not a value of the basic kind
    #[error("Conversion error. {0}")]
    Conversion(#[from] ConversionError),
    /// The string is not a timestamp
    #[error("Conversion error. {0}")]
    Timestamp(#[from] chrono::ParseError),
    /// The string is not JSON describing the type
    #[error("Conversion error. Value {value} was not passed in expected format {ty}")]
    Format {
        /// Raw argument
        value: String,
        /// Expected type
        ty: String,
    },
    /// The value breaks its declared schema
    #[error("Value did not match schema:\n{0}")]
    Schema(SchemaViolations),
    /// The value could not be written out
    #[error("{0}")]
    Marshal(#[source] serde_json::Error),
}

/// Converts arguments from and results to their string form.
///
/// The chaincode uses [`JsonSerializer`] unless told otherwise.
pub trait TransactionSerializer: Send + Sync {
    /// Convert `raw` into a value of type `ty`.
    ///
    /// `normalize` passes a JSON value through the parameter's Rust type.
    /// When `metadata` carries a compiled schema the value is checked
    /// against it.
    ///
    /// # Errors
    /// If `raw` doesn't describe a `ty`, or breaks the schema.
    fn from_string(
        &self,
        raw: &str,
        ty: &TypeInfo,
        normalize: Normalize,
        metadata: Option<&ParameterMetadata>,
    ) -> Result<Value, SerializerError>;

    /// Convert a result of type `ty` into its string form.
    ///
    /// # Errors
    /// If the value can't be written out, or breaks the return schema.
    fn to_string(
        &self,
        value: &Value,
        ty: &TypeInfo,
        metadata: Option<&ReturnMetadata>,
    ) -> Result<String, SerializerError>;
}

/// Basic kinds as plain text, timestamps as RFC 3339 and everything else as
/// JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl TransactionSerializer for JsonSerializer {
    fn from_string(
        &self,
        raw: &str,
        ty: &TypeInfo,
        normalize: Normalize,
        metadata: Option<&ParameterMetadata>,
    ) -> Result<Value, SerializerError> {
        let value = match &ty.kind {
            TypeKind::Timestamp => {
                let parsed = DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc);
                Value::String(parsed.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            TypeKind::Basic(kind) => kind.convert(raw)?,
            _ => serde_json::from_str(raw)
                .and_then(normalize)
                .map_err(|_| SerializerError::Format {
                    value: raw.to_owned(),
                    ty: ty.name.clone(),
                })?,
        };

        validate(&value, metadata.and_then(|param| param.compiled_schema.as_ref()))?;
        Ok(value)
    }

    fn to_string(
        &self,
        value: &Value,
        ty: &TypeInfo,
        metadata: Option<&ReturnMetadata>,
    ) -> Result<String, SerializerError> {
        if value.is_null() {
            return Ok(String::new());
        }

        let text = format_value(value, ty)?;
        validate(value, metadata.and_then(|returns| returns.compiled_schema.as_ref()))?;
        Ok(text)
    }
}

fn format_value(value: &Value, ty: &TypeInfo) -> Result<String, SerializerError> {
    match &ty.kind {
        TypeKind::Timestamp => {
            let raw = value.as_str().unwrap_or_default();
            let parsed = DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc);
            Ok(parsed.to_rfc3339_opts(SecondsFormat::Secs, true))
        }
        TypeKind::Pointer(inner) if inner.deref_struct().is_none() => format_value(value, inner),
        TypeKind::Array { .. }
        | TypeKind::Slice(_)
        | TypeKind::Map { .. }
        | TypeKind::Struct(_)
        | TypeKind::Pointer(_) => serde_json::to_string(value).map_err(SerializerError::Marshal),
        TypeKind::Basic(BasicKind::Float32) => Ok(format_float32(value)),
        _ => Ok(match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }),
    }
}

/// Shortest text reading back as the same `f32`
#[allow(clippy::cast_possible_truncation)]
fn format_float32(value: &Value) -> String {
    value
        .as_f64()
        .map_or_else(|| value.to_string(), |number| (number as f32).to_string())
}

fn validate(value: &Value, schema: Option<&CompiledSchema>) -> Result<(), SerializerError> {
    match schema {
        Some(schema) => schema.validate(value).map_err(SerializerError::Schema),
        None => Ok(()),
    }
}
