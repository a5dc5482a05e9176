//! Validation of whole metadata documents.

use jsonschema::{Draft, Validator};
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::{compile::describe_path, ContractChaincodeMetadata, SchemaViolations};

const METADATA_SCHEMA_JSON: &str = include_str!("../schema/contract-metadata.json");

static METADATA_SCHEMA: Lazy<Validator> = Lazy::new(|| {
    let schema: Value =
        serde_json::from_str(METADATA_SCHEMA_JSON).expect("embedded metadata schema to parse");
    jsonschema::options()
        .with_draft(Draft::Draft7)
        .build(&schema)
        .expect("embedded metadata schema to compile")
});

/// Metadata document is unusable
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The document does not have the expected structure
    #[error("cannot use metadata. Metadata did not match schema:\n{0}")]
    Invalid(SchemaViolations),
    /// The document could not be turned into JSON
    #[error("cannot use metadata. {0}")]
    Serialize(#[from] serde_json::Error),
}

/// JSON schema every metadata document must satisfy
pub fn json_schema() -> &'static str {
    METADATA_SCHEMA_JSON
}

/// Check `metadata` against [`json_schema`].
///
/// # Errors
/// Lists every violation found.
pub fn validate_against_schema(metadata: &ContractChaincodeMetadata) -> Result<(), MetadataError> {
    let document = serde_json::to_value(metadata)?;

    let violations = METADATA_SCHEMA
        .iter_errors(&document)
        .map(|err| format!("{}: {}", describe_path(&err.instance_path.to_string()), err))
        .collect::<Vec<_>>();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(MetadataError::Invalid(SchemaViolations(violations)))
    }
}
