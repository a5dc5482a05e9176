//! Structural description of a chaincode and its contracts.
//!
//! The document produced here is served by the metadata system transaction
//! and, once compiled, validates transaction arguments and results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

mod compile;
pub mod file;
pub mod schema;
mod validation;

pub use compile::{CompileError, CompiledSchema, SchemaViolations};
pub use file::{read_metadata_file, FileSystem, MemoryFileSystem, OsFileSystem, ReadMetadataError};
pub use schema::{get_schema, SchemaError};
pub use validation::{json_schema, validate_against_schema, MetadataError};

/// Details about a parameter used for a transaction.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ParameterMetadata {
    /// Free-form description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Parameter name, `paramN` unless supplied by a metadata file
    pub name: String,
    /// Structural schema of accepted values
    #[serde(default)]
    pub schema: Value,
    /// Validator built by [`ContractChaincodeMetadata::compile_schemas`]
    #[serde(skip)]
    pub compiled_schema: Option<CompiledSchema>,
}

/// Schema of the value a transaction returns.
///
/// Serialized in place as the `returns` property of the transaction.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ReturnMetadata {
    /// Structural schema of the returned value
    #[serde(rename = "returns", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Validator built by [`ContractChaincodeMetadata::compile_schemas`]
    #[serde(skip)]
    pub compiled_schema: Option<CompiledSchema>,
}

/// What makes up a transaction
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TransactionMetadata {
    /// Parameters excluding the transaction context
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterMetadata>,
    /// Call type tags, e.g. `submit` and `SUBMIT`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<String>,
    /// Transaction name
    pub name: String,
    /// Returned value
    #[serde(flatten)]
    pub returns: ReturnMetadata,
}

/// Contact details of an author of a contract or chaincode
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContactMetadata {
    /// Name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Web address
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// E-mail address
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

/// Licensing information
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LicenseMetadata {
    /// License name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Link to the license text
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// Additional information to clarify use of a contract or chaincode
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct InfoMetadata {
    /// Description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Title
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Contact of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactMetadata>,
    /// License
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<LicenseMetadata>,
    /// Version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// What makes up a contract
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ContractMetadata {
    /// Contract information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<InfoMetadata>,
    /// Contract name
    pub name: String,
    /// Transactions in name order
    #[serde(default)]
    pub transactions: Vec<TransactionMetadata>,
    /// Whether this is the default contract of the chaincode
    #[serde(default)]
    pub default: bool,
}

/// Schema of a struct registered as a component
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ObjectMetadata {
    /// Component key
    #[serde(rename = "$id")]
    pub id: String,
    /// Property name to schema
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    /// Properties which must be present, in field order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Whether unknown properties are accepted
    #[serde(rename = "additionalProperties", default)]
    pub additional_properties: bool,
}

/// Shared component schemas
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ComponentMetadata {
    /// Component key to schema
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, ObjectMetadata>,
}

/// Description of a chaincode made of contracts
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ContractChaincodeMetadata {
    /// Chaincode information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<InfoMetadata>,
    /// Contract name to contract
    #[serde(default)]
    pub contracts: BTreeMap<String, ContractMetadata>,
    /// Components referenced from transaction schemas
    #[serde(default)]
    pub components: ComponentMetadata,
}

impl ComponentMetadata {
    /// No component registered
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl ContractChaincodeMetadata {
    /// Merge `source` into `self`, only filling what `self` leaves unset:
    /// a missing info, an empty contract map or empty components.
    pub fn append(&mut self, source: Self) {
        if self.info.is_none() {
            self.info = source.info;
        }

        if self.contracts.is_empty() {
            self.contracts = source.contracts;
        }

        if self.components.is_empty() {
            self.components = source.components;
        }
    }
}

pub mod prelude {
    //! Re-exports of the document model.

    pub use super::{
        ComponentMetadata, ContactMetadata, ContractChaincodeMetadata, ContractMetadata,
        InfoMetadata, LicenseMetadata, ObjectMetadata, ParameterMetadata, ReturnMetadata,
        TransactionMetadata,
    };
}
