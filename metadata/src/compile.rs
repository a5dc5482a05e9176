//! Compiling parameter and return schemas into validators.
//!
//! Each schema is compiled into a document `{definitions, properties}` where
//! the components become draft-07 definitions. Values are validated wrapped
//! under their property name, e.g. `{"param0": value}` or `{"return": value}`.

use core::fmt;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use fabric_contract_types::text::numbered_list;
use jsonschema::{Draft, Validator};
use serde_json::{json, Map, Value};

use crate::{schema::COMPONENT_REF_PREFIX, ComponentMetadata, ContractChaincodeMetadata};

const DEFINITIONS_REF_PREFIX: &str = "#/definitions/";

/// error compiling schema for {contract} [{transaction}]. {subject} schema invalid. {reason}
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub struct CompileError {
    /// Contract declaring the transaction
    pub contract: String,
    /// Transaction name
    pub transaction: String,
    /// Parameter name, or `Return`
    pub subject: String,
    /// Why compilation failed
    pub reason: String,
}

/// Violations found while validating a value, each on its own numbered line
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct SchemaViolations(pub Vec<String>);

impl fmt::Display for SchemaViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&numbered_list(&self.0))
    }
}

/// Schema compiled against the components it references
#[derive(Clone)]
pub struct CompiledSchema {
    property: String,
    source: Value,
    validator: Arc<Validator>,
}

impl CompiledSchema {
    /// Property name values are validated under
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Schema the validator was built from
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Validate `value` wrapped under the property name.
    ///
    /// # Errors
    /// Lists every violation found.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolations> {
        let mut wrapped = Map::new();
        wrapped.insert(self.property.clone(), value.clone());
        let wrapped = Value::Object(wrapped);

        let violations = self
            .validator
            .iter_errors(&wrapped)
            .map(|err| format!("{}: {}", describe_path(&err.instance_path.to_string()), err))
            .collect::<Vec<_>>();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolations(violations))
        }
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("property", &self.property)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CompiledSchema {
    fn eq(&self, other: &Self) -> bool {
        self.property == other.property && self.source == other.source
    }
}

/// Dotted location of a violation, `(root)` for the document itself
pub(crate) fn describe_path(pointer: &str) -> String {
    if pointer.is_empty() {
        return "(root)".to_owned();
    }
    pointer.trim_start_matches('/').replace('/', ".")
}

impl ContractChaincodeMetadata {
    /// Compile every parameter and return schema of every transaction.
    ///
    /// References to components are resolved against `components`. A
    /// reference to a missing component fails compilation.
    ///
    /// # Errors
    /// Names the contract, transaction and parameter (or return) whose schema
    /// failed to compile.
    pub fn compile_schemas(&mut self) -> Result<(), CompileError> {
        let definitions = Definitions::new(&self.components);

        for (contract_name, contract) in &mut self.contracts {
            for tx in &mut contract.transactions {
                let fail = |subject: &str, reason: String| CompileError {
                    contract: contract_name.clone(),
                    transaction: tx.name.clone(),
                    subject: subject.to_owned(),
                    reason,
                };

                for param in &mut tx.parameters {
                    let compiled = definitions
                        .compile(&param.name, &param.schema)
                        .map_err(|reason| fail(&param.name, reason))?;
                    param.compiled_schema = Some(compiled);
                }

                tx.returns.compiled_schema = match &tx.returns.schema {
                    Some(schema) => Some(
                        definitions
                            .compile("return", schema)
                            .map_err(|reason| fail("Return", reason))?,
                    ),
                    None => None,
                };
            }
        }

        Ok(())
    }
}

/// Components rewritten as draft-07 definitions
struct Definitions {
    schemas: Map<String, Value>,
    references: BTreeMap<String, BTreeSet<String>>,
}

impl Definitions {
    fn new(components: &ComponentMetadata) -> Self {
        let mut schemas = Map::new();
        let mut references = BTreeMap::new();

        for (key, object) in &components.schemas {
            let mut refs = BTreeSet::new();
            let properties = object
                .properties
                .iter()
                .map(|(name, schema)| {
                    let mut schema = schema.clone();
                    rewrite_refs(&mut schema, &mut refs);
                    (name.clone(), schema)
                })
                .collect::<Map<_, _>>();

            let mut definition = json!({
                "properties": properties,
                "additionalProperties": object.additional_properties,
            });
            if !object.required.is_empty() {
                definition["required"] = json!(object.required);
            }

            schemas.insert(key.clone(), definition);
            references.insert(key.clone(), refs);
        }

        Self {
            schemas,
            references,
        }
    }

    fn compile(&self, property: &str, schema: &Value) -> Result<CompiledSchema, String> {
        let mut rewritten = schema.clone();
        let mut refs = BTreeSet::new();
        rewrite_refs(&mut rewritten, &mut refs);
        self.check_resolvable(refs)?;

        let document = json!({
            "definitions": self.schemas,
            "properties": { property: rewritten },
        });
        let validator = jsonschema::options()
            .with_draft(Draft::Draft7)
            .build(&document)
            .map_err(|err| err.to_string())?;

        Ok(CompiledSchema {
            property: property.to_owned(),
            source: schema.clone(),
            validator: Arc::new(validator),
        })
    }

    /// Follow references through the components, failing on the first
    /// component that does not exist
    fn check_resolvable(&self, refs: BTreeSet<String>) -> Result<(), String> {
        let mut pending = refs.into_iter().collect::<Vec<_>>();
        let mut seen = BTreeSet::new();

        while let Some(key) = pending.pop() {
            if !seen.insert(key.clone()) {
                continue;
            }
            let Some(nested) = self.references.get(&key) else {
                return Err(format!("unresolvable reference to component {key}"));
            };
            pending.extend(nested.iter().cloned());
        }

        Ok(())
    }
}

/// Point component references at definitions, collecting the keys referenced
fn rewrite_refs(schema: &mut Value, refs: &mut BTreeSet<String>) {
    match schema {
        Value::Object(object) => {
            for (name, value) in object.iter_mut() {
                if name == "$ref" {
                    if let Value::String(reference) = value {
                        if let Some(key) = component_key(reference) {
                            *reference = format!("{DEFINITIONS_REF_PREFIX}{}", pointer_segment(&key));
                            refs.insert(key);
                        }
                    }
                } else {
                    rewrite_refs(value, refs);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|item| rewrite_refs(item, refs)),
        _ => {}
    }
}

fn component_key(reference: &str) -> Option<String> {
    if let Some(key) = reference.strip_prefix(COMPONENT_REF_PREFIX) {
        return Some(key.to_owned());
    }
    if reference.starts_with('#') {
        return None;
    }
    Some(reference.to_owned())
}

/// Escape `key` as a JSON pointer segment inside a URI fragment
fn pointer_segment(key: &str) -> String {
    let escaped = key.replace('~', "~0").replace('/', "~1");
    let mut encoded = String::with_capacity(escaped.len());
    for byte in escaped.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~!$&'()*+,;=:@".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}
