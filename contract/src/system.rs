//! Contract every chaincode carries, describing the chaincode itself.

use std::collections::BTreeMap;

use fabric_contract_metadata::{
    ComponentMetadata, ContractMetadata, InfoMetadata, ReturnMetadata, SchemaError,
    TransactionMetadata,
};
use serde_json::json;
use tracing::debug;

use crate::{
    chaincode::InvokeError,
    contract::{resolve_function, ContractDispatch, Invocation, DEFAULT_VERSION},
    function::CallType,
};

/// Name of the system contract
pub const SYSTEM_CONTRACT_NAME: &str = "org.hyperledger.fabric";

/// Transaction returning the chaincode metadata as JSON
pub const GET_METADATA: &str = "GetMetadata";

/// Serves the frozen metadata of the chaincode
#[derive(Debug)]
pub(crate) struct SystemContract {
    functions: BTreeMap<String, CallType>,
}

impl SystemContract {
    pub(crate) fn new() -> Self {
        Self {
            functions: [(GET_METADATA.to_owned(), CallType::Evaluate)].into(),
        }
    }
}

impl ContractDispatch for SystemContract {
    fn name(&self) -> &str {
        SYSTEM_CONTRACT_NAME
    }

    fn reflect(&self, _components: &mut ComponentMetadata) -> Result<ContractMetadata, SchemaError> {
        let transactions = self
            .functions
            .iter()
            .map(|(name, call_type)| TransactionMetadata {
                name: name.clone(),
                tag: call_type.tags().map(str::to_owned).to_vec(),
                returns: ReturnMetadata {
                    schema: Some(json!({ "type": "string" })),
                    compiled_schema: None,
                },
                ..TransactionMetadata::default()
            })
            .collect();

        Ok(ContractMetadata {
            info: Some(InfoMetadata {
                title: SYSTEM_CONTRACT_NAME.to_owned(),
                version: DEFAULT_VERSION.to_owned(),
                ..InfoMetadata::default()
            }),
            name: SYSTEM_CONTRACT_NAME.to_owned(),
            transactions,
            default: false,
        })
    }

    fn invoke(&self, invocation: Invocation<'_>) -> Result<String, InvokeError> {
        match resolve_function(&self.functions, invocation.function) {
            Some((GET_METADATA, _)) => {
                debug!(function = GET_METADATA, "Serving chaincode metadata");
                Ok(invocation.metadata_json.to_owned())
            }
            _ => Err(InvokeError::FunctionNotFound {
                function: invocation.function.to_owned(),
                contract: SYSTEM_CONTRACT_NAME.to_owned(),
            }),
        }
    }
}
