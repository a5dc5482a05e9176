//! Chaincode made of contracts: registration, metadata and invocation.

use std::{collections::BTreeMap, sync::Arc};

use fabric_contract_config::metadata::Config as MetadataConfig;
use fabric_contract_metadata::{
    read_metadata_file, validate_against_schema, CompileError, ComponentMetadata,
    ContractChaincodeMetadata, FileSystem, InfoMetadata, MetadataError, OsFileSystem,
    ReadMetadataError, SchemaError,
};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{
    context::{ChaincodeStub, SettableTransactionContext, StubError},
    contract::{
        Contract, ContractDispatch, Invocation, RegisteredContract, RegistrationError,
        DEFAULT_VERSION,
    },
    function::SignatureParser,
    parameter::ArgumentError,
    serializer::{JsonSerializer, SerializerError, TransactionSerializer},
    system::{SystemContract, SYSTEM_CONTRACT_NAME},
};

/// Title of a chaincode that doesn't declare one
pub const DEFAULT_TITLE: &str = "undefined";

/// Payload of an initialization request naming no function
pub const DEFAULT_INIT_PAYLOAD: &str = "Default initiator successful.";

/// Outcome of a chaincode request as reported to the hosting runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// [`Response::OK`] or [`Response::ERROR`]
    pub status: i32,
    /// Error message, empty on success
    pub message: String,
    /// Transaction result
    pub payload: Vec<u8>,
}

impl Response {
    /// Status of a successful request
    pub const OK: i32 = 200;
    /// Status of a failed request
    pub const ERROR: i32 = 500;

    /// Successful response carrying `payload`
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Self::OK,
            message: String::new(),
            payload: payload.into(),
        }
    }

    /// Failed response carrying `message`
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Self::ERROR,
            message: message.into(),
            payload: Vec::new(),
        }
    }

    /// Whether the request succeeded
    pub fn is_ok(&self) -> bool {
        self.status == Self::OK
    }
}

/// Request failed
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum InvokeError {
    /// Contract not found with name {0}
    ContractNotFound(String),
    /// Blank function name passed
    BlankFunction,
    /// Function {function} not found in contract {contract}
    FunctionNotFound {
        /// Requested function
        function: String,
        /// Contract searched
        contract: String,
    },
    /// {0}
    ClientIdentity(#[source] StubError),
    /// Incorrect number of params in supplementary metadata. Expected {expected}, received {received}
    MetadataParamCount {
        /// Parameters the function takes
        expected: usize,
        /// Parameters the metadata describes
        received: usize,
    },
    /// Incorrect number of params. Expected {expected}, received {received}
    ParamCount {
        /// Parameters the function takes
        expected: usize,
        /// Arguments passed
        received: usize,
    },
    /// Error managing parameter{name}. {source}
    Parameter {
        /// Parameter name prefixed with a space, empty without metadata
        name: String,
        /// Conversion failure
        source: SerializerError,
    },
    /// Error managing parameter. {0}
    Argument(#[source] ArgumentError),
    /// Error handling success response. {0}
    Response(#[source] SerializerError),
    /// {0}
    Transaction(String),
    /// {0}
    Metadata(#[from] MetadataBuildError),
}

/// Chaincode metadata can't be put together
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum MetadataBuildError {
    /// {0}
    Read(#[from] ReadMetadataError),
    /// {0}
    Reflect(#[from] SchemaError),
    /// {0}
    Compile(#[from] CompileError),
    /// {0}
    Invalid(#[from] MetadataError),
    /// failed to write metadata. {0}
    Serialize(#[from] serde_json::Error),
}

/// Entry points called by the hosting runtime
pub trait Chaincode: Send + Sync {
    /// Handle an initialization request
    fn init(&self, stub: Arc<dyn ChaincodeStub>) -> Response;

    /// Handle a transaction request
    fn invoke(&self, stub: Arc<dyn ChaincodeStub>) -> Response;
}

/// Metadata frozen for the lifetime of the chaincode
#[derive(Debug)]
struct FrozenMetadata {
    document: ContractChaincodeMetadata,
    json: String,
}

/// Contracts exposed through a single chaincode.
///
/// The system contract is part of every chaincode. The first contract added
/// becomes the default one, invoked when the requested function names no
/// contract.
pub struct ContractChaincode {
    info: InfoMetadata,
    contracts: BTreeMap<String, Box<dyn ContractDispatch>>,
    default_contract: Option<String>,
    serializer: Arc<dyn TransactionSerializer>,
    parser: SignatureParser,
    metadata_config: MetadataConfig,
    file_system: Arc<dyn FileSystem>,
    metadata: OnceCell<FrozenMetadata>,
}

impl core::fmt::Debug for ContractChaincode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContractChaincode")
            .field("info", &self.info)
            .field("contracts", &self.contracts.keys().collect::<Vec<_>>())
            .field("default_contract", &self.default_contract)
            .field("metadata_config", &self.metadata_config)
            .finish_non_exhaustive()
    }
}

impl Default for ContractChaincode {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractChaincode {
    /// Chaincode holding only the system contract
    pub fn new() -> Self {
        let mut contracts: BTreeMap<String, Box<dyn ContractDispatch>> = BTreeMap::new();
        contracts.insert(SYSTEM_CONTRACT_NAME.to_owned(), Box::new(SystemContract::new()));
        info!(contract = SYSTEM_CONTRACT_NAME, "System contract added");

        Self {
            info: InfoMetadata::default(),
            contracts,
            default_contract: None,
            serializer: Arc::new(JsonSerializer),
            parser: SignatureParser::new(),
            metadata_config: MetadataConfig::default(),
            file_system: Arc::new(OsFileSystem),
            metadata: OnceCell::new(),
        }
    }

    /// Add `contract` under its name.
    ///
    /// # Errors
    /// If the name is taken, or the contract has no usable transaction or an
    /// invalid one.
    pub fn add_contract<C, X>(&mut self, contract: C) -> Result<&mut Self, RegistrationError>
    where
        C: Contract<X>,
        X: SettableTransactionContext,
    {
        let name = contract.name();
        if self.contracts.contains_key(&name) {
            warn!(contract = %name, "Contract name already taken");
            return Err(RegistrationError::Duplicate(name));
        }

        let registered = RegisteredContract::new(contract, &self.parser)?;
        self.contracts.insert(registered.name().to_owned(), Box::new(registered));
        info!(contract = %name, "Contract added");

        if self.default_contract.is_none() {
            info!(contract = %name, "Default contract set");
            self.default_contract = Some(name);
        }
        self.metadata.take();
        Ok(self)
    }

    /// Invoke contract `name` for requests naming no contract.
    ///
    /// # Errors
    /// If there is no such contract, or it is the system contract.
    pub fn set_default_contract(&mut self, name: &str) -> Result<&mut Self, RegistrationError> {
        if name == SYSTEM_CONTRACT_NAME {
            return Err(RegistrationError::SystemDefault);
        }
        if !self.contracts.contains_key(name) {
            return Err(RegistrationError::UnknownDefault(name.to_owned()));
        }

        info!(contract = name, "Default contract set");
        self.default_contract = Some(name.to_owned());
        self.metadata.take();
        Ok(self)
    }

    /// Contract invoked for requests naming no contract
    pub fn default_contract(&self) -> Option<&str> {
        self.default_contract.as_deref()
    }

    /// Names of all contracts, the system contract included
    pub fn contract_names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }

    /// Information about the chaincode
    pub fn info(&self) -> &InfoMetadata {
        &self.info
    }

    /// Describe the chaincode with `info`
    #[must_use]
    pub fn with_info(mut self, info: InfoMetadata) -> Self {
        self.info = info;
        self.metadata.take();
        self
    }

    /// Convert arguments and results with `serializer`
    #[must_use]
    pub fn with_serializer(mut self, serializer: impl TransactionSerializer + 'static) -> Self {
        self.serializer = Arc::new(serializer);
        self
    }

    /// Look for the metadata file as `config` says
    #[must_use]
    pub fn with_metadata_config(mut self, config: MetadataConfig) -> Self {
        self.metadata_config = config;
        self.metadata.take();
        self
    }

    /// Read the metadata file through `file_system`
    #[must_use]
    pub fn with_file_system(mut self, file_system: impl FileSystem + 'static) -> Self {
        self.file_system = Arc::new(file_system);
        self.metadata.take();
        self
    }

    /// Describe the chaincode from its contracts alone.
    ///
    /// # Errors
    /// If a transaction uses a type with no schema.
    pub fn reflect_metadata(&self) -> Result<ContractChaincodeMetadata, SchemaError> {
        let mut components = ComponentMetadata::default();
        let mut contracts = BTreeMap::new();
        for (name, contract) in &self.contracts {
            let mut metadata = contract.reflect(&mut components)?;
            metadata.default = self.default_contract.as_ref() == Some(name);
            contracts.insert(name.clone(), metadata);
        }

        let mut info = self.info.clone();
        if info.title.is_empty() {
            DEFAULT_TITLE.clone_into(&mut info.title);
        }
        if info.version.is_empty() {
            DEFAULT_VERSION.clone_into(&mut info.version);
        }

        Ok(ContractChaincodeMetadata {
            info: Some(info),
            contracts,
            components,
        })
    }

    /// Metadata served by the system contract and used to validate
    /// arguments and results.
    ///
    /// The metadata file, if any, is taken as is and completed with the
    /// reflected metadata. The result is compiled, checked against the
    /// metadata JSON schema and then kept until the chaincode changes.
    ///
    /// # Errors
    /// If the file can't be read, or the result can't be compiled or breaks
    /// the schema.
    pub fn metadata(&self) -> Result<&ContractChaincodeMetadata, MetadataBuildError> {
        Ok(&self.frozen_metadata()?.document)
    }

    fn frozen_metadata(&self) -> Result<&FrozenMetadata, MetadataBuildError> {
        self.metadata.get_or_try_init(|| {
            let mut document = match read_metadata_file(&self.metadata_config, &*self.file_system) {
                Ok(document) => document,
                Err(err) if err.is_not_found() => {
                    debug!("No metadata file, using reflected metadata only");
                    ContractChaincodeMetadata::default()
                }
                Err(err) => return Err(err.into()),
            };

            document.append(self.reflect_metadata()?);
            document.compile_schemas()?;
            validate_against_schema(&document)?;

            let json = serde_json::to_string(&document)?;
            Ok(FrozenMetadata { document, json })
        })
    }

    fn dispatch(&self, stub: &Arc<dyn ChaincodeStub>, requested: &str, args: &[String]) -> Result<String, InvokeError> {
        let (contract_name, function) = match requested.rfind(':') {
            Some(split) => (&requested[..split], &requested[split + 1..]),
            None => (self.default_contract.as_deref().unwrap_or_default(), requested),
        };

        let contract = self
            .contracts
            .get(contract_name)
            .ok_or_else(|| InvokeError::ContractNotFound(contract_name.to_owned()))?;
        if function.is_empty() {
            return Err(InvokeError::BlankFunction);
        }

        debug!(contract = contract_name, function, "Dispatching request");
        let metadata = self.frozen_metadata()?;
        contract.invoke(Invocation {
            stub,
            function,
            args,
            metadata: metadata.document.contracts.get(contract_name),
            metadata_json: &metadata.json,
            serializer: &*self.serializer,
        })
    }
}

impl Chaincode for ContractChaincode {
    fn init(&self, stub: Arc<dyn ChaincodeStub>) -> Response {
        let (function, _) = stub.get_function_and_parameters();
        if function.is_empty() {
            return Response::success(DEFAULT_INIT_PAYLOAD);
        }
        self.invoke(stub)
    }

    fn invoke(&self, stub: Arc<dyn ChaincodeStub>) -> Response {
        let (function, args) = stub.get_function_and_parameters();
        match self.dispatch(&stub, &function, &args) {
            Ok(payload) => Response::success(payload),
            Err(err) => {
                warn!(function = %function, tx_id = %stub.get_tx_id(), error = %err, "Transaction failed");
                Response::error(err.to_string())
            }
        }
    }
}
