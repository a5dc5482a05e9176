//! Transaction context and the ledger collaborators it carries.

use std::{collections::HashMap, sync::Arc};

use fabric_contract_types::{MethodSignature, TypeInfo, TypeKind};

use crate::{parameter::Argument, ArgumentError, Parameter};

/// Failure reported by the hosting runtime
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct StubError(
    /// Message
    pub String,
);

/// Ledger access for the transaction being executed, supplied by the
/// hosting runtime.
pub trait ChaincodeStub: Send + Sync {
    /// Requested function name and its string arguments
    fn get_function_and_parameters(&self) -> (String, Vec<String>);

    /// Transaction id
    fn get_tx_id(&self) -> String;

    /// Channel the transaction was submitted on
    fn get_channel_id(&self) -> String;

    /// Serialized identity of the submitter.
    ///
    /// # Errors
    /// If the proposal can't be read.
    fn get_creator(&self) -> Result<Vec<u8>, StubError>;

    /// Transient data of the proposal.
    ///
    /// # Errors
    /// If the proposal can't be read.
    fn get_transient(&self) -> Result<HashMap<String, Vec<u8>>, StubError>;

    /// Identity of the submitter, decoded from [`get_creator`](Self::get_creator).
    ///
    /// # Errors
    /// If the creator can't be decoded.
    fn client_identity(&self) -> Result<Arc<dyn ClientIdentity>, StubError>;

    /// World state value at `key`, `None` when absent.
    ///
    /// # Errors
    /// If the ledger can't be read.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StubError>;

    /// Write `value` at `key` in the world state.
    ///
    /// # Errors
    /// If the write is rejected.
    fn put_state(&self, key: &str, value: &[u8]) -> Result<(), StubError>;

    /// Remove `key` from the world state.
    ///
    /// # Errors
    /// If the delete is rejected.
    fn del_state(&self, key: &str) -> Result<(), StubError>;

    /// Private data value at `key` in `collection`, `None` when absent.
    ///
    /// # Errors
    /// If the collection can't be read.
    fn get_private_data(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, StubError>;

    /// Write `value` at `key` in `collection`.
    ///
    /// # Errors
    /// If the write is rejected.
    fn put_private_data(&self, collection: &str, key: &str, value: &[u8]) -> Result<(), StubError>;

    /// Remove `key` from `collection`.
    ///
    /// # Errors
    /// If the delete is rejected.
    fn del_private_data(&self, collection: &str, key: &str) -> Result<(), StubError>;
}

/// Identity of the client that submitted the transaction
pub trait ClientIdentity: Send + Sync {
    /// Unique id of the client within its MSP.
    ///
    /// # Errors
    /// If the certificate can't be read.
    fn get_id(&self) -> Result<String, StubError>;

    /// MSP the client belongs to.
    ///
    /// # Errors
    /// If the identity can't be read.
    fn get_msp_id(&self) -> Result<String, StubError>;

    /// Value of the certificate attribute `name`, `None` when absent.
    ///
    /// # Errors
    /// If the certificate can't be read.
    fn get_attribute_value(&self, name: &str) -> Result<Option<String>, StubError>;
}

/// Access to the collaborators of the current transaction.
///
/// Both are present once the context has been handed to a transaction
/// function.
pub trait TransactionContextInterface: Send + Sync {
    /// Ledger access
    fn get_stub(&self) -> Option<&dyn ChaincodeStub>;

    /// Submitting client
    fn get_client_identity(&self) -> Option<&dyn ClientIdentity>;
}

/// Transaction context the chaincode can prepare for an invocation.
///
/// A fresh context is created with [`Default`] for every invocation and
/// cloned into every handler taking it, so state shared between the before,
/// main and after handlers has to live behind a shared pointer.
pub trait SettableTransactionContext: Default + Clone + Send + Sync + 'static {
    /// Attach ledger access
    fn set_stub(&mut self, stub: Arc<dyn ChaincodeStub>);

    /// Attach the submitting client
    fn set_client_identity(&mut self, identity: Arc<dyn ClientIdentity>);

    /// Descriptor recognising the context among parameters. Methods listed
    /// here are matched against context interfaces.
    fn context_type() -> TypeInfo;
}

/// Default transaction context
#[derive(Clone, Default)]
pub struct TransactionContext {
    stub: Option<Arc<dyn ChaincodeStub>>,
    client_identity: Option<Arc<dyn ClientIdentity>>,
}

impl core::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("stub", &self.stub.as_ref().map(|stub| stub.get_tx_id()))
            .field("client_identity", &self.client_identity.is_some())
            .finish()
    }
}

impl TransactionContextInterface for TransactionContext {
    fn get_stub(&self) -> Option<&dyn ChaincodeStub> {
        self.stub.as_deref()
    }

    fn get_client_identity(&self) -> Option<&dyn ClientIdentity> {
        self.client_identity.as_deref()
    }
}

impl SettableTransactionContext for TransactionContext {
    fn set_stub(&mut self, stub: Arc<dyn ChaincodeStub>) {
        self.stub = Some(stub);
    }

    fn set_client_identity(&mut self, identity: Arc<dyn ClientIdentity>) {
        self.client_identity = Some(identity);
    }

    fn context_type() -> TypeInfo {
        TypeInfo::of::<Self>("TransactionContext", TypeKind::Unsupported)
            .in_module(module_path!())
            .with_methods(transaction_context_methods())
    }
}

crate::context_parameter!(TransactionContext);

/// Methods of [`TransactionContextInterface`], for descriptors of contexts
/// implementing it
pub fn transaction_context_methods() -> Vec<MethodSignature> {
    vec![
        MethodSignature::new("GetClientIdentity").returns_info(
            TypeInfo::of::<dyn ClientIdentity>("ClientIdentity", TypeKind::Interface(Vec::new()))
                .in_module(module_path!()),
        ),
        MethodSignature::new("GetStub").returns_info(
            TypeInfo::of::<dyn ChaincodeStub>("ChaincodeStubInterface", TypeKind::Interface(Vec::new()))
                .in_module(module_path!()),
        ),
    ]
}

/// Descriptor of [`TransactionContextInterface`] taken as a parameter
pub fn transaction_context_interface() -> TypeInfo {
    TypeInfo::of::<dyn TransactionContextInterface>(
        "TransactionContextInterface",
        TypeKind::Interface(transaction_context_methods()),
    )
    .in_module(module_path!())
}

impl<X> Parameter<X> for Box<dyn TransactionContextInterface>
where
    X: TransactionContextInterface + Clone + 'static,
{
    fn parameter_type() -> TypeInfo {
        transaction_context_interface()
    }

    fn extract(ctx: &X, argument: Argument) -> Result<Self, ArgumentError> {
        match argument {
            Argument::Context => Ok(Box::new(ctx.clone())),
            _ => Err(ArgumentError::Mismatch(transaction_context_interface().name)),
        }
    }
}
