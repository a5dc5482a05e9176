//! User contracts and the registration of their transactions.

use std::{collections::BTreeMap, sync::Arc};

use fabric_contract_metadata::{ComponentMetadata, ContractMetadata, InfoMetadata, SchemaError};
use fabric_contract_types::text::comma_sentence;
use tracing::debug;

use crate::{
    chaincode::InvokeError,
    context::{ChaincodeStub, SettableTransactionContext, TransactionContext},
    function::{CallType, ContractFunction, Handler, ParseError, RawHandler, SignatureParser},
    handler::{HandlerError, TransactionHandler, TransactionHandlerKind},
    serializer::TransactionSerializer,
};

/// Version given to contracts and chaincodes that don't declare one
pub const DEFAULT_VERSION: &str = "latest";

/// Names of the [`Contract`] methods themselves, never registered as
/// transactions
pub const RESERVED_FUNCTIONS: [&str; 5] = [
    "EvaluateFunctions",
    "IgnoredFunctions",
    "Info",
    "Name",
    "Transactions",
];

/// Business logic exposed as a set of named transactions.
///
/// Transactions are ordinary functions taking `&Self` followed by their
/// parameters, listed in [`transactions`](Contract::transactions). `X` is the
/// transaction context handed to those of them that take one.
///
/// ```
/// use fabric_contract::prelude::*;
///
/// struct Greeter;
///
/// impl Greeter {
///     fn greet(&self, name: String) -> String {
///         format!("Hello, {name}")
///     }
/// }
///
/// impl Contract for Greeter {
///     fn transactions(transactions: &mut Transactions<Self>) {
///         transactions.add("Greet", Self::greet);
///     }
/// }
///
/// let mut chaincode = ContractChaincode::new();
/// chaincode.add_contract(Greeter).unwrap();
/// assert_eq!(chaincode.default_contract(), Some("Greeter"));
/// ```
pub trait Contract<X = TransactionContext>: Send + Sync + Sized + 'static
where
    X: SettableTransactionContext,
{
    /// Name the contract is invoked by, the type name unless overridden
    fn name(&self) -> String {
        short_type_name::<Self>().to_owned()
    }

    /// Descriptive information. Title defaults to the contract name and
    /// version to [`DEFAULT_VERSION`].
    fn info(&self) -> InfoMetadata {
        InfoMetadata::default()
    }

    /// Registered transactions left out of the contract
    fn ignored_functions(&self) -> Vec<String> {
        Vec::new()
    }

    /// Transactions which only query the ledger
    fn evaluate_functions(&self) -> Vec<String> {
        Vec::new()
    }

    /// Register the transactions and the transaction handlers
    fn transactions(transactions: &mut Transactions<Self, X>);
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = core::any::type_name::<T>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path)
}

/// Transactions and transaction handlers of contract `C`
pub struct Transactions<C, X = TransactionContext> {
    functions: Vec<(String, RawHandler<C, X>)>,
    before: Option<RawHandler<C, X>>,
    after: Option<RawHandler<C, X>>,
    unknown: Option<RawHandler<C, X>>,
}

impl<C, X> core::fmt::Debug for Transactions<C, X> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transactions")
            .field(
                "functions",
                &self.functions.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("unknown", &self.unknown.is_some())
            .finish()
    }
}

impl<C: 'static, X: 'static> Transactions<C, X> {
    fn new() -> Self {
        Self {
            functions: Vec::new(),
            before: None,
            after: None,
            unknown: None,
        }
    }

    /// Register `handler` as transaction `name`
    pub fn add<Args, H: Handler<C, X, Args>>(&mut self, name: impl Into<String>, handler: H) -> &mut Self {
        self.functions.push((name.into(), RawHandler::new(handler)));
        self
    }

    /// Run `handler` before every transaction. It may take the context only.
    pub fn before_transaction<Args, H: Handler<C, X, Args>>(&mut self, handler: H) -> &mut Self {
        self.before = Some(RawHandler::new(handler));
        self
    }

    /// Run `handler` after every transaction. Besides the context it may take
    /// the transaction's result as
    /// [`TransactionOutput`](crate::TransactionOutput) or
    /// [`serde_json::Value`].
    pub fn after_transaction<Args, H: Handler<C, X, Args>>(&mut self, handler: H) -> &mut Self {
        self.after = Some(RawHandler::new(handler));
        self
    }

    /// Run `handler` when the requested transaction doesn't exist. It may
    /// take the context only.
    pub fn unknown_transaction<Args, H: Handler<C, X, Args>>(&mut self, handler: H) -> &mut Self {
        self.unknown = Some(RawHandler::new(handler));
        self
    }
}

/// Contract can't be added to a chaincode
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub enum RegistrationError {
    /// multiple contracts being merged into chaincode with name {0}
    Duplicate(String),
    /// contracts are required to have at least 1 (non-ignored) public method. Contract {contract} has none. Method names that have been ignored: {ignored}
    NoFunctions {
        /// Contract name
        contract: String,
        /// Ignored names as a sentence
        ignored: String,
    },
    /// {0}
    Function(#[from] ParseError),
    /// {0}
    Handler(#[from] HandlerError),
    /// function {function} is registered more than once in contract {contract}
    DuplicateFunction {
        /// Contract name
        contract: String,
        /// Transaction name
        function: String,
    },
    /// contract {0} can't be the default contract as it is not part of the chaincode
    UnknownDefault(String),
    /// the system contract can't be the default contract
    SystemDefault,
}

/// A request routed to a single contract
pub(crate) struct Invocation<'a> {
    pub(crate) stub: &'a Arc<dyn ChaincodeStub>,
    pub(crate) function: &'a str,
    pub(crate) args: &'a [String],
    /// Frozen metadata of the contract
    pub(crate) metadata: Option<&'a ContractMetadata>,
    /// Frozen metadata of the whole chaincode as JSON
    pub(crate) metadata_json: &'a str,
    pub(crate) serializer: &'a dyn TransactionSerializer,
}

/// A contract of any type and context, as held by the chaincode
pub(crate) trait ContractDispatch: Send + Sync {
    /// Name the contract is invoked by
    fn name(&self) -> &str;

    /// Contract metadata with its transactions in name order
    fn reflect(&self, components: &mut ComponentMetadata) -> Result<ContractMetadata, SchemaError>;

    /// Resolve and run the requested transaction, returning its response
    /// payload
    fn invoke(&self, invocation: Invocation<'_>) -> Result<String, InvokeError>;
}

/// Find `requested` in `functions`, also trying it with its first letter in
/// upper case
pub(crate) fn resolve_function<'f, T>(
    functions: &'f BTreeMap<String, T>,
    requested: &str,
) -> Option<(&'f str, &'f T)> {
    if let Some((name, function)) = functions.get_key_value(requested) {
        return Some((name.as_str(), function));
    }

    let mut chars = requested.chars();
    let first = chars.next().filter(|first| first.is_lowercase())?;
    let capitalized = first.to_uppercase().chain(chars).collect::<String>();
    functions
        .get_key_value(&capitalized)
        .map(|(name, function)| (name.as_str(), function))
}

/// Contract `C` with its validated transactions
pub(crate) struct RegisteredContract<C, X> {
    contract: C,
    name: String,
    info: InfoMetadata,
    functions: BTreeMap<String, ContractFunction<C, X>>,
    before: Option<TransactionHandler<C, X>>,
    after: Option<TransactionHandler<C, X>>,
    unknown: Option<TransactionHandler<C, X>>,
}

impl<C, X> RegisteredContract<C, X>
where
    C: Contract<X>,
    X: SettableTransactionContext,
{
    pub(crate) fn new(contract: C, parser: &SignatureParser) -> Result<Self, RegistrationError> {
        let name = contract.name();
        let context = X::context_type();

        let mut transactions = Transactions::new();
        C::transactions(&mut transactions);

        let ignored = RESERVED_FUNCTIONS
            .iter()
            .map(|name| (*name).to_owned())
            .chain(contract.ignored_functions())
            .collect::<Vec<_>>();
        let evaluate = contract.evaluate_functions();

        let mut functions = BTreeMap::new();
        for (function, handler) in transactions.functions {
            if ignored.contains(&function) {
                continue;
            }
            if functions.contains_key(&function) {
                return Err(RegistrationError::DuplicateFunction {
                    contract: name,
                    function,
                });
            }

            let call_type = if evaluate.contains(&function) {
                CallType::Evaluate
            } else {
                CallType::Submit
            };
            let parsed = ContractFunction::new(parser, &function, handler, call_type, &context)?;
            functions.insert(function, parsed);
        }

        if functions.is_empty() {
            return Err(RegistrationError::NoFunctions {
                contract: name,
                ignored: comma_sentence(&ignored),
            });
        }

        let handler = |raw: Option<RawHandler<C, X>>, kind| {
            raw.map(|raw| TransactionHandler::new(parser, raw, kind, &context))
                .transpose()
        };
        let before = handler(transactions.before, TransactionHandlerKind::Before)?;
        let after = handler(transactions.after, TransactionHandlerKind::After)?;
        let unknown = handler(transactions.unknown, TransactionHandlerKind::Unknown)?;

        let mut info = contract.info();
        if info.title.is_empty() {
            info.title.clone_from(&name);
        }
        if info.version.is_empty() {
            DEFAULT_VERSION.clone_into(&mut info.version);
        }

        Ok(Self {
            contract,
            name,
            info,
            functions,
            before,
            after,
            unknown,
        })
    }

    fn context(&self, stub: &Arc<dyn ChaincodeStub>) -> Result<X, InvokeError> {
        let mut ctx = X::default();
        ctx.set_stub(Arc::clone(stub));
        ctx.set_client_identity(stub.client_identity().map_err(InvokeError::ClientIdentity)?);
        Ok(ctx)
    }

    fn run_handler(
        &self,
        handler: Option<&TransactionHandler<C, X>>,
        ctx: &X,
        data: Option<serde_json::Value>,
        serializer: &dyn TransactionSerializer,
    ) -> Result<(), InvokeError> {
        let Some(handler) = handler else {
            return Ok(());
        };
        debug!(contract = %self.name, handler = %handler.kind(), "Running transaction handler");
        match handler.call(&self.contract, ctx, data, serializer)?.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<C, X> ContractDispatch for RegisteredContract<C, X>
where
    C: Contract<X>,
    X: SettableTransactionContext,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn reflect(&self, components: &mut ComponentMetadata) -> Result<ContractMetadata, SchemaError> {
        let transactions = self
            .functions
            .iter()
            .map(|(name, function)| function.reflect_metadata(name, components))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ContractMetadata {
            info: Some(self.info.clone()),
            name: self.name.clone(),
            transactions,
            default: false,
        })
    }

    fn invoke(&self, invocation: Invocation<'_>) -> Result<String, InvokeError> {
        let target = match resolve_function(&self.functions, invocation.function) {
            Some((name, function)) => Target::Function(name, function),
            None => match &self.unknown {
                Some(unknown) => Target::Unknown(unknown),
                None => {
                    return Err(InvokeError::FunctionNotFound {
                        function: invocation.function.to_owned(),
                        contract: self.name.clone(),
                    })
                }
            },
        };

        let ctx = self.context(invocation.stub)?;
        self.run_handler(self.before.as_ref(), &ctx, None, invocation.serializer)?;

        let outcome = match target {
            Target::Function(name, function) => {
                debug!(contract = %self.name, function = name, "Calling transaction");
                let transaction = invocation
                    .metadata
                    .and_then(|contract| contract.transactions.iter().find(|tx| tx.name == name));
                function.call(
                    &self.contract,
                    &ctx,
                    invocation.args,
                    transaction,
                    invocation.serializer,
                )?
            }
            Target::Unknown(unknown) => {
                debug!(
                    contract = %self.name,
                    function = invocation.function,
                    "Transaction not found, calling unknown transaction handler"
                );
                unknown.call(&self.contract, &ctx, None, invocation.serializer)?
            }
        };

        if let Some(err) = outcome.error {
            return Err(err);
        }
        self.run_handler(self.after.as_ref(), &ctx, outcome.data, invocation.serializer)?;
        Ok(outcome.payload)
    }
}

/// What a request resolved to within a contract
enum Target<'c, C, X> {
    Function(&'c str, &'c ContractFunction<C, X>),
    Unknown(&'c TransactionHandler<C, X>),
}
