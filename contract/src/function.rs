//! Transaction functions: signatures, their validation and invocation.

use core::any::TypeId;
use std::collections::HashMap;

use fabric_contract_metadata::{
    get_schema, ComponentMetadata, ParameterMetadata, ReturnMetadata, SchemaError,
    TransactionMetadata,
};
use fabric_contract_types::{
    type_is_valid, type_matches_interface, InterfaceError, Returned, TransactionReturn, TypeError,
    TypeInfo, TypeKind,
};
use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    chaincode::InvokeError,
    parameter::{Argument, ArgumentError, Normalize, Parameter},
    serializer::{SerializerError, TransactionSerializer},
};

/// Declared parameter and return types of a function
#[derive(Debug, Clone, Default)]
pub struct Signature {
    /// Parameters, including the transaction context
    pub params: Vec<TypeInfo>,
    /// Return slots
    pub returns: Vec<TypeInfo>,
}

/// Parameters of a validated function
#[derive(Debug, Clone, Default)]
pub struct ParamShape {
    /// Transaction context taken as first parameter
    pub context: Option<TypeInfo>,
    /// Remaining parameters, filled from the invocation arguments
    pub fields: Vec<TypeInfo>,
}

/// Returns of a validated function
#[derive(Debug, Clone, Default)]
pub struct ReturnShape {
    /// Success value
    pub success: Option<TypeInfo>,
    /// Whether an error may be returned
    pub error: bool,
}

/// Function can't be used as a transaction
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub enum ParseError {
    /// {function} contains invalid parameter type. {source}
    InvalidParameter {
        /// Function name
        function: String,
        /// Why the type is invalid
        source: TypeError,
    },
    /// {function} contains invalid transaction context interface type. Set transaction context for contract does not meet interface used in method. {source}
    InvalidContextInterface {
        /// Function name
        function: String,
        /// Why the context does not match
        source: InterfaceError,
    },
    /// Functions requiring the TransactionContext must require it as the first parameter. {function} takes it in as parameter {position}
    ContextPosition {
        /// Function name
        function: String,
        /// Zero-based position of the context
        position: usize,
    },
    /// Functions may only return a maximum of two values. {function} returns {count}
    TooManyReturns {
        /// Function name
        function: String,
        /// Declared return slots
        count: usize,
    },
    /// {function} contains invalid single return type. {source}
    InvalidSingleReturn {
        /// Function name
        function: String,
        /// Why the type is invalid
        source: TypeError,
    },
    /// {function} contains invalid first return type. {source}
    InvalidFirstReturn {
        /// Function name
        function: String,
        /// Why the type is invalid
        source: TypeError,
    },
    /// {function} contains invalid second return type. Type {ty} is not valid. Expected error
    InvalidSecondReturn {
        /// Function name
        function: String,
        /// Type found in the error slot
        ty: String,
    },
}

/// Validates signatures against the transaction context of a contract.
///
/// Interface matches are remembered per context and interface type.
#[derive(Debug, Default)]
pub struct SignatureParser {
    interface_matches: Mutex<HashMap<(TypeId, TypeId), Result<(), InterfaceError>>>,
}

impl SignatureParser {
    /// Parser with nothing remembered
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `signature` of function `name` into its parameter and return
    /// shapes.
    ///
    /// The first parameter is the context when it is the `context` type
    /// itself, or an interface `context` meets.
    ///
    /// # Errors
    /// If a parameter or return type is invalid, the context is not first,
    /// or there are more than two returns.
    pub fn parse(
        &self,
        name: &str,
        signature: &Signature,
        context: &TypeInfo,
    ) -> Result<(ParamShape, ReturnShape), ParseError> {
        Ok((
            self.parse_params(name, &signature.params, context)?,
            parse_returns(name, &signature.returns)?,
        ))
    }

    fn parse_params(
        &self,
        name: &str,
        params: &[TypeInfo],
        context: &TypeInfo,
    ) -> Result<ParamShape, ParseError> {
        let mut shape = ParamShape::default();

        for (position, param) in params.iter().enumerate() {
            let invalid = type_is_valid(param, &[context.id], false).err();
            let mut is_context = param.id == context.id;

            if invalid.is_some()
                && !is_context
                && position == 0
                && matches!(param.kind, TypeKind::Interface(_))
            {
                self.matches_interface(context, param).map_err(|source| {
                    ParseError::InvalidContextInterface {
                        function: name.to_owned(),
                        source,
                    }
                })?;
                is_context = true;
            }

            if let Some(source) = invalid.filter(|_| !is_context) {
                return Err(ParseError::InvalidParameter {
                    function: name.to_owned(),
                    source,
                });
            }
            if is_context && position != 0 {
                return Err(ParseError::ContextPosition {
                    function: name.to_owned(),
                    position,
                });
            }

            if is_context {
                shape.context = Some(param.clone());
            } else {
                shape.fields.push(param.clone());
            }
        }

        Ok(shape)
    }

    fn matches_interface(&self, context: &TypeInfo, interface: &TypeInfo) -> Result<(), InterfaceError> {
        self.interface_matches
            .lock()
            .entry((context.id, interface.id))
            .or_insert_with(|| type_matches_interface(context, interface))
            .clone()
    }
}

fn parse_returns(name: &str, returns: &[TypeInfo]) -> Result<ReturnShape, ParseError> {
    match returns {
        [] => Ok(ReturnShape::default()),
        [single] => {
            type_is_valid(single, &[], true).map_err(|source| ParseError::InvalidSingleReturn {
                function: name.to_owned(),
                source,
            })?;
            if single.is_error() {
                Ok(ReturnShape {
                    success: None,
                    error: true,
                })
            } else {
                Ok(ReturnShape {
                    success: Some(single.clone()),
                    error: false,
                })
            }
        }
        [first, second] => {
            type_is_valid(first, &[], false).map_err(|source| ParseError::InvalidFirstReturn {
                function: name.to_owned(),
                source,
            })?;
            if !second.is_error() {
                return Err(ParseError::InvalidSecondReturn {
                    function: name.to_owned(),
                    ty: second.name.clone(),
                });
            }
            Ok(ReturnShape {
                success: Some(first.clone()),
                error: true,
            })
        }
        _ => Err(ParseError::TooManyReturns {
            function: name.to_owned(),
            count: returns.len(),
        }),
    }
}

/// Failure while calling a function, before it produced a result
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum CallError {
    /// {0}
    Argument(#[from] ArgumentError),
    /// {0}
    Response(#[source] serde_json::Error),
}

/// Function callable on contract `C` with transaction context `X`, taking
/// `Args` as its parameters.
///
/// Implemented for every `Fn(&C, P1, .., Pn) -> R` where each `Pi` is a
/// [`Parameter`] and `R` a [`TransactionReturn`], for up to eight parameters.
pub trait Handler<C, X, Args>: Send + Sync + 'static {
    /// Declared parameters and returns
    fn signature() -> Signature;

    /// Round trip of every parameter, in order
    fn normalizers() -> Vec<Normalize>;

    /// Call with one argument per parameter.
    ///
    /// # Errors
    /// If an argument doesn't fit or the result can't be serialized.
    fn call(&self, contract: &C, ctx: &X, arguments: Vec<Argument>) -> Result<Returned, CallError>;
}

macro_rules! impl_handler {
    ($($param:ident),*) => {
        #[allow(non_snake_case)]
        impl<C, X, F, R, $($param,)*> Handler<C, X, ($($param,)*)> for F
        where
            F: Fn(&C, $($param),*) -> R + Send + Sync + 'static,
            R: TransactionReturn,
            $($param: Parameter<X>,)*
        {
            fn signature() -> Signature {
                Signature {
                    params: vec![$(<$param as Parameter<X>>::parameter_type()),*],
                    returns: R::returns(),
                }
            }

            fn normalizers() -> Vec<Normalize> {
                vec![$({ let normalize: Normalize = <$param as Parameter<X>>::normalize; normalize }),*]
            }

            #[allow(unused_mut, unused_variables, clippy::many_single_char_names)]
            fn call(&self, contract: &C, ctx: &X, arguments: Vec<Argument>) -> Result<Returned, CallError> {
                let mut arguments = arguments.into_iter();
                $(
                    let $param = <$param as Parameter<X>>::extract(
                        ctx,
                        arguments.next().unwrap_or(Argument::Undefined),
                    )?;
                )*
                (self)(contract, $($param),*)
                    .into_returned()
                    .map_err(CallError::Response)
            }
        }
    };
}

impl_handler!();
impl_handler!(A);
impl_handler!(A, B);
impl_handler!(A, B, D);
impl_handler!(A, B, D, E);
impl_handler!(A, B, D, E, G);
impl_handler!(A, B, D, E, G, H);
impl_handler!(A, B, D, E, G, H, I);
impl_handler!(A, B, D, E, G, H, I, J);

type ErasedCall<C, X> =
    Box<dyn Fn(&C, &X, Vec<Argument>) -> Result<Returned, CallError> + Send + Sync>;

/// Handler with its parameter types erased
pub(crate) struct RawHandler<C, X> {
    pub(crate) signature: Signature,
    normalizers: Vec<Normalize>,
    call: ErasedCall<C, X>,
}

impl<C: 'static, X: 'static> RawHandler<C, X> {
    pub(crate) fn new<Args, H: Handler<C, X, Args>>(handler: H) -> Self {
        Self {
            signature: H::signature(),
            normalizers: H::normalizers(),
            call: Box::new(move |contract: &C, ctx: &X, arguments| {
                handler.call(contract, ctx, arguments)
            }),
        }
    }
}

/// Whether a transaction changes the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallType {
    /// Submitted for ordering
    #[default]
    Submit,
    /// Only queries the ledger
    Evaluate,
}

impl CallType {
    /// Metadata tags of the call type
    pub fn tags(self) -> [&'static str; 2] {
        match self {
            Self::Submit => ["submit", "SUBMIT"],
            Self::Evaluate => ["evaluate", "EVALUATE"],
        }
    }
}

/// What a function call produced
#[derive(Debug, Default)]
pub(crate) struct CallResult {
    /// Success value converted for the response
    pub(crate) payload: String,
    /// Success value, passed on to the after transaction handler
    pub(crate) data: Option<Value>,
    /// Returned error, or failure to convert the success value
    pub(crate) error: Option<InvokeError>,
}

/// A validated transaction function of contract `C`
pub struct ContractFunction<C, X> {
    call_type: CallType,
    params: ParamShape,
    returns: ReturnShape,
    normalizers: Vec<Normalize>,
    call: ErasedCall<C, X>,
}

impl<C, X> core::fmt::Debug for ContractFunction<C, X> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContractFunction")
            .field("call_type", &self.call_type)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

impl<C, X> ContractFunction<C, X> {
    pub(crate) fn new(
        parser: &SignatureParser,
        name: &str,
        handler: RawHandler<C, X>,
        call_type: CallType,
        context: &TypeInfo,
    ) -> Result<Self, ParseError> {
        let (params, returns) = parser.parse(name, &handler.signature, context)?;
        let mut normalizers = handler.normalizers;
        if params.context.is_some() {
            normalizers.remove(0);
        }

        Ok(Self {
            call_type,
            params,
            returns,
            normalizers,
            call: handler.call,
        })
    }

    /// Submit or evaluate
    pub fn call_type(&self) -> CallType {
        self.call_type
    }

    /// Parameter shape
    pub fn params(&self) -> &ParamShape {
        &self.params
    }

    /// Return shape
    pub fn returns(&self) -> &ReturnShape {
        &self.returns
    }

    /// Metadata describing the function as transaction `name`.
    ///
    /// # Errors
    /// If a parameter or return type has no schema.
    pub fn reflect_metadata(
        &self,
        name: &str,
        components: &mut ComponentMetadata,
    ) -> Result<TransactionMetadata, SchemaError> {
        let parameters = self
            .params
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                Ok(ParameterMetadata {
                    name: format!("param{index}"),
                    schema: get_schema(field, components)?,
                    ..ParameterMetadata::default()
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        let mut metadata = TransactionMetadata {
            name: name.to_owned(),
            tag: self.call_type.tags().map(str::to_owned).to_vec(),
            parameters,
            ..TransactionMetadata::default()
        };
        if let Some(success) = &self.returns.success {
            metadata.returns.schema = Some(get_schema(success, components)?);
        }
        Ok(metadata)
    }

    /// Call with string arguments, converting and validating each against
    /// the transaction metadata when given.
    pub(crate) fn call(
        &self,
        contract: &C,
        ctx: &X,
        args: &[String],
        transaction: Option<&TransactionMetadata>,
        serializer: &dyn TransactionSerializer,
    ) -> Result<CallResult, InvokeError> {
        let expected = self.params.fields.len();
        if let Some(transaction) = transaction {
            if transaction.parameters.len() != expected {
                return Err(InvokeError::MetadataParamCount {
                    expected,
                    received: transaction.parameters.len(),
                });
            }
        }
        if args.len() < expected {
            return Err(InvokeError::ParamCount {
                expected,
                received: args.len(),
            });
        }

        let mut arguments = Vec::with_capacity(expected + 1);
        if self.params.context.is_some() {
            arguments.push(Argument::Context);
        }
        for (index, ((field, normalize), raw)) in self
            .params
            .fields
            .iter()
            .zip(&self.normalizers)
            .zip(args)
            .enumerate()
        {
            let metadata = transaction.map(|transaction| &transaction.parameters[index]);
            let value = serializer
                .from_string(raw, field, *normalize, metadata)
                .map_err(|source| InvokeError::Parameter {
                    name: metadata.map(|param| format!(" {}", param.name)).unwrap_or_default(),
                    source,
                })?;
            arguments.push(Argument::Value(value));
        }

        self.call_with(contract, ctx, arguments, transaction.map(|tx| &tx.returns), serializer)
    }

    /// Call with prepared arguments.
    pub(crate) fn call_with(
        &self,
        contract: &C,
        ctx: &X,
        arguments: Vec<Argument>,
        returns: Option<&ReturnMetadata>,
        serializer: &dyn TransactionSerializer,
    ) -> Result<CallResult, InvokeError> {
        let returned = (self.call)(contract, ctx, arguments).map_err(|err| match err {
            CallError::Argument(err) => InvokeError::Argument(err),
            CallError::Response(err) => InvokeError::Response(SerializerError::Marshal(err)),
        })?;
        Ok(self.handle_response(returned, returns, serializer))
    }

    fn handle_response(
        &self,
        returned: Returned,
        metadata: Option<&ReturnMetadata>,
        serializer: &dyn TransactionSerializer,
    ) -> CallResult {
        let mut result = CallResult {
            error: returned.error.map(InvokeError::Transaction),
            ..CallResult::default()
        };

        if let (Some(value), Some(success)) = (&returned.value, &self.returns.success) {
            match serializer.to_string(value, success, metadata) {
                Ok(payload) => result.payload = payload,
                Err(err) => {
                    result.error.get_or_insert(InvokeError::Response(err));
                }
            }
        }
        result.data = returned.value;
        result
    }
}
