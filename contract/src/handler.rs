//! Functions run before, after or instead of a contract's transactions.

use core::fmt;

use fabric_contract_types::TypeInfo;
use serde_json::Value;

use crate::{
    chaincode::InvokeError,
    function::{CallResult, CallType, ContractFunction, ParseError, RawHandler, SignatureParser},
    parameter::Argument,
    serializer::TransactionSerializer,
};

/// When a transaction handler runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionHandlerKind {
    /// Before the requested transaction
    Before,
    /// In place of a transaction the contract doesn't have
    Unknown,
    /// After the requested transaction, with its result
    After,
}

impl fmt::Display for TransactionHandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before => "Before",
            Self::Unknown => "Unknown",
            Self::After => "After",
        })
    }
}

/// Function can't be used as a transaction handler
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// Signature is invalid
    #[error("error creating {kind}: {source}")]
    Parse {
        /// Handler being created
        kind: TransactionHandlerKind,
        /// Why the signature is invalid
        source: ParseError,
    },
    /// Before and unknown handlers take nothing but the context
    #[error("{0} transactions may not take any params other than the transaction context")]
    UnexpectedParams(TransactionHandlerKind),
    /// After handlers take the result at most
    #[error("After transactions must take at most one non-context param")]
    TooManyAfterParams,
    /// After handlers take the result as the open type
    #[error("After transaction must take type interface{{}} as their only non-context param")]
    AfterParamNotInterface,
}

/// A validated before, after or unknown transaction handler
pub(crate) struct TransactionHandler<C, X> {
    kind: TransactionHandlerKind,
    function: ContractFunction<C, X>,
}

impl<C, X> fmt::Debug for TransactionHandler<C, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionHandler")
            .field("kind", &self.kind)
            .field("function", &self.function)
            .finish()
    }
}

impl<C, X> TransactionHandler<C, X> {
    pub(crate) fn new(
        parser: &SignatureParser,
        handler: RawHandler<C, X>,
        kind: TransactionHandlerKind,
        context: &TypeInfo,
    ) -> Result<Self, HandlerError> {
        let function = ContractFunction::new(parser, &kind.to_string(), handler, CallType::Submit, context)
            .map_err(|source| HandlerError::Parse { kind, source })?;

        let fields = &function.params().fields;
        match kind {
            TransactionHandlerKind::After => match fields.as_slice() {
                [] => {}
                [field] if field.is_any() => {}
                [_] => return Err(HandlerError::AfterParamNotInterface),
                _ => return Err(HandlerError::TooManyAfterParams),
            },
            _ if !fields.is_empty() => return Err(HandlerError::UnexpectedParams(kind)),
            _ => {}
        }

        Ok(Self { kind, function })
    }

    pub(crate) fn kind(&self) -> TransactionHandlerKind {
        self.kind
    }

    /// Call with the context and, for after handlers taking it, the result
    /// of the transaction.
    pub(crate) fn call(
        &self,
        contract: &C,
        ctx: &X,
        data: Option<Value>,
        serializer: &dyn TransactionSerializer,
    ) -> Result<CallResult, InvokeError> {
        let mut arguments = Vec::with_capacity(2);
        if self.function.params().context.is_some() {
            arguments.push(Argument::Context);
        }
        if self.kind == TransactionHandlerKind::After && self.function.params().fields.len() == 1 {
            arguments.push(data.map_or(Argument::Undefined, Argument::Value));
        }

        self.function.call_with(contract, ctx, arguments, None, serializer)
    }
}
