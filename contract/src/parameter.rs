//! Turning converted arguments into the values a transaction function takes.

use core::fmt;

use fabric_contract_types::{BasicKind, ContractType, TypeInfo, TypeKind};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Round trip of a JSON value through the Rust type of a parameter
pub type Normalize = fn(Value) -> Result<Value, serde_json::Error>;

/// Argument handed to a single parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// The transaction context of the current invocation
    Context,
    /// Converted value
    Value(Value),
    /// No value was produced, passed to after transaction handlers
    Undefined,
}

/// Argument does not fit its parameter
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum ArgumentError {
    /// Parameter of type {0} cannot take the argument passed
    Mismatch(String),
    /// {0}
    Decode(#[from] serde_json::Error),
}

/// Type usable as a parameter of a transaction function invoked with
/// transaction context `X`.
///
/// Every [`ContractType`] that serde can handle is a value parameter. The
/// context itself is a parameter through [`context_parameter!`](crate::context_parameter).
pub trait Parameter<X>: Sized + 'static {
    /// Descriptor checked by the signature parser
    fn parameter_type() -> TypeInfo;

    /// Pass `value` through `Self`, as it would look after a round trip.
    ///
    /// # Errors
    /// If `value` doesn't describe a `Self`.
    fn normalize(value: Value) -> Result<Value, serde_json::Error> {
        Ok(value)
    }

    /// Build the parameter from its argument.
    ///
    /// # Errors
    /// If the argument doesn't fit.
    fn extract(ctx: &X, argument: Argument) -> Result<Self, ArgumentError>;
}

impl<X, T> Parameter<X> for T
where
    T: ContractType + Serialize + DeserializeOwned,
{
    fn parameter_type() -> TypeInfo {
        T::type_info()
    }

    fn normalize(value: Value) -> Result<Value, serde_json::Error> {
        serde_json::to_value(serde_json::from_value::<T>(value)?)
    }

    fn extract(_ctx: &X, argument: Argument) -> Result<Self, ArgumentError> {
        match argument {
            Argument::Value(value) => Ok(serde_json::from_value(value)?),
            Argument::Undefined => Ok(serde_json::from_value(Value::Null)?),
            Argument::Context => Err(ArgumentError::Mismatch(T::type_info().name)),
        }
    }
}

/// Make a transaction context type usable as the first parameter of the
/// transaction functions of contracts using it.
///
/// ```
/// use std::sync::Arc;
///
/// use fabric_contract::prelude::*;
///
/// #[derive(Clone, Default)]
/// pub struct AuditContext {
///     inner: TransactionContext,
/// }
///
/// impl SettableTransactionContext for AuditContext {
///     fn set_stub(&mut self, stub: Arc<dyn ChaincodeStub>) {
///         self.inner.set_stub(stub);
///     }
///
///     fn set_client_identity(&mut self, identity: Arc<dyn ClientIdentity>) {
///         self.inner.set_client_identity(identity);
///     }
///
///     fn context_type() -> TypeInfo {
///         TypeInfo::of::<Self>("AuditContext", TypeKind::Unsupported)
///     }
/// }
///
/// fabric_contract::context_parameter!(AuditContext);
/// ```
#[macro_export]
macro_rules! context_parameter {
    ($ty:ty) => {
        impl $crate::Parameter<$ty> for $ty {
            fn parameter_type() -> $crate::types::TypeInfo {
                <$ty as $crate::SettableTransactionContext>::context_type()
            }

            fn extract(
                ctx: &$ty,
                argument: $crate::Argument,
            ) -> ::core::result::Result<Self, $crate::ArgumentError> {
                match argument {
                    $crate::Argument::Context => Ok(::core::clone::Clone::clone(ctx)),
                    _ => Err($crate::ArgumentError::Mismatch(
                        <$ty as $crate::SettableTransactionContext>::context_type().name,
                    )),
                }
            }
        }
    };
}

/// Result of the transaction function, as seen by an after transaction handler.
///
/// Declares the open `interface` type, so it is accepted wherever any value is.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutput {
    /// Value produced by the function
    Returned(Value),
    /// The function produced no value
    Undefined,
}

impl TransactionOutput {
    /// Value produced by the function, if any
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Returned(value) => Some(value),
            Self::Undefined => None,
        }
    }
}

impl fmt::Display for TransactionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Returned(Value::String(text)) => f.write_str(text),
            Self::Returned(value) => write!(f, "{value}"),
            Self::Undefined => f.write_str("undefined"),
        }
    }
}

impl<X> Parameter<X> for TransactionOutput {
    fn parameter_type() -> TypeInfo {
        TypeInfo::of::<Self>(
            BasicKind::Interface.name(),
            TypeKind::Basic(BasicKind::Interface),
        )
    }

    fn extract(_ctx: &X, argument: Argument) -> Result<Self, ArgumentError> {
        match argument {
            Argument::Value(value) => Ok(Self::Returned(value)),
            Argument::Undefined => Ok(Self::Undefined),
            Argument::Context => Err(ArgumentError::Mismatch(
                BasicKind::Interface.name().to_owned(),
            )),
        }
    }
}
