//! Shapes a transaction function may return.
//!
//! A function returns nothing, a value, an error, or a value and an error:
//! `()`, `T`, `Result<(), E>` or `Result<T, E>`.

use core::fmt::Display;

use serde::Serialize;
use serde_json::Value;

use crate::{ContractType, TypeInfo};

/// What a transaction function produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Returned {
    /// Success value, absent when the function declares none or failed
    pub value: Option<Value>,
    /// Message of the returned error
    pub error: Option<String>,
}

/// Return type of a transaction function
pub trait TransactionReturn: 'static {
    /// Declared return slots, in order
    fn returns() -> Vec<TypeInfo>;

    /// Split into success value and error message.
    ///
    /// # Errors
    /// If the success value cannot be serialized.
    fn into_returned(self) -> Result<Returned, serde_json::Error>;
}

impl TransactionReturn for () {
    fn returns() -> Vec<TypeInfo> {
        Vec::new()
    }

    fn into_returned(self) -> Result<Returned, serde_json::Error> {
        Ok(Returned::default())
    }
}

impl<T: ContractType + Serialize> TransactionReturn for T {
    fn returns() -> Vec<TypeInfo> {
        vec![T::type_info()]
    }

    fn into_returned(self) -> Result<Returned, serde_json::Error> {
        Ok(Returned {
            value: Some(serde_json::to_value(self)?),
            error: None,
        })
    }
}

impl<E: Display + 'static> TransactionReturn for Result<(), E> {
    fn returns() -> Vec<TypeInfo> {
        vec![TypeInfo::error()]
    }

    fn into_returned(self) -> Result<Returned, serde_json::Error> {
        Ok(Returned {
            value: None,
            error: self.err().map(|err| err.to_string()),
        })
    }
}

impl<T: ContractType + Serialize, E: Display + 'static> TransactionReturn for Result<T, E> {
    fn returns() -> Vec<TypeInfo> {
        vec![T::type_info(), TypeInfo::error()]
    }

    fn into_returned(self) -> Result<Returned, serde_json::Error> {
        match self {
            Ok(value) => Ok(Returned {
                value: Some(serde_json::to_value(value)?),
                error: None,
            }),
            Err(err) => Ok(Returned {
                value: None,
                error: Some(err.to_string()),
            }),
        }
    }
}
