//! Rules deciding which types may cross the contract boundary.

use core::any::TypeId;

use crate::{basic::list_basic_kinds, BasicKind, TypeInfo, TypeKind};

/// Type cannot be used in a contract signature
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub enum TypeError {
    /// Type {name} is not valid. Expected a struct or one of the basic types {expected} or an array/slice of these
    Invalid {
        /// Offending type
        name: String,
        /// Accepted kinds
        expected: String,
    },
    /// Arrays must have length greater than 0
    EmptyArray,
    /// Map key type {0} is not valid. Expected string
    MapKey(String),
    /// Field {field} of {owner} is private and cannot carry a serialization name
    AnnotatedPrivateField {
        /// Struct declaring the field
        owner: String,
        /// Field identifier
        field: String,
    },
}

/// Type does not satisfy an interface
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub enum InterfaceError {
    /// Type passed for interface is not an interface
    NotAnInterface,
    /// Missing function {0}
    MissingMethod(String),
    /// Parameter mismatch in method {method}. Expected {expected}, got {actual}
    ParamCount {
        /// Method name
        method: String,
        /// Parameters declared by the interface
        expected: usize,
        /// Parameters declared by the type
        actual: usize,
    },
    /// Parameter mismatch in method {method} at parameter {index}. Expected {expected}, got {actual}
    ParamType {
        /// Method name
        method: String,
        /// Zero-based position
        index: usize,
        /// Type in the interface
        expected: String,
        /// Type on the candidate
        actual: String,
    },
    /// Return mismatch in method {method}. Expected {expected}, got {actual}
    ReturnCount {
        /// Method name
        method: String,
        /// Returns declared by the interface
        expected: usize,
        /// Returns declared by the type
        actual: usize,
    },
    /// Return mismatch in method {method} at return {index}. Expected {expected}, got {actual}
    ReturnType {
        /// Method name
        method: String,
        /// Zero-based position
        index: usize,
        /// Type in the interface
        expected: String,
        /// Type on the candidate
        actual: String,
    },
}

impl TypeError {
    fn invalid(ty: &TypeInfo, allow_error: bool) -> Self {
        let expected = if allow_error {
            format!("error, {}", list_basic_kinds())
        } else {
            list_basic_kinds()
        };
        Self::Invalid {
            name: ty.name.clone(),
            expected,
        }
    }
}

/// Check that `ty` may be used as a parameter, return value or field.
///
/// Types listed in `extra` are accepted as is. The error slot is accepted
/// only when `allow_error` is set, and never inside a compound type.
///
/// # Errors
/// Describes the first offending type found.
pub fn type_is_valid(ty: &TypeInfo, extra: &[TypeId], allow_error: bool) -> Result<(), TypeError> {
    match &ty.kind {
        TypeKind::Basic(_) | TypeKind::Timestamp => Ok(()),
        TypeKind::Error if allow_error => Ok(()),
        _ if extra.contains(&ty.id) => Ok(()),
        TypeKind::Array { len, elem } => {
            if *len == 0 {
                return Err(TypeError::EmptyArray);
            }
            type_is_valid(elem, extra, false)
        }
        TypeKind::Slice(elem) | TypeKind::Pointer(elem) => type_is_valid(elem, extra, false),
        TypeKind::Map { key, value } => {
            if key.basic_kind() != Some(BasicKind::String) {
                return Err(TypeError::MapKey(key.name.clone()));
            }
            type_is_valid(value, extra, false)
        }
        TypeKind::Struct(info) => {
            let mut allowed = extra.to_vec();
            allowed.push(ty.id);
            for field in &info.fields {
                if !field.exported {
                    if field.is_annotated() {
                        return Err(TypeError::AnnotatedPrivateField {
                            owner: ty.name.clone(),
                            field: field.ident.to_owned(),
                        });
                    }
                    continue;
                }
                if field.is_skipped() {
                    continue;
                }
                type_is_valid(&(field.ty)(), &allowed, false)?;
            }
            Ok(())
        }
        TypeKind::Error | TypeKind::Interface(_) | TypeKind::Unsupported => {
            Err(TypeError::invalid(ty, allow_error))
        }
    }
}

/// Check that `candidate` declares every method of `interface` with the same
/// parameter and return types, position by position.
///
/// # Errors
/// Names the missing method or the first mismatching position.
pub fn type_matches_interface(
    candidate: &TypeInfo,
    interface: &TypeInfo,
) -> Result<(), InterfaceError> {
    let TypeKind::Interface(required) = &interface.kind else {
        return Err(InterfaceError::NotAnInterface);
    };

    for method in required {
        let Some(found) = candidate.methods.iter().find(|m| m.name == method.name) else {
            return Err(InterfaceError::MissingMethod(method.name.clone()));
        };

        if method.params.len() != found.params.len() {
            return Err(InterfaceError::ParamCount {
                method: method.name.clone(),
                expected: method.params.len(),
                actual: found.params.len(),
            });
        }
        for (index, (expected, actual)) in method.params.iter().zip(&found.params).enumerate() {
            if expected != actual {
                return Err(InterfaceError::ParamType {
                    method: method.name.clone(),
                    index,
                    expected: expected.name.clone(),
                    actual: actual.name.clone(),
                });
            }
        }

        if method.returns.len() != found.returns.len() {
            return Err(InterfaceError::ReturnCount {
                method: method.name.clone(),
                expected: method.returns.len(),
                actual: found.returns.len(),
            });
        }
        for (index, (expected, actual)) in method.returns.iter().zip(&found.returns).enumerate() {
            if expected != actual {
                return Err(InterfaceError::ReturnType {
                    method: method.name.clone(),
                    index,
                    expected: expected.name.clone(),
                    actual: actual.name.clone(),
                });
            }
        }
    }

    Ok(())
}
