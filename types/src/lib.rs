//! Runtime descriptors for the types that may appear in contract signatures.
//!
//! There is no runtime reflection to lean on, so every type usable as a
//! transaction parameter, return value or struct field implements
//! [`ContractType`] and describes itself with a [`TypeInfo`]. The descriptors
//! drive signature validation, argument conversion and metadata generation.
//!
//! ```
//! use fabric_contract_types::{ContractType, TypeKind};
//!
//! #[derive(ContractType)]
//! pub struct Asset {
//!     pub id: String,
//!     pub owners: Vec<String>,
//! }
//!
//! let info = Asset::type_info();
//! assert_eq!(info.name, "Asset");
//! assert!(matches!(info.kind, TypeKind::Struct(_)));
//! ```

use core::{any::TypeId, fmt};

pub mod basic;
mod impls;
pub mod returns;
pub mod text;
pub mod validate;

pub use basic::{BasicKind, ConversionError};
pub use fabric_contract_types_derive::ContractType;
pub use returns::{Returned, TransactionReturn};
pub use validate::{type_is_valid, type_matches_interface, InterfaceError, TypeError};

/// Types which can describe themselves to the contract runtime.
///
/// Implemented for the primitives, `String`, `Vec`, arrays, maps, `Option`,
/// `Box`, [`serde_json::Value`] and [`chrono::DateTime<Utc>`](chrono::DateTime).
/// Use `#[derive(ContractType)]` for structs.
pub trait ContractType: 'static {
    /// Describe `Self`
    fn type_info() -> TypeInfo;
}

/// Description of a single type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// Identity used for exact type matches
    pub id: TypeId,
    /// Display name, e.g. `int8`, `[]string`, `map[string]Asset`
    pub name: String,
    /// Module that defines the type, empty for built-in types
    pub module: &'static str,
    /// Shape of the type
    pub kind: TypeKind,
    /// Methods the type exposes, used for interface matching
    pub methods: Vec<MethodSignature>,
}

/// Shape of a described type.
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// One of the [`BasicKind`]s
    Basic(BasicKind),
    /// The timestamp type, serialized as RFC 3339
    Timestamp,
    /// The error slot of a fallible return
    Error,
    /// Fixed length array
    Array {
        /// Number of elements
        len: usize,
        /// Element type
        elem: Box<TypeInfo>,
    },
    /// Growable sequence
    Slice(Box<TypeInfo>),
    /// Key-value map
    Map {
        /// Key type
        key: Box<TypeInfo>,
        /// Value type
        value: Box<TypeInfo>,
    },
    /// Struct with named fields
    Struct(StructInfo),
    /// Nullable value
    Pointer(Box<TypeInfo>),
    /// Interface declaring a set of methods
    Interface(Vec<MethodSignature>),
    /// A type that can never cross the contract boundary
    Unsupported,
}

/// Fields of a struct type in declaration order.
#[derive(Debug, Clone, Default)]
pub struct StructInfo {
    /// Declared fields
    pub fields: Vec<FieldInfo>,
}

/// Single struct field.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo {
    /// Rust identifier of the field
    pub ident: &'static str,
    /// Whether the field is `pub`
    pub exported: bool,
    /// `#[metadata(..)]` annotation
    pub metadata: Option<FieldAnnotation>,
    /// `#[serde(rename = "..")]` value
    pub serde_rename: Option<&'static str>,
    /// `#[serde(skip)]` is present
    pub serde_skip: bool,
    /// `#[serde(flatten)]` is present
    pub flatten: bool,
    /// Field type, resolved lazily so that self-referencing structs terminate
    pub ty: fn() -> TypeInfo,
}

/// Contents of a `#[metadata(name = "..", optional, skip)]` field annotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldAnnotation {
    /// Property name override
    pub name: Option<&'static str>,
    /// Property is not required
    pub optional: bool,
    /// Property is excluded
    pub skip: bool,
}

/// Signature of a method, compared positionally during interface matching.
#[derive(Debug, Clone)]
pub struct MethodSignature {
    /// Method name
    pub name: String,
    /// Parameter types, excluding the receiver
    pub params: Vec<TypeInfo>,
    /// Return types
    pub returns: Vec<TypeInfo>,
}

impl TypeInfo {
    /// Construct descriptor for `T`
    pub fn of<T: ?Sized + 'static>(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: name.into(),
            module: "",
            kind,
            methods: Vec::new(),
        }
    }

    /// Descriptor of a basic kind carried by `T`
    pub fn basic<T: 'static>(kind: BasicKind) -> Self {
        Self::of::<T>(kind.name(), TypeKind::Basic(kind))
    }

    /// Descriptor of the error slot in `Result<_, E>`
    pub fn error() -> Self {
        Self::of::<dyn std::error::Error>("error", TypeKind::Error)
    }

    /// Descriptor of a struct defined in `module`
    pub fn structure<T: 'static>(
        name: impl Into<String>,
        module: &'static str,
        fields: Vec<FieldInfo>,
    ) -> Self {
        Self::of::<T>(name, TypeKind::Struct(StructInfo { fields })).in_module(module)
    }

    /// Set the defining module
    #[must_use]
    pub fn in_module(mut self, module: &'static str) -> Self {
        self.module = module;
        self
    }

    /// Attach method signatures
    #[must_use]
    pub fn with_methods(mut self, methods: Vec<MethodSignature>) -> Self {
        self.methods = methods;
        self
    }

    /// Check whether this descriptor belongs to `T`
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Basic kind, if the type is one
    pub fn basic_kind(&self) -> Option<BasicKind> {
        match self.kind {
            TypeKind::Basic(kind) => Some(kind),
            _ => None,
        }
    }

    /// Whether this is the error slot
    pub fn is_error(&self) -> bool {
        matches!(self.kind, TypeKind::Error)
    }

    /// Whether this is the open `interface` kind accepting any value
    pub fn is_any(&self) -> bool {
        self.basic_kind() == Some(BasicKind::Interface)
    }

    /// Key under which a struct is registered among metadata components.
    ///
    /// Module path separators are replaced with dots so that equally named
    /// types from different modules never collide.
    pub fn component_key(&self) -> String {
        if self.module.is_empty() {
            return self.name.clone();
        }
        format!("{}.{}", self.module.replace("::", "."), self.name)
    }

    /// Type behind any number of pointer wrappers
    pub fn pointee(&self) -> &TypeInfo {
        match &self.kind {
            TypeKind::Pointer(inner) => inner.pointee(),
            _ => self,
        }
    }

    /// Strip nullable wrappers around a struct
    pub fn deref_struct(&self) -> Option<(&TypeInfo, &StructInfo)> {
        match &self.kind {
            TypeKind::Struct(info) => Some((self, info)),
            TypeKind::Pointer(inner) => inner.deref_struct(),
            _ => None,
        }
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FieldInfo {
    /// Field carries an explicit naming annotation
    pub fn is_annotated(&self) -> bool {
        self.metadata.and_then(|meta| meta.name).is_some() || self.serde_rename.is_some()
    }

    /// Field is left out of the serialized form
    pub fn is_skipped(&self) -> bool {
        if let Some(meta) = self.metadata {
            if meta.skip {
                return true;
            }
            if meta.name.is_some() {
                return false;
            }
        }
        self.serde_skip || (!self.exported && !self.is_annotated())
    }

    /// Property name used in JSON and in metadata.
    ///
    /// Metadata annotation wins over serde rename, which wins over the
    /// identifier.
    pub fn property_name(&self) -> &'static str {
        self.metadata
            .and_then(|meta| meta.name)
            .or(self.serde_rename)
            .unwrap_or(self.ident)
    }

    /// Property must be present
    pub fn is_required(&self) -> bool {
        !self.metadata.is_some_and(|meta| meta.optional)
    }
}

impl StructInfo {
    /// Fields forming the serialized object.
    ///
    /// Flattened fields holding a struct are replaced by that struct's own
    /// serialized fields, recursively. Skipped fields are dropped.
    pub fn serialized_fields(&self) -> Vec<FieldInfo> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            if field.flatten {
                if let Some((_, inner)) = (field.ty)().deref_struct() {
                    fields.extend(inner.serialized_fields());
                }
                continue;
            }
            if !field.is_skipped() {
                fields.push(*field);
            }
        }
        fields
    }
}

impl MethodSignature {
    /// Method without parameters or returns
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: Vec::new(),
        }
    }

    /// Append parameter of type `T`
    #[must_use]
    pub fn param<T: ContractType>(self) -> Self {
        self.param_info(T::type_info())
    }

    /// Append parameter
    #[must_use]
    pub fn param_info(mut self, info: TypeInfo) -> Self {
        self.params.push(info);
        self
    }

    /// Append return of type `T`
    #[must_use]
    pub fn returns<T: ContractType>(self) -> Self {
        self.returns_info(T::type_info())
    }

    /// Append return
    #[must_use]
    pub fn returns_info(mut self, info: TypeInfo) -> Self {
        self.returns.push(info);
        self
    }
}

pub mod prelude {
    //! Re-exports of the most used items.

    pub use super::{
        BasicKind, ContractType, FieldAnnotation, FieldInfo, MethodSignature, StructInfo,
        TransactionReturn, TypeInfo, TypeKind,
    };
}
