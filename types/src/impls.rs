//! [`ContractType`] for std and ecosystem types.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::{BasicKind, ContractType, TypeInfo, TypeKind};

macro_rules! impl_basic {
    ($($ty:ty => $kind:ident),+ $(,)?) => {$(
        impl ContractType for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::basic::<Self>(BasicKind::$kind)
            }
        }
    )+};
}

impl_basic!(
    bool => Bool,
    String => String,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    isize => Int,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    usize => Uint,
    f32 => Float32,
    f64 => Float64,
    serde_json::Value => Interface,
);

macro_rules! impl_unsupported {
    ($($ty:ty => $name:literal),+ $(,)?) => {$(
        impl ContractType for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::of::<Self>($name, TypeKind::Unsupported)
            }
        }
    )+};
}

impl_unsupported!(
    char => "char",
    i128 => "int128",
    u128 => "uint128",
);

impl ContractType for DateTime<Utc> {
    fn type_info() -> TypeInfo {
        TypeInfo::of::<Self>("timestamp", TypeKind::Timestamp)
    }
}

impl<T: ContractType> ContractType for Vec<T> {
    fn type_info() -> TypeInfo {
        let elem = T::type_info();
        TypeInfo::of::<Self>(format!("[]{elem}"), TypeKind::Slice(Box::new(elem)))
    }
}

impl<T: ContractType, const L: usize> ContractType for [T; L] {
    fn type_info() -> TypeInfo {
        let elem = T::type_info();
        TypeInfo::of::<Self>(
            format!("[{L}]{elem}"),
            TypeKind::Array {
                len: L,
                elem: Box::new(elem),
            },
        )
    }
}

macro_rules! impl_map {
    ($($map:ident),+) => {$(
        impl<K: ContractType, V: ContractType> ContractType for $map<K, V> {
            fn type_info() -> TypeInfo {
                let key = K::type_info();
                let value = V::type_info();
                TypeInfo::of::<Self>(
                    format!("map[{key}]{value}"),
                    TypeKind::Map {
                        key: Box::new(key),
                        value: Box::new(value),
                    },
                )
            }
        }
    )+};
}

impl_map!(HashMap, BTreeMap);

impl<T: ContractType> ContractType for Option<T> {
    fn type_info() -> TypeInfo {
        let inner = T::type_info();
        TypeInfo::of::<Self>(format!("*{inner}"), TypeKind::Pointer(Box::new(inner)))
    }
}

impl<T: ContractType> ContractType for Box<T> {
    fn type_info() -> TypeInfo {
        T::type_info()
    }
}
