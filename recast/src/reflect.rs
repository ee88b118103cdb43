//! Bridging Rust types and dynamic values.

use core::hash::{BuildHasher, Hash};
use core::ops::{Deref, DerefMut};
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::coerce::{to_bool, to_string, try_to_bytes, try_to_number};
use crate::time::cast_time;
use crate::{
    CastError, CastErrorKind, Context, PathSegment, Result, ScalarKind, Shape, StructType, Value,
    ValueMap,
};

/// A Rust type with a known [`Shape`] and a dynamic form.
///
/// `from_value` accepts anything the caster produces for `Self::shape()` and
/// is lenient beyond that: scalars coerce, records accept maps.
pub trait Reflect: Sized {
    /// The type descriptor.
    fn shape() -> Shape;

    /// Dynamic form of `self`.
    fn to_value(&self) -> Value;

    /// Rebuild from a dynamic form.
    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! reflect_number {
    ($($ty:ty => $variant:ident, $kind:ident);* $(;)?) => {
        $(
            impl Reflect for $ty {
                fn shape() -> Shape {
                    Shape::Scalar(ScalarKind::$kind)
                }

                fn to_value(&self) -> Value {
                    Value::$variant(*self as _)
                }

                fn from_value(value: Value) -> Result<Self> {
                    try_to_number(&value)
                }
            }
        )*
    };
}

reflect_number! {
    i8 => I8, I8;
    i16 => I16, I16;
    i32 => I32, I32;
    i64 => I64, I64;
    isize => I64, I64;
    u8 => U8, U8;
    u16 => U16, U16;
    u32 => U32, U32;
    u64 => U64, U64;
    usize => U64, U64;
    f32 => F32, F32;
    f64 => F64, F64;
}

impl Reflect for bool {
    fn shape() -> Shape {
        Shape::Scalar(ScalarKind::Bool)
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(to_bool(&value))
    }
}

impl Reflect for String {
    fn shape() -> Shape {
        Shape::Scalar(ScalarKind::String)
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Ok(to_string(&other)),
        }
    }
}

impl Reflect for DateTime<Utc> {
    fn shape() -> Shape {
        Shape::Time
    }

    fn to_value(&self) -> Value {
        Value::Time(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        cast_time(&value)
    }
}

impl Reflect for Value {
    fn shape() -> Shape {
        Shape::Any
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

/// An owned byte buffer whose shape is [`Shape::Bytes`] rather than a list of `u8`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteBuf(pub Vec<u8>);

impl Deref for ByteBuf {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl DerefMut for ByteBuf {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

impl From<Vec<u8>> for ByteBuf {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Reflect for ByteBuf {
    fn shape() -> Shape {
        Shape::Bytes
    }

    fn to_value(&self) -> Value {
        Value::Bytes(self.0.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(bytes) => Ok(Self(bytes)),
            other => try_to_bytes(&other).map(Self),
        }
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn shape() -> Shape {
        Shape::option(T::shape())
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_value)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn shape() -> Shape {
        T::shape()
    }

    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn from_value(value: Value) -> Result<Self> {
        T::from_value(value).map(Box::new)
    }
}

fn list_items(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items),
        Value::Bytes(bytes) => Ok(bytes.into_iter().map(Value::U8).collect()),
        Value::Null => Ok(Vec::new()),
        Value::Pointer(ptr) => list_items(ptr.get()),
        other => Err(CastError::new(CastErrorKind::UnsupportedSourceType)
            .with_detail(format!("expected a list, got {}", other.type_name()))),
    }
}

fn collect_items<T: Reflect>(items: Vec<Value>) -> Result<Vec<T>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            T::from_value(item).map_err(|err| err.with_path(PathSegment::Index(index)))
        })
        .collect()
}

impl<T: Reflect> Reflect for Vec<T> {
    fn shape() -> Shape {
        Shape::list(T::shape())
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(T::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        collect_items(list_items(value)?)
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn shape() -> Shape {
        Shape::Array(Box::new(T::shape()), N)
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(T::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        let items = collect_items::<T>(list_items(value)?)?;
        let len = items.len();
        items.try_into().map_err(|_| {
            CastError::new(CastErrorKind::UnsupportedDestinationType)
                .with_detail(format!("expected {N} elements, got {len}"))
        })
    }
}

fn map_entries(value: Value) -> Result<ValueMap> {
    match value {
        Value::Map(map) => Ok(map),
        Value::Null => Ok(ValueMap::new()),
        Value::Pointer(ptr) => map_entries(ptr.get()),
        other => Err(CastError::new(CastErrorKind::UnsupportedSourceType)
            .with_detail(format!("expected a map, got {}", other.type_name()))),
    }
}

fn collect_entries<K: Reflect, V: Reflect, C: FromIterator<(K, V)>>(map: ValueMap) -> Result<C> {
    map.into_iter()
        .map(|(key, value)| {
            let at_key = |err: CastError| err.with_path(PathSegment::Key(to_string(&key)));
            let v = V::from_value(value).map_err(at_key)?;
            let k = K::from_value(key.clone()).map_err(at_key)?;
            Ok((k, v))
        })
        .collect()
}

impl<K, V, S> Reflect for HashMap<K, V, S>
where
    K: Reflect + Eq + Hash,
    V: Reflect,
    S: BuildHasher + Default,
{
    fn shape() -> Shape {
        Shape::map(K::shape(), V::shape())
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        collect_entries(map_entries(value)?)
    }
}

impl<K, V> Reflect for BTreeMap<K, V>
where
    K: Reflect + Ord,
    V: Reflect,
{
    fn shape() -> Shape {
        Shape::map(K::shape(), V::shape())
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        collect_entries(map_entries(value)?)
    }
}

impl<K, V, S> Reflect for IndexMap<K, V, S>
where
    K: Reflect + Eq + Hash,
    V: Reflect,
    S: BuildHasher + Default,
{
    fn shape() -> Shape {
        Shape::map(K::shape(), V::shape())
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        collect_entries(map_entries(value)?)
    }
}

#[doc(hidden)]
pub mod __private {
    use super::*;

    pub use alloc::sync::Arc;
    pub use std::sync::OnceLock;

    pub type FieldValues = alloc::vec::IntoIter<Value>;

    /// Field values of `value` as a record of `ty`, casting it first if needed.
    pub fn struct_fields(value: Value, ty: &Arc<StructType>) -> Result<FieldValues> {
        let value = match value {
            Value::Struct(record) if Arc::ptr_eq(record.ty(), ty) => {
                return Ok(record.into_fields().into_iter());
            }
            other => other,
        };
        let shape = Shape::Struct(ty.clone());
        match crate::cast::cast_value(&Context::default(), &value, &shape, 0)? {
            Value::Struct(record) => Ok(record.into_fields().into_iter()),
            other => Err(CastError::new(CastErrorKind::UnsupportedSourceType)
                .with_detail(format!("expected {}, got {}", ty.name(), other.type_name()))),
        }
    }

    /// Rebuild the next field in declaration order.
    pub fn take_field<T: Reflect>(fields: &mut FieldValues, name: &'static str) -> Result<T> {
        T::from_value(fields.next().unwrap_or_default())
            .map_err(|err| err.with_path(PathSegment::Field(name.to_owned())))
    }
}
