//! The dynamic value model.

use alloc::borrow::Cow;
use alloc::sync::Arc;
use core::any::Any;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;

use crate::{CastError, CastErrorKind, StructType};

/// Insertion-ordered map of dynamic values.
pub type ValueMap = IndexMap<Value, Value>;

/// A dynamically-typed value.
///
/// Equality is structural, except that floats compare by bit pattern and
/// pointers and opaque handles compare by identity. That keeps `Eq` and
/// `Hash` total so values can be map keys.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// 8-bit signed integer.
    I8(i8),
    /// 16-bit signed integer.
    I16(i16),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// 8-bit unsigned integer.
    U8(u8),
    /// 16-bit unsigned integer.
    U16(u16),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit unsigned integer.
    U64(u64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// UTF-8 text.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// A UTC timestamp.
    Time(DateTime<Utc>),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Key-value mapping.
    Map(ValueMap),
    /// Record with named fields.
    Struct(StructValue),
    /// Shared reference; the only way to build aliased or cyclic graphs.
    Pointer(Ptr),
    /// Function-like or channel-like handle.
    Opaque(Opaque),
}

/// Discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ValueKind {
    Null,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Bytes,
    Time,
    List,
    Map,
    Struct,
    Pointer,
    Func,
    Chan,
}

impl ValueKind {
    /// Lower-case name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::I8 => "i8",
            ValueKind::I16 => "i16",
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::U8 => "u8",
            ValueKind::U16 => "u16",
            ValueKind::U32 => "u32",
            ValueKind::U64 => "u64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
            ValueKind::String => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::Time => "time",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Struct => "struct",
            ValueKind::Pointer => "pointer",
            ValueKind::Func => "func",
            ValueKind::Chan => "chan",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// The variant of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::I8(_) => ValueKind::I8,
            Value::I16(_) => ValueKind::I16,
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::U8(_) => ValueKind::U8,
            Value::U16(_) => ValueKind::U16,
            Value::U32(_) => ValueKind::U32,
            Value::U64(_) => ValueKind::U64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Time(_) => ValueKind::Time,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Struct(_) => ValueKind::Struct,
            Value::Pointer(_) => ValueKind::Pointer,
            Value::Opaque(opaque) => match opaque.kind() {
                OpaqueKind::Func => ValueKind::Func,
                OpaqueKind::Chan => ValueKind::Chan,
            },
        }
    }

    /// Concrete type name: the struct or opaque type name, else the kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Struct(record) => record.type_name(),
            Value::Opaque(opaque) => opaque.type_name(),
            other => other.kind().as_str(),
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The text, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The entries, if this is a map.
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// The items, if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The record, if this is a struct.
    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(record) => Some(record),
            _ => None,
        }
    }

    /// The shared reference, if this is a pointer.
    pub fn as_pointer(&self) -> Option<&Ptr> {
        match self {
            Value::Pointer(ptr) => Some(ptr),
            _ => None,
        }
    }

    /// Length of strings, bytes, lists and maps; `None` for everything else.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.len()),
            Value::Bytes(b) => Some(b.len()),
            Value::List(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Follow pointers to the value they designate.
    ///
    /// A chain of pointers that loops back on itself designates nothing and
    /// yields [`Value::Null`].
    pub fn target(&self) -> Cow<'_, Value> {
        let Value::Pointer(first) = self else {
            return Cow::Borrowed(self);
        };
        let mut seen = vec![first.addr()];
        let mut current = first.get();
        loop {
            let Some(next) = current.as_pointer().cloned() else {
                return Cow::Owned(current);
            };
            if seen.contains(&next.addr()) {
                return Cow::Owned(Value::Null);
            }
            seen.push(next.addr());
            current = next.get();
        }
    }

    /// The zero value of this value's own kind.
    pub fn zero_like(&self) -> Value {
        match self {
            Value::Null | Value::Pointer(_) | Value::Opaque(_) => Value::Null,
            Value::Bool(_) => Value::Bool(false),
            Value::I8(_) => Value::I8(0),
            Value::I16(_) => Value::I16(0),
            Value::I32(_) => Value::I32(0),
            Value::I64(_) => Value::I64(0),
            Value::U8(_) => Value::U8(0),
            Value::U16(_) => Value::U16(0),
            Value::U32(_) => Value::U32(0),
            Value::U64(_) => Value::U64(0),
            Value::F32(_) => Value::F32(0.0),
            Value::F64(_) => Value::F64(0.0),
            Value::String(_) => Value::String(String::new()),
            Value::Bytes(_) => Value::Bytes(Vec::new()),
            Value::Time(_) => Value::Time(DateTime::<Utc>::default()),
            Value::List(_) => Value::List(Vec::new()),
            Value::Map(_) => Value::Map(ValueMap::new()),
            Value::Struct(record) => Value::Struct(StructValue::zero(record.ty())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::Pointer(a), Value::Pointer(b)) => a.ptr_eq(b),
            (Value::Opaque(a), Value::Opaque(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::I8(v) => v.hash(state),
            Value::I16(v) => v.hash(state),
            Value::I32(v) => v.hash(state),
            Value::I64(v) => v.hash(state),
            Value::U8(v) => v.hash(state),
            Value::U16(v) => v.hash(state),
            Value::U32(v) => v.hash(state),
            Value::U64(v) => v.hash(state),
            Value::F32(v) => v.to_bits().hash(state),
            Value::F64(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
            Value::Time(v) => v.hash(state),
            Value::List(items) => items.hash(state),
            // map equality ignores order
            Value::Map(map) => map.len().hash(state),
            Value::Struct(record) => {
                record.type_name().hash(state);
                record.fields.hash(state);
            }
            Value::Pointer(ptr) => ptr.addr().hash(state),
            Value::Opaque(opaque) => opaque.addr().hash(state),
        }
    }
}

/// Best-effort textual form, used when coercing non-scalars to strings.
///
/// Lists print as `[a b]`, maps as `map[k:v]`, structs as `{a b}`, pointers
/// as their address and time as RFC 3339.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("<nil>"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Bytes(bytes) => write_seq(f, "[", bytes.iter(), "]"),
            Value::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::List(items) => write_seq(f, "[", items.iter(), "]"),
            Value::Map(map) => {
                f.write_str("map[")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                f.write_str("]")
            }
            Value::Struct(record) => write_seq(f, "{", record.fields.iter(), "}"),
            Value::Pointer(ptr) => write!(f, "{:#x}", ptr.addr()),
            Value::Opaque(opaque) => write!(f, "<{} {}>", opaque.kind(), opaque.type_name()),
        }
    }
}

fn write_seq<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = T>,
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

/// A record value: its type plus one value per declared field.
#[derive(Debug, Clone)]
pub struct StructValue {
    ty: Arc<StructType>,
    fields: Vec<Value>,
}

impl StructValue {
    /// Build a record; missing trailing fields are filled with zero values.
    pub fn new(ty: Arc<StructType>, mut fields: Vec<Value>) -> Self {
        let declared = ty.fields();
        fields.truncate(declared.len());
        for field in &declared[fields.len()..] {
            fields.push(field.shape().zero_value());
        }
        Self { ty, fields }
    }

    /// A record of `ty` with every field at its zero value.
    pub fn zero(ty: &Arc<StructType>) -> Self {
        Self::new(ty.clone(), Vec::new())
    }

    /// The record's type.
    pub fn ty(&self) -> &Arc<StructType> {
        &self.ty
    }

    /// The record's type name.
    pub fn type_name(&self) -> &'static str {
        self.ty.name()
    }

    /// Field values in declaration order.
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Consume the record, returning its field values.
    pub fn into_fields(self) -> Vec<Value> {
        self.fields
    }

    /// A field's value by declared name, looking through embedded records.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let (path, _) = self.ty.find_field(name)?;
        self.get_path(&path)
    }

    /// The value of the first declared field answering to one of `names`.
    pub fn field_value(&self, names: &[&str]) -> Result<&Value, CastError> {
        names
            .iter()
            .find_map(|name| self.get(name))
            .ok_or_else(|| {
                CastError::new(CastErrorKind::FieldNameUndefined)
                    .with_detail(format!("{} has no field {names:?}", self.type_name()))
            })
    }

    /// Pairs of field descriptor and value.
    pub fn iter(&self) -> impl Iterator<Item = (&crate::Field, &Value)> {
        self.ty.fields().iter().zip(&self.fields)
    }

    /// The value at an index path through embedded records.
    pub(crate) fn get_path(&self, path: &[usize]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let value = self.fields.get(*first)?;
        if rest.is_empty() {
            return Some(value);
        }
        match value {
            Value::Struct(inner) => inner.get_path(rest),
            _ => None,
        }
    }

    /// Overwrite the value at an index path through embedded records.
    pub(crate) fn set_path(&mut self, path: &[usize], value: Value) -> Result<(), CastError> {
        let type_name = self.type_name();
        let unsettable = || {
            CastError::new(CastErrorKind::UnsettableValue)
                .with_detail(format!("no slot at {path:?} in {type_name}"))
        };
        let (first, rest) = path.split_first().ok_or_else(unsettable)?;
        let slot = self.fields.get_mut(*first).ok_or_else(unsettable)?;
        if rest.is_empty() {
            *slot = value;
            return Ok(());
        }
        match slot {
            Value::Struct(inner) => inner.set_path(rest, value),
            _ => Err(unsettable()),
        }
    }
}

impl PartialEq for StructValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name() && self.fields == other.fields
    }
}

/// A shared, interior-mutable reference to a [`Value`].
///
/// Cloning a `Ptr` aliases the same slot. Identity is the slot's address.
#[derive(Clone)]
pub struct Ptr(Arc<RwLock<Value>>);

impl Ptr {
    /// Allocate a new slot holding `value`.
    pub fn new(value: Value) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// A copy of the pointee. Nested pointers keep their identity.
    pub fn get(&self) -> Value {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the pointee.
    pub fn set(&self, value: Value) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Run `f` with a borrow of the pointee.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.0.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Identity of the slot.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Whether both pointers designate the same slot.
    pub fn ptr_eq(&self, other: &Ptr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Ptr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ptr({:#x})", self.addr())
    }
}

/// Flavor of an [`Opaque`] handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpaqueKind {
    /// Something callable.
    Func,
    /// A communication channel.
    Chan,
}

impl fmt::Display for OpaqueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpaqueKind::Func => "func",
            OpaqueKind::Chan => "chan",
        })
    }
}

/// A function-like or channel-like handle that cannot be deep-copied.
#[derive(Clone)]
pub struct Opaque {
    kind: OpaqueKind,
    type_name: &'static str,
    handle: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    /// Wrap `handle` as an opaque value of the given kind and type name.
    pub fn new(kind: OpaqueKind, type_name: &'static str, handle: impl Any + Send + Sync) -> Self {
        Self {
            kind,
            type_name,
            handle: Arc::new(handle),
        }
    }

    /// A function handle.
    pub fn func(type_name: &'static str, handle: impl Any + Send + Sync) -> Self {
        Self::new(OpaqueKind::Func, type_name, handle)
    }

    /// A channel handle.
    pub fn chan(type_name: &'static str, handle: impl Any + Send + Sync) -> Self {
        Self::new(OpaqueKind::Chan, type_name, handle)
    }

    /// Handle flavor.
    pub fn kind(&self) -> OpaqueKind {
        self.kind
    }

    /// Declared type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The wrapped handle, if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref()
    }

    /// Identity of the handle.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.handle) as *const () as usize
    }

    /// Whether both handles are the same allocation.
    pub fn ptr_eq(&self, other: &Opaque) -> bool {
        self.addr() == other.addr()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({} {})", self.kind, self.type_name)
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Vec<u8> => Bytes,
    DateTime<Utc> => Time,
    Vec<Value> => List,
    ValueMap => Map,
    StructValue => Struct,
    Ptr => Pointer,
    Opaque => Opaque,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_compare_by_bits() {
        assert_eq!(Value::F64(f64::NAN), Value::F64(f64::NAN));
        assert_ne!(Value::F64(0.0), Value::F64(-0.0));
        assert_ne!(Value::I32(1), Value::I64(1));
    }

    #[test]
    fn pointers_compare_by_identity() {
        let a = Ptr::new(Value::I64(1));
        let b = Ptr::new(Value::I64(1));
        assert_eq!(Value::Pointer(a.clone()), Value::Pointer(a.clone()));
        assert_ne!(Value::Pointer(a), Value::Pointer(b));
    }

    #[test]
    fn target_follows_pointer_chains() {
        let inner = Ptr::new(Value::from("x"));
        let outer = Ptr::new(Value::Pointer(inner));
        assert_eq!(*Value::Pointer(outer).target(), Value::from("x"));
    }

    #[test]
    fn target_of_a_pointer_loop_is_null() {
        let a = Ptr::new(Value::Null);
        let b = Ptr::new(Value::Pointer(a.clone()));
        a.set(Value::Pointer(b));
        assert_eq!(*Value::Pointer(a).target(), Value::Null);
    }

    #[test]
    fn display_is_stable() {
        let mut map = ValueMap::new();
        map.insert(Value::from("a"), Value::List(vec![Value::I64(1), Value::from("x")]));
        map.insert(Value::from("b"), Value::Bool(true));
        assert_eq!(Value::Map(map).to_string(), "map[a:[1 x] b:true]");
        assert_eq!(Value::Bytes(b"hi".to_vec()).to_string(), "[104 105]");
    }

    #[test]
    fn len_only_for_containers() {
        assert_eq!(Value::from("abc").len(), Some(3));
        assert_eq!(Value::List(vec![Value::Null]).len(), Some(1));
        assert_eq!(Value::I64(3).len(), None);
    }
}
