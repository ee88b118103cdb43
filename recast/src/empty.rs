//! The emptiness predicate behind `omitempty`.

use crate::Value;

/// Whether `value` counts as empty.
///
/// Zero numbers, `false`, empty strings and zero-length containers are
/// empty, as is null. Pointers, records, timestamps and opaque handles never
/// are. Runs in constant time.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::I8(v) => *v == 0,
        Value::I16(v) => *v == 0,
        Value::I32(v) => *v == 0,
        Value::I64(v) => *v == 0,
        Value::U8(v) => *v == 0,
        Value::U16(v) => *v == 0,
        Value::U32(v) => *v == 0,
        Value::U64(v) => *v == 0,
        Value::F32(v) => *v == 0.0,
        Value::F64(v) => *v == 0.0,
        Value::String(s) => s.is_empty(),
        Value::Bytes(b) => b.is_empty(),
        Value::List(items) => items.is_empty(),
        Value::Map(map) => map.is_empty(),
        Value::Time(_) | Value::Struct(_) | Value::Pointer(_) | Value::Opaque(_) => false,
    }
}
