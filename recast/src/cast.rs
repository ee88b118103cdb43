//! The structural caster.
//!
//! [`cast_value`] dispatches on the target [`Shape`]: scalars go through
//! [`coerce`](crate::coerce), containers are rebuilt element by element,
//! records are matched field by field through resolved names. The first
//! failure aborts the cast and unwinds with the path that led to it.

use alloc::borrow::Cow;
use alloc::sync::Arc;

use crate::coerce::{coerce_scalar, to_string, try_to_bytes};
use crate::copy::{CopyOptions, deep_copy_with};
use crate::empty::is_empty;
use crate::fields::{ResolvedField, resolve_fields};
use crate::time::cast_time;
use crate::{
    CastError, CastErrorKind, Context, CustomShape, OpaqueKind, PathSegment, Ptr, Reflect, Result,
    Shape, StructType, StructValue, Value, ValueMap, debug, trace,
};

impl Context {
    /// Cast `value` into `shape`.
    pub fn cast(&self, value: &Value, shape: &Shape) -> Result<Value> {
        self.check_cancelled()?;
        cast_value(self, value, shape, 0)
    }

    /// Cast `value` into `T`.
    pub fn cast_into<T: Reflect>(&self, value: &Value) -> Result<T> {
        T::from_value(self.cast(value, &T::shape())?)
    }

    /// Cast a typed `source` into `T`.
    pub fn convert<S: Reflect, T: Reflect>(&self, source: &S) -> Result<T> {
        self.cast_into(&source.to_value())
    }

    /// Cast `value` into the shape of the field declared as `name` and store it.
    /// Fields promoted from embedded records are found too.
    ///
    /// Fails with [`CastErrorKind::FieldNameUndefined`] when no such field
    /// exists and [`CastErrorKind::FieldValueCannotBeChanged`] when the field
    /// is unexported.
    pub fn set_field(&self, record: &mut StructValue, name: &str, value: &Value) -> Result<()> {
        self.check_cancelled()?;
        let ty = record.ty().clone();
        let Some((path, field)) = ty.find_field(name) else {
            return Err(CastError::new(CastErrorKind::FieldNameUndefined)
                .with_detail(format!("{} has no field {name:?}", ty.name())));
        };
        if !field.is_exported() {
            return Err(CastError::new(CastErrorKind::FieldValueCannotBeChanged)
                .with_detail(format!("{}.{name} is unexported", ty.name())));
        }
        let cast = cast_value(self, value, &field.shape(), 0)
            .map_err(|err| err.with_path(PathSegment::Field(name.to_owned())))?;
        record.set_path(&path, cast)
    }
}

/// Cast `value` into `shape`, resolving field names through `tags`.
///
/// Dynamic targets receive deep copies of containers; records stay records.
pub fn cast(value: &Value, shape: &Shape, tags: &[&str]) -> Result<Value> {
    Context::new().with_tags(tags).cast(value, shape)
}

/// Like [`cast`], but records reaching a dynamic target are rebuilt as maps
/// keyed by their resolved field names, all the way down.
pub fn cast_recursive(value: &Value, shape: &Shape, tags: &[&str]) -> Result<Value> {
    Context::new()
        .with_tags(tags)
        .with_recursive(true)
        .cast(value, shape)
}

/// Cast `value` into `T`, resolving field names through `tags`.
pub fn try_cast<T: Reflect>(value: &Value, tags: &[&str]) -> Result<T> {
    Context::new().with_tags(tags).cast_into(value)
}

/// Cast `value` into `T`, falling back to `T::default()` on failure.
pub fn cast_or_default<T: Reflect + Default>(value: &Value, tags: &[&str]) -> T {
    try_cast(value, tags).unwrap_or_default()
}

/// Cast a typed `source` into `T`, resolving field names through `tags`.
pub fn convert<S: Reflect, T: Reflect>(source: &S, tags: &[&str]) -> Result<T> {
    Context::new().with_tags(tags).convert(source)
}

pub(crate) fn cast_value(cx: &Context, src: &Value, shape: &Shape, depth: usize) -> Result<Value> {
    if depth > cx.max_depth() {
        return Err(CastError::new(CastErrorKind::DepthLimitExceeded)
            .with_detail(format!("nesting exceeds {} levels", cx.max_depth())));
    }
    trace!(target_shape = %shape, source = %src.kind(), depth, "cast");

    match (shape, src) {
        (Shape::Interface(_), _) => Ok(src.clone()),
        (Shape::Any, _) => cast_any(cx, src, depth),
        (Shape::Pointer(inner), _) => cast_pointer(cx, src, inner, depth),
        (_, Value::Pointer(ptr)) => cast_value(cx, &ptr.get(), shape, depth + 1),
        (_, Value::Null) => Ok(shape.zero_value()),
        (Shape::Scalar(kind), _) => coerce_scalar(*kind, src),
        (Shape::Bytes, _) => try_to_bytes(src).map(Value::Bytes),
        (Shape::Time, _) => cast_time(src).map(Value::Time),
        (Shape::List(elem), _) => cast_list(cx, src, elem, None, depth),
        (Shape::Array(elem, len), _) => cast_list(cx, src, elem, Some(*len), depth),
        (Shape::Map(key, value), _) => cast_map(cx, src, key, value, depth),
        (Shape::Struct(ty), _) => cast_struct(cx, src, ty, depth).map(Value::Struct),
        (Shape::Option(inner), _) => cast_value(cx, src, inner, depth + 1),
        (Shape::Custom(custom), _) => cast_custom(cx, src, custom, depth),
        (Shape::Opaque(kind, name), _) => cast_opaque(src, *kind, name),
    }
}

// Dynamic slots never alias mutable storage of the source.
fn cast_any(cx: &Context, src: &Value, depth: usize) -> Result<Value> {
    match src {
        Value::Struct(_) | Value::Map(_) if cx.is_recursive() => {
            cast_map(cx, src, &Shape::Any, &Shape::Any, depth)
        }
        Value::List(items) if cx.is_recursive() => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                out.push(
                    cast_value(cx, item, &Shape::Any, depth + 1)
                        .map_err(|err| err.with_path(PathSegment::Index(index)))?,
                );
            }
            Ok(Value::List(out))
        }
        Value::List(_) | Value::Map(_) | Value::Struct(_) | Value::Pointer(_) => {
            let options = CopyOptions::new()
                .ignore_unexported_fields(false)
                .share_opaque(true);
            deep_copy_with(src, &options)
        }
        _ => Ok(src.clone()),
    }
}

fn cast_pointer(cx: &Context, src: &Value, inner: &Shape, depth: usize) -> Result<Value> {
    let pointee = match src {
        Value::Null => return Ok(Value::Null),
        Value::Pointer(ptr) => cast_value(cx, &ptr.get(), inner, depth + 1)?,
        other => cast_value(cx, other, inner, depth + 1)?,
    };
    Ok(Value::Pointer(Ptr::new(pointee)))
}

fn cast_list(
    cx: &Context,
    src: &Value,
    elem: &Shape,
    fixed: Option<usize>,
    depth: usize,
) -> Result<Value> {
    let items: Cow<'_, [Value]> = match src {
        Value::List(items) => Cow::Borrowed(items),
        Value::Bytes(bytes) => Cow::Owned(bytes.iter().copied().map(Value::U8).collect()),
        other => {
            return Err(CastError::new(CastErrorKind::InvalidParams)
                .with_detail(format!("{} is not a list or array", other.type_name())));
        }
    };

    let len = match fixed {
        Some(len) if items.len() > len => {
            return Err(CastError::new(CastErrorKind::UnsupportedDestinationType)
                .with_detail(format!("[{elem}; {len}] cannot hold {} elements", items.len())));
        }
        Some(len) => len,
        None => items.len(),
    };

    let mut out = Vec::with_capacity(len);
    for (index, item) in items.iter().enumerate() {
        out.push(
            cast_value(cx, item, elem, depth + 1)
                .map_err(|err| err.with_path(PathSegment::Index(index)))?,
        );
    }
    out.resize_with(len, || elem.zero_value());
    Ok(Value::List(out))
}

fn cast_map(cx: &Context, src: &Value, key: &Shape, value: &Shape, depth: usize) -> Result<Value> {
    let mut out = ValueMap::new();
    match src {
        Value::Map(entries) => {
            out.reserve(entries.len());
            for (k, v) in entries {
                let at_key = |err: CastError| err.with_path(PathSegment::Key(to_string(k)));
                let dst_key = cast_value(cx, k, key, depth + 1).map_err(at_key)?;
                let dst_value = cast_value(cx, v, value, depth + 1).map_err(at_key)?;
                out.insert(dst_key, dst_value);
            }
        }
        Value::Struct(record) => {
            for field in resolve_fields(record.ty(), cx.tags()) {
                let Some(field_value) = record.get_path(&field.path) else {
                    continue;
                };
                if field.omit_empty && is_empty(field_value) {
                    continue;
                }
                let at_field =
                    |err: CastError| err.with_path(PathSegment::Field(field.name.to_owned()));
                let dst_key = cast_value(cx, &Value::from(field.name), key, depth + 1)
                    .map_err(at_field)?;
                let dst_value =
                    cast_value(cx, field_value, value, depth + 1).map_err(at_field)?;
                out.insert(dst_key, dst_value);
            }
        }
        other => {
            return Err(
                CastError::new(CastErrorKind::UnsupportedSourceType).with_detail(format!(
                    "cannot build map<{key}, {value}> from {}",
                    other.type_name()
                )),
            );
        }
    }
    Ok(Value::Map(out))
}

enum Source<'a> {
    Map(&'a ValueMap),
    Struct(&'a StructValue, Vec<ResolvedField>),
}

impl Source<'_> {
    fn lookup(&self, field: &ResolvedField) -> Option<&Value> {
        field.candidates().find_map(|name| match self {
            Source::Map(entries) => entries
                .iter()
                .find(|(key, _)| key_matches(key, name))
                .map(|(_, value)| value),
            Source::Struct(record, fields) => fields
                .iter()
                .find(|f| f.name == name)
                .or_else(|| fields.iter().find(|f| f.declared == name))
                .and_then(|f| record.get_path(&f.path)),
        })
    }
}

fn key_matches(key: &Value, name: &str) -> bool {
    match key {
        Value::String(text) => text == name,
        other => to_string(other) == name,
    }
}

fn cast_struct(
    cx: &Context,
    src: &Value,
    ty: &Arc<StructType>,
    depth: usize,
) -> Result<StructValue> {
    let source = match src {
        Value::Map(entries) => Source::Map(entries),
        Value::Struct(record) => Source::Struct(record, resolve_fields(record.ty(), cx.tags())),
        other => {
            return Err(CastError::new(CastErrorKind::UnsupportedSourceType)
                .with_detail(format!("cannot build {} from {}", ty.name(), other.type_name())));
        }
    };

    let mut out = StructValue::zero(ty);
    for field in resolve_fields(ty, cx.tags()) {
        let Some(found) = source.lookup(&field) else {
            continue;
        };
        if found.is_null() {
            continue;
        }
        let cast = cast_value(cx, found, &field.shape, depth + 1)
            .map_err(|err| err.with_path(PathSegment::Field(field.name.to_owned())))?;
        out.set_path(&field.path, cast)?;
    }
    Ok(out)
}

fn cast_custom(cx: &Context, src: &Value, custom: &CustomShape, depth: usize) -> Result<Value> {
    match custom.apply(cx, src) {
        Ok(value) => Ok(value),
        Err(err) => match custom.repr() {
            repr @ Shape::Struct(_) => {
                debug!(
                    custom = custom.name(),
                    error = %err,
                    "setter failed, matching fields instead"
                );
                cast_value(cx, src, &repr, depth + 1)
            }
            _ => Err(err),
        },
    }
}

fn cast_opaque(src: &Value, kind: OpaqueKind, name: &'static str) -> Result<Value> {
    match src {
        Value::Opaque(opaque) if opaque.kind() == kind && opaque.type_name() == name => {
            Ok(src.clone())
        }
        other => Err(CastError::new(CastErrorKind::UnsupportedDestinationType)
            .with_detail(format!("cannot produce {kind} {name} from {}", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Field, ScalarKind};

    fn i64_shape() -> Shape {
        Shape::Scalar(ScalarKind::I64)
    }

    #[test]
    fn null_becomes_zero_value() {
        let cx = Context::new();
        assert_eq!(cx.cast(&Value::Null, &i64_shape()).unwrap(), Value::I64(0));
        assert_eq!(
            cx.cast(&Value::Null, &Shape::list(i64_shape())).unwrap(),
            Value::List(vec![])
        );
        assert_eq!(cx.cast(&Value::Null, &Shape::pointer(i64_shape())).unwrap(), Value::Null);
    }

    #[test]
    fn scalars_into_lists_are_rejected() {
        let err = Context::new()
            .cast(&Value::I64(3), &Shape::list(i64_shape()))
            .unwrap_err();
        assert!(err.is(CastErrorKind::InvalidParams));
    }

    #[test]
    fn arrays_pad_and_refuse_overflow() {
        let cx = Context::new();
        let shape = Shape::Array(Box::new(i64_shape()), 3);
        let src = Value::List(vec![Value::from("1")]);
        assert_eq!(
            cx.cast(&src, &shape).unwrap(),
            Value::List(vec![Value::I64(1), Value::I64(0), Value::I64(0)])
        );
        let long = Value::List(vec![Value::I64(1); 4]);
        assert!(cx.cast(&long, &shape).unwrap_err().is(CastErrorKind::UnsupportedDestinationType));
    }

    #[test]
    fn pointers_are_followed_and_rewrapped() {
        let cx = Context::new();
        let src = Value::Pointer(Ptr::new(Value::from("12")));
        assert_eq!(cx.cast(&src, &i64_shape()).unwrap(), Value::I64(12));

        let Value::Pointer(out) = cx.cast(&src, &Shape::pointer(i64_shape())).unwrap() else {
            panic!("expected a pointer")
        };
        assert_eq!(out.get(), Value::I64(12));
    }

    #[test]
    fn self_referencing_pointer_hits_depth_cap() {
        let ptr = Ptr::new(Value::Null);
        ptr.set(Value::Pointer(ptr.clone()));
        let err = Context::new()
            .with_max_depth(16)
            .cast(&Value::Pointer(ptr), &i64_shape())
            .unwrap_err();
        assert!(err.is(CastErrorKind::DepthLimitExceeded));
    }

    #[test]
    fn set_field_checks_names_and_visibility() {
        let ty = StructType::builder("Conf")
            .field(Field::new("port", i64_shape))
            .field(Field::new("token", i64_shape).private())
            .build();
        let mut record = StructValue::zero(&ty);
        let cx = Context::new();
        cx.set_field(&mut record, "port", &Value::from("8080")).unwrap();
        assert_eq!(record.get("port"), Some(&Value::I64(8080)));
        assert!(
            cx.set_field(&mut record, "host", &Value::Null)
                .unwrap_err()
                .is(CastErrorKind::FieldNameUndefined)
        );
        assert!(
            cx.set_field(&mut record, "token", &Value::I64(1))
                .unwrap_err()
                .is(CastErrorKind::FieldValueCannotBeChanged)
        );
    }

    #[test]
    fn cancelled_context_refuses_to_start() {
        let cx = Context::new();
        cx.cancel_token().cancel();
        assert!(cx.cast(&Value::I64(1), &i64_shape()).unwrap_err().is(CastErrorKind::Cancelled));
    }
}
