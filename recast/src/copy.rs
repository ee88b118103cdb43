//! Cycle-safe deep copy.
//!
//! Every pointer reachable from the source is copied exactly once: the new
//! slot is registered before its pointee is copied, so a cycle in the source
//! becomes the same cycle in the copy and two paths to one slot stay two
//! paths to one new slot.

use std::collections::HashMap;

use crate::{
    CastError, CastErrorKind, Context, PathSegment, Ptr, Reflect, Result, StructValue, Value,
    ValueMap, trace,
};

/// Bounds and relaxations for [`deep_copy_with`].
#[derive(Debug, Clone)]
pub struct CopyOptions {
    max_depth: usize,
    ignore_unexported_fields: bool,
    ignore_circular_refs: bool,
    share_opaque: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            max_depth: 0,
            ignore_unexported_fields: true,
            ignore_circular_refs: false,
            share_opaque: false,
        }
    }
}

impl CopyOptions {
    /// Unbounded copy of exported fields, re-linking cycles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop descending at this depth and substitute zero values; `0` means unbounded.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Leave unexported fields at their zero value (the default). With
    /// `false` they are deep-copied like any other field.
    pub fn ignore_unexported_fields(mut self, ignore: bool) -> Self {
        self.ignore_unexported_fields = ignore;
        self
    }

    /// Replace pointers to already-copied slots with null instead of
    /// re-linking them. Shared (non-cyclic) references are cut too.
    pub fn ignore_circular_refs(mut self, ignore: bool) -> Self {
        self.ignore_circular_refs = ignore;
        self
    }

    /// Share function and channel handles instead of rejecting them.
    pub(crate) fn share_opaque(mut self, share: bool) -> Self {
        self.share_opaque = share;
        self
    }
}

/// Deep-copy a value graph.
///
/// The copy never aliases mutable storage of the source. Functions and
/// channels fail with [`CastErrorKind::UnsupportedType`].
pub fn deep_copy(value: &Value) -> Result<Value> {
    deep_copy_with(value, &CopyOptions::default())
}

/// Deep-copy a value graph under `options`.
pub fn deep_copy_with(value: &Value, options: &CopyOptions) -> Result<Value> {
    Copier {
        options,
        visited: HashMap::new(),
    }
    .copy(value, 0)
}

/// Deep-copy a typed value through its dynamic form.
pub fn copy_of<T: Reflect>(value: &T) -> Result<T> {
    T::from_value(deep_copy(&value.to_value())?)
}

impl Context {
    /// Deep-copy `value`, observing this context's cancellation token.
    pub fn deep_copy(&self, value: &Value) -> Result<Value> {
        self.check_cancelled()?;
        deep_copy(value)
    }

    /// Deep-copy `value` under `options`, observing this context's cancellation token.
    pub fn deep_copy_with(&self, value: &Value, options: &CopyOptions) -> Result<Value> {
        self.check_cancelled()?;
        deep_copy_with(value, options)
    }
}

struct Copier<'o> {
    options: &'o CopyOptions,
    /// Source slot address to its copy.
    visited: HashMap<usize, Ptr>,
}

impl Copier<'_> {
    fn copy(&mut self, src: &Value, depth: usize) -> Result<Value> {
        if self.options.max_depth > 0 && depth >= self.options.max_depth {
            return Ok(src.zero_like());
        }

        match src {
            Value::Pointer(ptr) => self.copy_pointer(ptr, depth),
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    out.push(
                        self.copy(item, depth + 1)
                            .map_err(|err| err.with_path(PathSegment::Index(index)))?,
                    );
                }
                Ok(Value::List(out))
            }
            Value::Map(map) => {
                let mut out = ValueMap::with_capacity(map.len());
                for (key, value) in map {
                    let at_key = |err: CastError| err.with_path(PathSegment::Key(key.to_string()));
                    // keys sit at the map's own depth so a bound never blanks them
                    let key_copy = self.copy(key, depth).map_err(at_key)?;
                    let value_copy = self.copy(value, depth + 1).map_err(at_key)?;
                    out.insert(key_copy, value_copy);
                }
                Ok(Value::Map(out))
            }
            Value::Struct(record) => self.copy_struct(record, depth).map(Value::Struct),
            Value::Opaque(opaque) if self.options.share_opaque => Ok(Value::Opaque(opaque.clone())),
            Value::Opaque(opaque) => Err(CastError::new(CastErrorKind::UnsupportedType)
                .with_detail(format!("{} {}", opaque.kind(), opaque.type_name()))),
            scalar => Ok(scalar.clone()),
        }
    }

    fn copy_pointer(&mut self, ptr: &Ptr, depth: usize) -> Result<Value> {
        if let Some(existing) = self.visited.get(&ptr.addr()) {
            trace!(addr = ptr.addr(), "deep copy revisits a slot");
            if self.options.ignore_circular_refs {
                return Ok(Value::Null);
            }
            return Ok(Value::Pointer(existing.clone()));
        }

        let slot = Ptr::new(Value::Null);
        self.visited.insert(ptr.addr(), slot.clone());
        let pointee = self.copy(&ptr.get(), depth + 1)?;
        slot.set(pointee);
        Ok(Value::Pointer(slot))
    }

    fn copy_struct(&mut self, record: &StructValue, depth: usize) -> Result<StructValue> {
        let mut fields = Vec::with_capacity(record.fields().len());
        for (field, value) in record.iter() {
            if !field.is_exported() && self.options.ignore_unexported_fields {
                fields.push(field.shape().zero_value());
                continue;
            }
            fields.push(
                self.copy(value, depth + 1)
                    .map_err(|err| err.with_path(PathSegment::Field(field.name().to_owned())))?,
            );
        }
        Ok(StructValue::new(record.ty().clone(), fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containers_are_reallocated() {
        let shared = Ptr::new(Value::I64(1));
        let src = Value::List(vec![Value::Pointer(shared.clone()), Value::from("x")]);
        let copy = deep_copy(&src).unwrap();
        let Value::List(items) = &copy else {
            panic!("expected a list, got {copy:?}")
        };
        let Value::Pointer(copied) = &items[0] else {
            panic!("expected a pointer")
        };
        assert!(!copied.ptr_eq(&shared));
        shared.set(Value::I64(2));
        assert_eq!(copied.get(), Value::I64(1));
    }

    #[test]
    fn shared_slots_stay_shared() {
        let shared = Ptr::new(Value::from("s"));
        let src = Value::List(vec![Value::Pointer(shared.clone()), Value::Pointer(shared)]);
        let copy = deep_copy(&src).unwrap();
        let items = copy.as_list().unwrap();
        assert_eq!(items[0], items[1]);
    }

    #[test]
    fn depth_bound_substitutes_zero_values() {
        let src = Value::List(vec![Value::List(vec![Value::I64(5)])]);
        let copy = deep_copy_with(&src, &CopyOptions::new().max_depth(2)).unwrap();
        assert_eq!(copy, Value::List(vec![Value::List(vec![Value::I64(0)])]));
    }

    #[test]
    fn functions_are_refused() {
        let src = Value::List(vec![Value::Opaque(crate::Opaque::func("Handler", ()))]);
        let err = deep_copy(&src).unwrap_err();
        assert!(err.is(CastErrorKind::UnsupportedType));
        assert_eq!(err.to_string(), "at [0]: unsupported type: func Handler");
    }
}
