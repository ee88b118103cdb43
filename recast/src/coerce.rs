//! Scalar coercion: primitive-like values into one primitive kind.
//!
//! Booleans and strings never fail. Numbers fail only on malformed text and on
//! containers, with [`CastErrorKind::UnsupportedNumericType`].

use core::num::IntErrorKind;

use chrono::SecondsFormat;

use crate::{CastError, CastErrorKind, PathSegment, Result, ScalarKind, Value};

/// A numeric target for [`try_to_number`].
///
/// Conversions between widths follow `as` semantics: integers wrap, floats
/// truncate toward zero and saturate.
pub trait Numeric: Copy + sealed::Sealed {
    /// Whether text should always be read as a float for this kind.
    #[doc(hidden)]
    const FLOAT: bool;
    #[doc(hidden)]
    fn from_i64(v: i64) -> Self;
    #[doc(hidden)]
    fn from_u64(v: u64) -> Self;
    #[doc(hidden)]
    fn from_f64(v: f64) -> Self;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! numeric {
    ($($ty:ty => $float:literal),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Numeric for $ty {
                const FLOAT: bool = $float;

                fn from_i64(v: i64) -> Self {
                    v as $ty
                }

                fn from_u64(v: u64) -> Self {
                    v as $ty
                }

                fn from_f64(v: f64) -> Self {
                    v as $ty
                }
            }
        )*
    };
}

numeric! {
    i8 => false,
    i16 => false,
    i32 => false,
    i64 => false,
    isize => false,
    u8 => false,
    u16 => false,
    u32 => false,
    u64 => false,
    usize => false,
    f32 => true,
    f64 => true,
}

/// Truthiness of a value.
///
/// `"1"`, `"t"`, `"T"` and any casing of `"true"` are true, for strings and
/// UTF-8 bytes alike. Numbers are true when non-zero, containers when
/// non-empty. Null, records, time and opaque handles are false.
pub fn to_bool(value: &Value) -> bool {
    let value = value.target();
    match &*value {
        Value::Bool(b) => *b,
        Value::String(s) => text_is_true(s),
        Value::Bytes(bytes) => core::str::from_utf8(bytes).is_ok_and(text_is_true),
        Value::I8(v) => *v != 0,
        Value::I16(v) => *v != 0,
        Value::I32(v) => *v != 0,
        Value::I64(v) => *v != 0,
        Value::U8(v) => *v != 0,
        Value::U16(v) => *v != 0,
        Value::U32(v) => *v != 0,
        Value::U64(v) => *v != 0,
        Value::F32(v) => *v != 0.0,
        Value::F64(v) => *v != 0.0,
        Value::List(items) => !items.is_empty(),
        Value::Map(map) => !map.is_empty(),
        Value::Null
        | Value::Time(_)
        | Value::Struct(_)
        | Value::Pointer(_)
        | Value::Opaque(_) => false,
    }
}

fn text_is_true(text: &str) -> bool {
    matches!(text, "1" | "t" | "T") || text.eq_ignore_ascii_case("true")
}

/// Convert to a number, reporting malformed input.
pub fn try_to_number<N: Numeric>(value: &Value) -> Result<N> {
    let value = value.target();
    Ok(match &*value {
        Value::Null => N::from_i64(0),
        Value::Bool(b) => N::from_i64(i64::from(*b)),
        Value::I8(v) => N::from_i64(i64::from(*v)),
        Value::I16(v) => N::from_i64(i64::from(*v)),
        Value::I32(v) => N::from_i64(i64::from(*v)),
        Value::I64(v) => N::from_i64(*v),
        Value::U8(v) => N::from_u64(u64::from(*v)),
        Value::U16(v) => N::from_u64(u64::from(*v)),
        Value::U32(v) => N::from_u64(u64::from(*v)),
        Value::U64(v) => N::from_u64(*v),
        Value::F32(v) => N::from_f64(f64::from(*v)),
        Value::F64(v) => N::from_f64(*v),
        Value::String(text) => parse_number(text)?,
        Value::Bytes(bytes) => match core::str::from_utf8(bytes) {
            Ok(text) => parse_number(text)?,
            Err(err) => {
                return Err(CastError::new(CastErrorKind::UnsupportedNumericType)
                    .with_detail("bytes are not valid UTF-8")
                    .with_source(err));
            }
        },
        Value::Time(t) => N::from_i64(t.timestamp()),
        other => {
            return Err(CastError::new(CastErrorKind::UnsupportedNumericType)
                .with_detail(format!("cannot read a number from {}", other.type_name())));
        }
    })
}

/// Convert to a number, yielding zero where [`try_to_number`] would fail.
pub fn to_number<N: Numeric>(value: &Value) -> N {
    try_to_number(value).unwrap_or_else(|_| N::from_i64(0))
}

/// Parse numeric text.
///
/// Float targets always read a float. For integer targets, text containing
/// `.`, `e` or `E` is read as a float and truncated; anything else is read as
/// a base-10 integer. Integers too large for `i64` are retried as `u64` and
/// then as a float.
fn parse_number<N: Numeric>(text: &str) -> Result<N> {
    let malformed = |err: &dyn core::fmt::Display| {
        CastError::new(CastErrorKind::UnsupportedNumericType)
            .with_detail(format!("invalid numeric literal {text:?} ({err})"))
    };

    if N::FLOAT || text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        return text
            .parse::<f64>()
            .map(N::from_f64)
            .map_err(|err| malformed(&err));
    }

    match text.parse::<i64>() {
        Ok(v) => Ok(N::from_i64(v)),
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => text
                .parse::<u64>()
                .map(N::from_u64)
                .or_else(|_| text.parse::<f64>().map(N::from_f64))
                .map_err(|_| malformed(&err)),
            IntErrorKind::NegOverflow => text
                .parse::<f64>()
                .map(N::from_f64)
                .map_err(|_| malformed(&err)),
            _ => Err(malformed(&err)),
        },
    }
}

/// Textual form of a value. Never fails.
///
/// Integers print in base 10, floats in their shortest round-tripping form,
/// booleans as `true`/`false`, bytes as (lossy) UTF-8, time as RFC 3339, null
/// as the empty string. Other kinds use the [`Value`] `Display` form.
pub fn to_string(value: &Value) -> String {
    let value = value.target();
    match &*value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::Time(t) => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        other => other.to_string(),
    }
}

/// Byte form of a value.
///
/// Text becomes its UTF-8 encoding and lists are read element-wise as `u8`.
/// Other scalars use their [`to_string`] form; maps, records and opaque
/// handles are rejected.
pub fn try_to_bytes(value: &Value) -> Result<Vec<u8>> {
    let value = value.target();
    match &*value {
        Value::Null => Ok(Vec::new()),
        Value::Bytes(bytes) => Ok(bytes.clone()),
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        Value::List(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                try_to_number::<u8>(item).map_err(|err| err.with_path(PathSegment::Index(index)))
            })
            .collect(),
        Value::Map(_) | Value::Struct(_) | Value::Opaque(_) | Value::Pointer(_) => {
            Err(CastError::new(CastErrorKind::UnsupportedSourceType)
                .with_detail(format!("cannot read bytes from {}", value.type_name())))
        }
        scalar => Ok(to_string(scalar).into_bytes()),
    }
}

/// Coerce into the given scalar kind.
pub fn coerce_scalar(kind: ScalarKind, value: &Value) -> Result<Value> {
    Ok(match kind {
        ScalarKind::Bool => Value::Bool(to_bool(value)),
        ScalarKind::I8 => Value::I8(try_to_number(value)?),
        ScalarKind::I16 => Value::I16(try_to_number(value)?),
        ScalarKind::I32 => Value::I32(try_to_number(value)?),
        ScalarKind::I64 => Value::I64(try_to_number(value)?),
        ScalarKind::U8 => Value::U8(try_to_number(value)?),
        ScalarKind::U16 => Value::U16(try_to_number(value)?),
        ScalarKind::U32 => Value::U32(try_to_number(value)?),
        ScalarKind::U64 => Value::U64(try_to_number(value)?),
        ScalarKind::F32 => Value::F32(try_to_number(value)?),
        ScalarKind::F64 => Value::F64(try_to_number(value)?),
        ScalarKind::String => Value::String(to_string(value)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_table() {
        let truthy = ["1", "t", "T", "true", "TRUE", "True", "tRuE"];
        for text in truthy {
            assert!(to_bool(&Value::from(text)), "{text:?} should be true");
            assert!(to_bool(&Value::Bytes(text.as_bytes().to_vec())), "bytes {text:?}");
        }
        for text in ["", "0", "f", "false", "yes", "2", " true"] {
            assert!(!to_bool(&Value::from(text)), "{text:?} should be false");
        }
        assert!(to_bool(&Value::I64(-3)));
        assert!(!to_bool(&Value::U8(0)));
        assert!(to_bool(&Value::F64(0.5)));
        assert!(!to_bool(&Value::Null));
        assert!(!to_bool(&Value::List(vec![])));
        assert!(to_bool(&Value::List(vec![Value::I64(0)])));
    }

    #[test]
    fn numbers_from_text() {
        assert_eq!(try_to_number::<i64>(&Value::from("42")).unwrap(), 42);
        assert_eq!(try_to_number::<i64>(&Value::from("-7")).unwrap(), -7);
        assert_eq!(try_to_number::<i32>(&Value::from("3.99")).unwrap(), 3);
        assert_eq!(try_to_number::<i32>(&Value::from("-3.99")).unwrap(), -3);
        assert_eq!(try_to_number::<i64>(&Value::from("1e3")).unwrap(), 1000);
        assert_eq!(try_to_number::<f64>(&Value::from("2.5E-1")).unwrap(), 0.25);
        assert_eq!(
            try_to_number::<u64>(&Value::from("18446744073709551615")).unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn malformed_text_is_reported() {
        let err = try_to_number::<i64>(&Value::from("12abc")).unwrap_err();
        assert!(err.is(CastErrorKind::UnsupportedNumericType));
        assert!(err.to_string().contains("\"12abc\""), "{err}");
        assert_eq!(to_number::<i64>(&Value::from("12abc")), 0);
        assert!(try_to_number::<i64>(&Value::from("")).is_err());
    }

    #[test]
    fn numbers_from_other_scalars() {
        assert_eq!(try_to_number::<u8>(&Value::Bool(true)).unwrap(), 1);
        assert_eq!(try_to_number::<i64>(&Value::F64(-9.7)).unwrap(), -9);
        assert_eq!(try_to_number::<f32>(&Value::U16(7)).unwrap(), 7.0);
        assert_eq!(try_to_number::<i16>(&Value::Null).unwrap(), 0);
        assert!(try_to_number::<i64>(&Value::List(vec![])).is_err());
    }

    #[test]
    fn integer_text_round_trips() {
        macro_rules! check {
            ($($ty:ty),*) => {$(
                for v in [<$ty>::MIN, <$ty>::MAX, 0 as $ty, 1 as $ty] {
                    let text = to_string(&Value::from(v));
                    assert_eq!(try_to_number::<$ty>(&Value::from(text.as_str())).unwrap(), v);
                }
            )*};
        }
        check!(i8, i16, i32, i64, u8, u16, u32, u64);
    }

    #[test]
    fn float_text_round_trips() {
        for v in [0.1f64, -2.5e-10, 1e300, f64::MAX, 123.456, -0.0, 0.0] {
            let text = to_string(&Value::F64(v));
            let back = coerce_scalar(ScalarKind::F64, &Value::from(text.as_str())).unwrap();
            assert_eq!(back, Value::F64(v), "{text:?}");
        }
        for v in [0.1f32, 3.25, -15000000.0, -0.0] {
            let text = to_string(&Value::F32(v));
            let back = coerce_scalar(ScalarKind::F32, &Value::from(text.as_str())).unwrap();
            assert_eq!(back, Value::F32(v), "{text:?}");
        }
    }

    #[test]
    fn strings_from_scalars() {
        assert_eq!(to_string(&Value::Null), "");
        assert_eq!(to_string(&Value::Bool(false)), "false");
        assert_eq!(to_string(&Value::I64(-12)), "-12");
        assert_eq!(to_string(&Value::F64(1.5)), "1.5");
        assert_eq!(to_string(&Value::Bytes(b"hey".to_vec())), "hey");
    }

    #[test]
    fn bytes_from_lists_and_text() {
        assert_eq!(try_to_bytes(&Value::from("ab")).unwrap(), b"ab");
        let list = Value::List(vec![Value::I64(104), Value::from("105")]);
        assert_eq!(try_to_bytes(&list).unwrap(), b"hi");
        let bad = Value::List(vec![Value::I64(1), Value::from("x")]);
        assert_eq!(try_to_bytes(&bad).unwrap_err().path_string(), "[1]");
    }
}
