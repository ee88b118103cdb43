//! Time destinations: timestamps from text and Unix seconds.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::{CastError, CastErrorKind, Result, Value};

/// One accepted textual time layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLayout {
    /// RFC 3339, with or without fractional seconds.
    Rfc3339,
    /// A `chrono` format string that includes a numeric offset (`%z`).
    Zoned(&'static str),
    /// A `chrono` format string without an offset; the result is taken as UTC.
    /// A `%Z` zone abbreviation is accepted and ignored.
    Naive(&'static str),
    /// A `chrono` date-only format; the result is midnight UTC.
    Date(&'static str),
}

/// Layouts tried by [`parse_time`], in order. The first match wins.
pub const DEFAULT_LAYOUTS: &[TimeLayout] = &[
    // Mon, 02 Jan 2006 15:04:05 -0700
    TimeLayout::Zoned("%a, %d %b %Y %H:%M:%S %z"),
    // 2006-01-02T15:04:05.999999999Z07:00
    TimeLayout::Rfc3339,
    // Mon Jan  2 15:04:05 MST 2006
    TimeLayout::Naive("%a %b %e %H:%M:%S %Z %Y"),
    // Mon Jan 02 15:04:05 -0700 2006
    TimeLayout::Zoned("%a %b %d %H:%M:%S %z %Y"),
    // Mon, 02 Jan 2006 15:04:05 MST
    TimeLayout::Naive("%a, %d %b %Y %H:%M:%S %Z"),
    // 02 Jan 06 15:04 MST
    TimeLayout::Naive("%d %b %y %H:%M %Z"),
    // Monday, 02-Jan-06 15:04:05 MST
    TimeLayout::Naive("%A, %d-%b-%y %H:%M:%S %Z"),
    // 02 Jan 06 15:04 -0700
    TimeLayout::Zoned("%d %b %y %H:%M %z"),
    TimeLayout::Date("%Y-%m-%d"),
    TimeLayout::Naive("%Y-%m-%d %H:%M:%S"),
    TimeLayout::Date("%Y/%m/%d"),
    TimeLayout::Naive("%Y/%m/%d %H:%M:%S"),
];

impl TimeLayout {
    fn parse(self, text: &str) -> core::result::Result<DateTime<Utc>, chrono::ParseError> {
        match self {
            TimeLayout::Rfc3339 => {
                DateTime::parse_from_rfc3339(text).map(|t| t.with_timezone(&Utc))
            }
            TimeLayout::Zoned(fmt) => {
                DateTime::parse_from_str(text, fmt).map(|t| t.with_timezone(&Utc))
            }
            TimeLayout::Naive(fmt) => {
                NaiveDateTime::parse_from_str(text, fmt).map(|t| Utc.from_utc_datetime(&t))
            }
            TimeLayout::Date(fmt) => NaiveDate::parse_from_str(text, fmt)
                .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::default()))),
        }
    }
}

/// Parse `text` against [`DEFAULT_LAYOUTS`].
pub fn parse_time(text: &str) -> Result<DateTime<Utc>> {
    parse_time_with(text, DEFAULT_LAYOUTS)
}

/// Parse `text` against `layouts`, in order.
pub fn parse_time_with(text: &str, layouts: &[TimeLayout]) -> Result<DateTime<Utc>> {
    let mut last = None;
    for layout in layouts {
        match layout.parse(text) {
            Ok(time) => return Ok(time),
            Err(err) => last = Some(err),
        }
    }
    let err = CastError::new(CastErrorKind::UnsupportedSourceType)
        .with_detail(format!("cannot parse {text:?} as time"));
    Err(match last {
        Some(cause) => err.with_source(cause),
        None => err,
    })
}

/// Produce a timestamp from a time, Unix seconds or text.
pub fn cast_time(value: &Value) -> Result<DateTime<Utc>> {
    let value = value.target();
    let seconds = match &*value {
        Value::Time(time) => return Ok(*time),
        Value::Null => return Ok(DateTime::<Utc>::default()),
        Value::String(text) => return parse_time(text),
        Value::Bytes(bytes) => return parse_time(&String::from_utf8_lossy(bytes)),
        Value::I8(v) => i64::from(*v),
        Value::I16(v) => i64::from(*v),
        Value::I32(v) => i64::from(*v),
        Value::I64(v) => *v,
        Value::U8(v) => i64::from(*v),
        Value::U16(v) => i64::from(*v),
        Value::U32(v) => i64::from(*v),
        Value::U64(v) => i64::try_from(*v).map_err(|_| out_of_range(&value))?,
        Value::F32(v) => return from_float_seconds(f64::from(*v)),
        Value::F64(v) => return from_float_seconds(*v),
        other => {
            return Err(CastError::new(CastErrorKind::UnsupportedSourceType)
                .with_detail(format!("cannot read a time from {}", other.type_name())));
        }
    };
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| out_of_range(&value))
}

fn from_float_seconds(seconds: f64) -> Result<DateTime<Utc>> {
    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * 1e9).round();
    if !whole.is_finite() || whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return Err(out_of_range(&Value::F64(seconds)));
    }
    let (whole, nanos) = if nanos < 0.0 {
        (whole as i64 - 1, (nanos + 1e9) as u32)
    } else {
        (whole as i64, nanos as u32)
    };
    DateTime::from_timestamp(whole, nanos.min(999_999_999))
        .ok_or_else(|| out_of_range(&Value::F64(seconds)))
}

fn out_of_range(value: &Value) -> CastError {
    CastError::new(CastErrorKind::UnsupportedSourceType)
        .with_detail(format!("timestamp {value} is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    // 2006-01-02T15:04:05Z
    const REFERENCE: i64 = 1_136_214_245;

    #[test]
    fn accepts_common_layouts() {
        assert_eq!(parse_time("2006-01-02T15:04:05Z").unwrap(), at(REFERENCE));
        assert_eq!(parse_time("2006-01-02T08:04:05-07:00").unwrap(), at(REFERENCE));
        assert_eq!(
            parse_time("Mon, 02 Jan 2006 08:04:05 -0700").unwrap(),
            at(REFERENCE)
        );
        assert_eq!(parse_time("2006-01-02 15:04:05").unwrap(), at(REFERENCE));
        assert_eq!(parse_time("2006/01/02 15:04:05").unwrap(), at(REFERENCE));
        assert_eq!(parse_time("2006-01-02").unwrap(), at(REFERENCE - 54_245));
        assert_eq!(parse_time("2006/01/02").unwrap(), at(REFERENCE - 54_245));
    }

    #[test]
    fn fractional_seconds_survive() {
        let t = parse_time("2006-01-02T15:04:05.5Z").unwrap();
        assert_eq!(t.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_time("next tuesday").unwrap_err();
        assert!(err.is(CastErrorKind::UnsupportedSourceType));
        assert!(err.to_string().contains("next tuesday"));
    }

    #[test]
    fn unix_seconds() {
        assert_eq!(cast_time(&Value::I64(REFERENCE)).unwrap(), at(REFERENCE));
        assert_eq!(cast_time(&Value::U32(0)).unwrap(), at(0));
        let t = cast_time(&Value::F64(1.25)).unwrap();
        assert_eq!((t.timestamp(), t.timestamp_subsec_millis()), (1, 250));
        assert!(cast_time(&Value::List(vec![])).is_err());
    }
}
