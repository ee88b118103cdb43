//! Error type shared by coercion, casting and deep copy.

use core::fmt::{self, Display, Write as _};
use core::error::Error;

/// The category of a [`CastError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CastErrorKind {
    /// A required value or parameter was missing or of the wrong form.
    InvalidParams,
    /// The source value's kind cannot feed the requested target.
    UnsupportedSourceType,
    /// The target shape cannot be produced by the caster.
    UnsupportedDestinationType,
    /// A location in the destination could not be written.
    UnsettableValue,
    /// A number could not be derived from the source.
    UnsupportedNumericType,
    /// No struct field answers to the requested name.
    FieldNameUndefined,
    /// The struct field exists but cannot be written.
    FieldValueCannotBeChanged,
    /// Deep copy met a kind it refuses to copy (functions, channels).
    UnsupportedType,
    /// Nesting exceeded the configured depth cap.
    DepthLimitExceeded,
    /// The operation was cancelled through its [`CancelToken`](crate::CancelToken).
    Cancelled,
}

impl CastErrorKind {
    /// Short human-readable description.
    pub fn as_str(self) -> &'static str {
        match self {
            CastErrorKind::InvalidParams => "invalid params",
            CastErrorKind::UnsupportedSourceType => "unsupported source type",
            CastErrorKind::UnsupportedDestinationType => "unsupported destination type",
            CastErrorKind::UnsettableValue => "can't set value",
            CastErrorKind::UnsupportedNumericType => "unsupported numeric type",
            CastErrorKind::FieldNameUndefined => "struct field name undefined",
            CastErrorKind::FieldValueCannotBeChanged => "struct field value can't be changed",
            CastErrorKind::UnsupportedType => "unsupported type",
            CastErrorKind::DepthLimitExceeded => "depth limit exceeded",
            CastErrorKind::Cancelled => "operation cancelled",
        }
    }
}

impl Display for CastErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A segment of the path leading to the value that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A struct field, by its resolved name.
    Field(String),
    /// A list or array element.
    Index(usize),
    /// A map entry, by the textual form of its key.
    Key(String),
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{name}"),
            PathSegment::Index(index) => write!(f, "[{index}]"),
            PathSegment::Key(key) => write!(f, "[{key:?}]"),
        }
    }
}

/// Error produced by every fallible operation in this crate.
///
/// Carries a [`CastErrorKind`], an optional detail message, the path from the
/// root of the cast to the failing value, and an optional underlying cause.
#[derive(Debug)]
pub struct CastError {
    kind: CastErrorKind,
    detail: Option<String>,
    path: Vec<PathSegment>,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl CastError {
    /// Create an error of the given kind with no detail and an empty path.
    pub fn new(kind: CastErrorKind) -> Self {
        Self {
            kind,
            detail: None,
            path: Vec::new(),
            source: None,
        }
    }

    /// Attach a detail message.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach an underlying cause, reported through [`Error::source`].
    pub fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Prepend a path segment (errors are built leaf-first while unwinding).
    pub fn with_path(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }

    /// The error category.
    pub fn kind(&self) -> CastErrorKind {
        self.kind
    }

    /// Whether this error is of the given kind.
    pub fn is(&self, kind: CastErrorKind) -> bool {
        self.kind == kind
    }

    /// The detail message, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Path segments from the root to the failing value.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Render the path as `a.b[2]["key"]`. Empty for root-level errors.
    pub fn path_string(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                PathSegment::Field(name) if out.is_empty() => out.push_str(name),
                other => {
                    let _ = write!(out, "{other}");
                }
            }
        }
        out
    }
}

impl Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.path.is_empty() {
            write!(f, "at {}: ", self.path_string())?;
        }
        f.write_str(self.kind.as_str())?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl Error for CastError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

impl From<CastErrorKind> for CastError {
    fn from(kind: CastErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Result alias for this crate.
pub type Result<T, E = CastError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_renders_fields_indices_and_keys() {
        let err = CastError::new(CastErrorKind::UnsupportedNumericType)
            .with_path(PathSegment::Field("port".into()))
            .with_path(PathSegment::Key("db".into()))
            .with_path(PathSegment::Index(2))
            .with_path(PathSegment::Field("servers".into()));
        assert_eq!(err.path_string(), r#"servers[2]["db"].port"#);
        assert_eq!(
            err.to_string(),
            r#"at servers[2]["db"].port: unsupported numeric type"#
        );
    }

    #[test]
    fn root_errors_have_no_location() {
        let err = CastError::new(CastErrorKind::InvalidParams).with_detail("source is not a list");
        assert_eq!(err.to_string(), "invalid params: source is not a list");
        assert!(err.path().is_empty());
    }

    #[test]
    fn source_is_exposed() {
        let cause = "x".parse::<i32>().unwrap_err();
        let err = CastError::new(CastErrorKind::UnsupportedNumericType).with_source(cause);
        assert!(err.source().is_some());
    }
}
