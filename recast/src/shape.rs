//! Type descriptors: what a cast should produce.

use alloc::sync::Arc;
use core::fmt;

use crate::{CastError, Context, OpaqueKind, Reflect, StructValue, Value};

/// Primitive target kinds handled by scalar coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `bool`
    Bool,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// UTF-8 text
    String,
}

impl ScalarKind {
    /// Lower-case name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::String => "string",
        }
    }

    /// The zero value of this kind.
    pub fn zero_value(self) -> Value {
        match self {
            ScalarKind::Bool => Value::Bool(false),
            ScalarKind::I8 => Value::I8(0),
            ScalarKind::I16 => Value::I16(0),
            ScalarKind::I32 => Value::I32(0),
            ScalarKind::I64 => Value::I64(0),
            ScalarKind::U8 => Value::U8(0),
            ScalarKind::U16 => Value::U16(0),
            ScalarKind::U32 => Value::U32(0),
            ScalarKind::U64 => Value::U64(0),
            ScalarKind::F32 => Value::F32(0.0),
            ScalarKind::F64 => Value::F64(0.0),
            ScalarKind::String => Value::String(String::new()),
        }
    }
}

/// Describes the target of a cast.
///
/// Shapes are cheap to clone: struct types are shared behind an [`Arc`] and
/// struct fields resolve their own shapes lazily, so recursive types can be
/// described without building an infinite tree.
#[derive(Debug, Clone)]
pub enum Shape {
    /// A primitive kind.
    Scalar(ScalarKind),
    /// A byte sequence.
    Bytes,
    /// A UTC timestamp.
    Time,
    /// A growable sequence.
    List(Box<Shape>),
    /// A fixed-length sequence.
    Array(Box<Shape>, usize),
    /// A key-value mapping.
    Map(Box<Shape>, Box<Shape>),
    /// A record with named fields.
    Struct(Arc<StructType>),
    /// A shared reference to a value of the inner shape.
    Pointer(Box<Shape>),
    /// An optional value of the inner shape; absent is [`Value::Null`].
    Option(Box<Shape>),
    /// A named dynamic slot: values pass through unchanged.
    Interface(&'static str),
    /// The fully dynamic slot: values pass through, containers are re-materialised.
    Any,
    /// A type that populates itself from the source through a [`CastSetter`].
    Custom(CustomShape),
    /// A function-like or channel-like handle of the named type.
    Opaque(OpaqueKind, &'static str),
}

impl Shape {
    /// Shape of a list with elements of `elem`.
    pub fn list(elem: Shape) -> Self {
        Shape::List(Box::new(elem))
    }

    /// Shape of a map from `key` to `value`.
    pub fn map(key: Shape, value: Shape) -> Self {
        Shape::Map(Box::new(key), Box::new(value))
    }

    /// Shape of a pointer to `inner`.
    pub fn pointer(inner: Shape) -> Self {
        Shape::Pointer(Box::new(inner))
    }

    /// Shape of an optional `inner`.
    pub fn option(inner: Shape) -> Self {
        Shape::Option(Box::new(inner))
    }

    /// The value a cast produces for an absent source.
    pub fn zero_value(&self) -> Value {
        match self {
            Shape::Scalar(kind) => kind.zero_value(),
            Shape::Bytes => Value::Bytes(Vec::new()),
            Shape::Time => Value::Time(Default::default()),
            Shape::List(_) => Value::List(Vec::new()),
            Shape::Array(elem, len) => Value::List((0..*len).map(|_| elem.zero_value()).collect()),
            Shape::Map(_, _) => Value::Map(Default::default()),
            Shape::Struct(ty) => Value::Struct(StructValue::zero(ty)),
            Shape::Custom(custom) => custom.repr().zero_value(),
            Shape::Pointer(_)
            | Shape::Option(_)
            | Shape::Interface(_)
            | Shape::Any
            | Shape::Opaque(_, _) => Value::Null,
        }
    }

    /// The struct type behind this shape, if it is a struct.
    pub fn as_struct(&self) -> Option<&Arc<StructType>> {
        match self {
            Shape::Struct(ty) => Some(ty),
            _ => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar(kind) => f.write_str(kind.as_str()),
            Shape::Bytes => f.write_str("bytes"),
            Shape::Time => f.write_str("time"),
            Shape::List(elem) => write!(f, "list<{elem}>"),
            Shape::Array(elem, len) => write!(f, "[{elem}; {len}]"),
            Shape::Map(key, value) => write!(f, "map<{key}, {value}>"),
            Shape::Struct(ty) => f.write_str(ty.name()),
            Shape::Pointer(inner) => write!(f, "*{inner}"),
            Shape::Option(inner) => write!(f, "option<{inner}>"),
            Shape::Interface(name) => f.write_str(name),
            Shape::Any => f.write_str("any"),
            Shape::Custom(custom) => f.write_str(custom.name()),
            Shape::Opaque(kind, name) => write!(f, "{kind} {name}"),
        }
    }
}

/// Field table of a record type, built once per type.
#[derive(Debug)]
pub struct StructType {
    name: &'static str,
    fields: Vec<Field>,
}

impl StructType {
    /// Start describing a struct type called `name`.
    pub fn builder(name: &'static str) -> StructTypeBuilder {
        StructTypeBuilder {
            name,
            fields: Vec::new(),
        }
    }

    /// Type name, used in messages and for struct value equality.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Find a directly declared field by its declared name.
    pub fn field(&self, name: &str) -> Option<(usize, &Field)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, field)| field.name == name)
    }

    /// Find a field by declared name, including fields promoted from
    /// embedded records. Direct fields win; the path indexes through the
    /// embedded records.
    pub fn find_field(&self, name: &str) -> Option<(Vec<usize>, Field)> {
        if let Some((index, field)) = self.field(name) {
            return Some((vec![index], field.clone()));
        }
        self.fields.iter().enumerate().find_map(|(index, field)| {
            if !field.embedded {
                return None;
            }
            let Shape::Struct(inner) = field.shape() else {
                return None;
            };
            let (mut path, found) = inner.find_field(name)?;
            path.insert(0, index);
            Some((path, found))
        })
    }
}

/// Builder returned by [`StructType::builder`].
#[derive(Debug)]
pub struct StructTypeBuilder {
    name: &'static str,
    fields: Vec<Field>,
}

impl StructTypeBuilder {
    /// Append a field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Finish the type.
    pub fn build(self) -> Arc<StructType> {
        Arc::new(StructType {
            name: self.name,
            fields: self.fields,
        })
    }
}

/// One declared field of a [`StructType`].
#[derive(Clone)]
pub struct Field {
    name: &'static str,
    shape: fn() -> Shape,
    tags: Vec<(&'static str, &'static str)>,
    embedded: bool,
    exported: bool,
}

impl Field {
    /// A public, non-embedded field without annotations.
    pub fn new(name: &'static str, shape: fn() -> Shape) -> Self {
        Self {
            name,
            shape,
            tags: Vec::new(),
            embedded: false,
            exported: true,
        }
    }

    /// Add a `key: "value"` annotation, e.g. `json: "user_id,omitempty"`.
    pub fn tag(mut self, key: &'static str, value: &'static str) -> Self {
        self.tags.push((key, value));
        self
    }

    /// Flatten this field's struct fields into the parent.
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    /// Mark the field as unexported: never written by casts, skipped by deep copy.
    pub fn private(mut self) -> Self {
        self.exported = false;
        self
    }

    /// Apply a `#[cast(..)]` option as written in [`record!`](crate::record).
    ///
    /// `embed` and `private` are flags; any `key = "value"` pair is a tag.
    pub fn attr(self, key: &'static str, value: Option<&'static str>) -> Self {
        match (key, value) {
            ("embed", None) => self.embedded(),
            ("private", None) => self.private(),
            (key, Some(value)) => self.tag(key, value),
            (_, None) => self,
        }
    }

    /// Declared name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The field's shape, resolved on demand.
    pub fn shape(&self) -> Shape {
        (self.shape)()
    }

    /// The annotation value for `key`, if present.
    pub fn tag_value(&self, key: &str) -> Option<&'static str> {
        self.tags.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// All annotations in declaration order.
    pub fn tags(&self) -> &[(&'static str, &'static str)] {
        &self.tags
    }

    /// Whether the field is flattened into its parent.
    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    /// Whether the field can be written by casts and deep copy.
    pub fn is_exported(&self) -> bool {
        self.exported
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("embedded", &self.embedded)
            .field("exported", &self.exported)
            .finish()
    }
}

/// A type that takes over its own population from an arbitrary source.
///
/// When a cast targets a type whose shape is [`Shape::Custom`], the caster
/// hands the source value to `cast_set` instead of matching it structurally.
pub trait CastSetter {
    /// Populate `self` from `value`.
    fn cast_set(&mut self, cx: &Context, value: &Value) -> Result<(), CastError>;
}

type SetFn = fn(&Context, &Value) -> Result<Value, CastError>;

/// Shape of a type implementing [`CastSetter`].
#[derive(Clone, Copy)]
pub struct CustomShape {
    name: &'static str,
    repr: fn() -> Shape,
    set: SetFn,
}

impl CustomShape {
    /// Describe `T`, whose [`Reflect::to_value`] output has shape `repr`.
    pub fn of<T>(name: &'static str, repr: fn() -> Shape) -> Self
    where
        T: CastSetter + Reflect + Default,
    {
        Self {
            name,
            repr,
            set: set_via::<T>,
        }
    }

    /// Describe a dynamic custom type from a plain function.
    pub fn from_fn(name: &'static str, repr: fn() -> Shape, set: SetFn) -> Self {
        Self { name, repr, set }
    }

    /// Type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Shape of the values this custom type produces.
    pub fn repr(&self) -> Shape {
        (self.repr)()
    }

    /// Run the setter against `value`.
    pub fn apply(&self, cx: &Context, value: &Value) -> Result<Value, CastError> {
        (self.set)(cx, value)
    }
}

fn set_via<T>(cx: &Context, value: &Value) -> Result<Value, CastError>
where
    T: CastSetter + Reflect + Default,
{
    let mut target = T::default();
    target.cast_set(cx, value)?;
    Ok(target.to_value())
}

impl fmt::Debug for CustomShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomShape")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
