/// Declare a struct together with its [`Reflect`](crate::Reflect) impl.
///
/// Fields may carry a `#[cast(..)]` attribute: `key = "value"` pairs become
/// tags (`json = "id,omitempty"`), `embed` flattens a struct field into its
/// parent and `private` marks it unexported.
///
/// ```
/// recast::record! {
///     #[derive(Debug, Default, PartialEq)]
///     pub struct Server {
///         #[cast(json = "host")]
///         pub host: String,
///         #[cast(json = "port,omitempty")]
///         pub port: u16,
///     }
/// }
///
/// let server: Server = recast::try_cast(&recast::value!({"host": "db", "port": "5432"}), &["json"]).unwrap();
/// assert_eq!(server, Server { host: "db".into(), port: 5432 });
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $fdoc:expr])*
                $(#[cast($($key:ident $(= $val:tt)?),* $(,)?)])?
                $fvis:vis $field:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[doc = $fdoc])*
                $fvis $field: $fty,
            )*
        }

        impl $name {
            #[doc(hidden)]
            fn __recast_struct_type() -> $crate::__private::Arc<$crate::StructType> {
                static TYPE: $crate::__private::OnceLock<$crate::__private::Arc<$crate::StructType>> =
                    $crate::__private::OnceLock::new();
                TYPE.get_or_init(|| {
                    $crate::StructType::builder(stringify!($name))
                        $(
                            .field(
                                $crate::Field::new(stringify!($field), <$fty as $crate::Reflect>::shape)
                                    $($(.attr(stringify!($key), None::<&'static str> $(.or(Some($val)))?))*)?
                            )
                        )*
                        .build()
                })
                .clone()
            }
        }

        impl $crate::Reflect for $name {
            fn shape() -> $crate::Shape {
                $crate::Shape::Struct(Self::__recast_struct_type())
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Struct($crate::StructValue::new(
                    Self::__recast_struct_type(),
                    vec![$($crate::Reflect::to_value(&self.$field)),*],
                ))
            }

            #[allow(unused_mut, unused_variables)]
            fn from_value(value: $crate::Value) -> $crate::Result<Self> {
                let mut fields = $crate::__private::struct_fields(value, &Self::__recast_struct_type())?;
                Ok(Self {
                    $($field: $crate::__private::take_field(&mut fields, stringify!($field))?,)*
                })
            }
        }
    };
}

/// Build a [`Value`](crate::Value) from a JSON-like literal.
///
/// `null`, `[..]` and `{"key": ..}` nest; anything else goes through
/// `Value::from`. Wrap negative numbers and other multi-token expressions in
/// parentheses.
///
/// ```
/// let v = recast::value!({"name": "ada", "tags": ["x", "y"], "age": (-1)});
/// assert_eq!(v.len(), Some(3));
/// ```
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::Null
    };
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::List(vec![$($crate::value!($elem)),*])
    };
    ({ $($key:literal : $val:tt),* $(,)? }) => {{
        #[allow(unused_mut)]
        let mut map = $crate::ValueMap::new();
        $(map.insert($crate::Value::from($key), $crate::value!($val));)*
        $crate::Value::Map(map)
    }};
    ($other:expr) => {
        $crate::Value::from($other)
    };
}
