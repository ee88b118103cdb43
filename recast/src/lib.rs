#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

extern crate alloc;

mod error;
pub use error::*;

mod shape;
pub use shape::*;

mod value;
pub use value::*;

pub mod coerce;
pub use coerce::{to_bool, to_number, to_string, try_to_number};

mod empty;
pub use empty::is_empty;

mod fields;
pub use fields::*;

mod time;
pub use time::*;

mod context;
pub use context::*;

mod copy;
pub use copy::*;

mod cast;
pub use cast::*;

mod reflect;
#[doc(hidden)]
pub use reflect::__private;
pub use reflect::{ByteBuf, Reflect};

mod macros;

#[cfg(feature = "tracing")]
#[allow(unused_imports)]
pub(crate) use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
#[macro_export]
#[doc(hidden)]
/// Forwards to tracing::trace when the tracing feature is enabled
macro_rules! trace {
    ($($tt:tt)*) => {};
}
#[cfg(not(feature = "tracing"))]
#[macro_export]
#[doc(hidden)]
/// Forwards to tracing::debug when the tracing feature is enabled
macro_rules! debug {
    ($($tt:tt)*) => {};
}
