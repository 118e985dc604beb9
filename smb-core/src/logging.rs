/// Feature-gated logging macros.
///
/// With the `tracing` feature these are the `tracing` macros, and connection
/// workers attach their span through [`Instrument`]. Without it every macro
/// evaluates its field values and message arguments, then expands to `()`,
/// and `instrument` hands the future back untouched.

#[cfg(feature = "tracing")]
pub use tracing::{trace, debug, info, warn, error, info_span, Instrument};

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => {{ $crate::__discard_fields!($($t)*); }};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => {{ $crate::__discard_fields!($($t)*); }};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! info {
    ($($t:tt)*) => {{ $crate::__discard_fields!($($t)*); }};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => {{ $crate::__discard_fields!($($t)*); }};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! error {
    ($($t:tt)*) => {{ $crate::__discard_fields!($($t)*); }};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! info_span {
    ($name:expr $(, $($fields:tt)*)?) => {{ $($crate::__discard_fields!($($fields)*);)? }};
}

/// Borrows every value named in a `tracing` field list so it counts as used.
#[cfg(not(feature = "tracing"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __discard_fields {
    () => {};
    ($key:ident = ? $value:expr $(, $($rest:tt)*)?) => {
        let _ = &$value;
        $($crate::__discard_fields!($($rest)*);)?
    };
    ($key:ident = % $value:expr $(, $($rest:tt)*)?) => {
        let _ = &$value;
        $($crate::__discard_fields!($($rest)*);)?
    };
    ($key:ident = $value:expr $(, $($rest:tt)*)?) => {
        let _ = &$value;
        $($crate::__discard_fields!($($rest)*);)?
    };
    (? $value:expr $(, $($rest:tt)*)?) => {
        let _ = &$value;
        $($crate::__discard_fields!($($rest)*);)?
    };
    (% $value:expr $(, $($rest:tt)*)?) => {
        let _ = &$value;
        $($crate::__discard_fields!($($rest)*);)?
    };
    ($key:ident $(, $($rest:tt)*)?) => {
        let _ = &$key;
        $($crate::__discard_fields!($($rest)*);)?
    };
    ($message:literal $(, $arg:expr)* $(,)?) => {
        let _ = format_args!($message $(, $arg)*);
    };
}

#[cfg(not(feature = "tracing"))]
pub use crate::{trace, debug, info, warn, error, info_span};

#[cfg(not(feature = "tracing"))]
pub trait Instrument: Sized {
    fn instrument<S>(self, _span: S) -> Self {
        self
    }
}

#[cfg(not(feature = "tracing"))]
impl<T: Sized> Instrument for T {}
