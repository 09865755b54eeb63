//! Conversion traits between Rust values and host [`Dynamic`] values.
//!
//! - [`FromDynamic`]: Extract a Rust value from a [`Dynamic`]
//! - [`IntoDynamic`]: Convert a Rust value into a [`Dynamic`]
//!
//! ## Example
//!
//! ```
//! use gbridge_core::{Dynamic, FromDynamic, IntoDynamic};
//!
//! let value = 42i32.into_dynamic();
//! assert_eq!(i32::from_dynamic(&value).unwrap(), 42);
//! ```

use crate::runtime::{Dynamic, ObjectRef};
use crate::{ConversionError, EnumValue, FlagsValue};

/// Extract a value from a Dynamic.
pub trait FromDynamic: Sized {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError>;
}

/// Convert a value into a Dynamic.
pub trait IntoDynamic {
    fn into_dynamic(self) -> Dynamic;
}

fn mismatch(expected: &'static str, value: &Dynamic) -> ConversionError {
    if value.is_nil() {
        ConversionError::Nil {
            target_type: expected,
        }
    } else {
        ConversionError::TypeMismatch {
            expected,
            actual: value.type_name(),
        }
    }
}

// ============================================================================
// Integers
// ============================================================================

macro_rules! impl_dynamic_int {
    ($($ty:ty),*) => {
        $(
            impl FromDynamic for $ty {
                fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
                    match value {
                        Dynamic::Int(v) => <$ty>::try_from(*v).map_err(|_| {
                            ConversionError::IntegerOverflow {
                                value: *v,
                                target_type: stringify!($ty),
                            }
                        }),
                        Dynamic::Enum(e) => <$ty>::try_from(e.to_raw()).map_err(|_| {
                            ConversionError::IntegerOverflow {
                                value: i64::from(e.to_raw()),
                                target_type: stringify!($ty),
                            }
                        }),
                        Dynamic::Flags(f) => <$ty>::try_from(f.to_raw()).map_err(|_| {
                            ConversionError::IntegerOverflow {
                                value: i64::from(f.to_raw()),
                                target_type: stringify!($ty),
                            }
                        }),
                        other => Err(mismatch("int", other)),
                    }
                }
            }

            impl IntoDynamic for $ty {
                fn into_dynamic(self) -> Dynamic {
                    Dynamic::Int(self as i64)
                }
            }
        )*
    };
}

impl_dynamic_int!(i8, i16, i32, i64, u8, u16, u32);

// ============================================================================
// Floats, booleans, strings
// ============================================================================

impl FromDynamic for f64 {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::Float(v) => Ok(*v),
            Dynamic::Int(v) => Ok(*v as f64),
            other => Err(mismatch("float", other)),
        }
    }
}

impl IntoDynamic for f64 {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Float(self)
    }
}

impl FromDynamic for f32 {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        f64::from_dynamic(value).map(|v| v as f32)
    }
}

impl IntoDynamic for f32 {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Float(f64::from(self))
    }
}

impl FromDynamic for bool {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::Bool(v) => Ok(*v),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl IntoDynamic for bool {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Bool(self)
    }
}

impl FromDynamic for String {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::String(s) => Ok(s.clone()),
            other => Err(mismatch("string", other)),
        }
    }
}

impl IntoDynamic for String {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::String(self)
    }
}

impl IntoDynamic for &str {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::String(self.to_string())
    }
}

impl IntoDynamic for () {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Void
    }
}

// ============================================================================
// Native values
// ============================================================================

impl FromDynamic for EnumValue {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::Enum(v) => Ok(v.clone()),
            other => Err(mismatch("enum", other)),
        }
    }
}

impl IntoDynamic for EnumValue {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Enum(self)
    }
}

impl FromDynamic for FlagsValue {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::Flags(v) => Ok(v.clone()),
            other => Err(mismatch("flags", other)),
        }
    }
}

impl IntoDynamic for FlagsValue {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Flags(self)
    }
}

impl FromDynamic for ObjectRef {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::Object(obj) => Ok(obj.clone()),
            other => Err(mismatch("object", other)),
        }
    }
}

impl IntoDynamic for ObjectRef {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Object(self)
    }
}

impl FromDynamic for Dynamic {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl IntoDynamic for Dynamic {
    fn into_dynamic(self) -> Dynamic {
        self
    }
}

impl<T: FromDynamic> FromDynamic for Option<T> {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::Nil | Dynamic::Void => Ok(None),
            other => T::from_dynamic(other).map(Some),
        }
    }
}

impl<T: IntoDynamic> IntoDynamic for Option<T> {
    fn into_dynamic(self) -> Dynamic {
        match self {
            Some(v) => v.into_dynamic(),
            None => Dynamic::Nil,
        }
    }
}
