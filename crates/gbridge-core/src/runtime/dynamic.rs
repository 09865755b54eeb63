//! Host-side value type.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{EnumValue, FlagsValue, GType};

use super::ObjectRef;

/// A value as the host language sees it.
///
/// Every argument passed to a host callable and every value returned from
/// one is a `Dynamic`. Native instances travel as [`ObjectRef`]s, enum and
/// flags values keep their class so they can be rendered and re-encoded.
#[derive(Clone)]
pub enum Dynamic {
    /// No value (the result of a callable that returns nothing)
    Void,
    /// Explicit nil
    Nil,
    /// Boolean value
    Bool(bool),
    /// Integer value (every native integer width is stored as i64)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value (owned)
    String(String),
    /// Native enumeration value
    Enum(EnumValue),
    /// Native flags value
    Flags(FlagsValue),
    /// Strong reference to a native instance
    Object(ObjectRef),
    /// A native type used as a value (receiver of class-level calls)
    Class(GType),
    /// Opaque Rust value
    Native(Arc<dyn Any + Send + Sync>),
}

impl Dynamic {
    /// Get a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Void => "void",
            Dynamic::Nil => "nil",
            Dynamic::Bool(_) => "bool",
            Dynamic::Int(_) => "int",
            Dynamic::Float(_) => "float",
            Dynamic::String(_) => "string",
            Dynamic::Enum(_) => "enum",
            Dynamic::Flags(_) => "flags",
            Dynamic::Object(_) => "object",
            Dynamic::Class(_) => "class",
            Dynamic::Native(_) => "native",
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Dynamic::Void)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Dynamic::Nil)
    }

    /// The instance behind an `Object` value.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Dynamic::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dynamic::Void => write!(f, "Void"),
            Dynamic::Nil => write!(f, "Nil"),
            Dynamic::Bool(v) => write!(f, "Bool({})", v),
            Dynamic::Int(v) => write!(f, "Int({})", v),
            Dynamic::Float(v) => write!(f, "Float({})", v),
            Dynamic::String(s) => write!(f, "String({:?})", s),
            Dynamic::Enum(v) => write!(f, "Enum({})", v.inspect()),
            Dynamic::Flags(v) => write!(f, "Flags({})", v.inspect()),
            Dynamic::Object(obj) => write!(f, "Object({:?})", obj),
            Dynamic::Class(gtype) => write!(f, "Class({:?})", gtype),
            Dynamic::Native(_) => write!(f, "Native(...)"),
        }
    }
}

impl PartialEq for Dynamic {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Dynamic::Void, Dynamic::Void) => true,
            (Dynamic::Nil, Dynamic::Nil) => true,
            (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
            (Dynamic::Int(a), Dynamic::Int(b)) => a == b,
            (Dynamic::Float(a), Dynamic::Float(b)) => a == b,
            (Dynamic::String(a), Dynamic::String(b)) => a == b,
            (Dynamic::Enum(a), Dynamic::Enum(b)) => a == b,
            (Dynamic::Flags(a), Dynamic::Flags(b)) => a == b,
            // Instances compare by identity
            (Dynamic::Object(a), Dynamic::Object(b)) => a.ptr_eq(b),
            (Dynamic::Class(a), Dynamic::Class(b)) => a == b,
            (Dynamic::Native(a), Dynamic::Native(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
