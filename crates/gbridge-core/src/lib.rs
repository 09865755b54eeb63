//! Core types shared by every gbridge crate.
//!
//! - [`GType`]: deterministic native type identity
//! - [`EnumClass`] / [`EnumValue`], [`FlagsClass`] / [`FlagsValue`]: integer-backed
//!   native constants and their host representation
//! - [`Dynamic`], [`NativeFn`], [`CallContext`]: the host calling convention
//! - [`ObjectRef`] / [`WeakObjectRef`]: native instance references
//! - Error types for every layer of the binding

pub mod convert;
pub mod enums;
pub mod error;
pub mod flags;
pub mod gtype;
pub mod runtime;

pub use convert::{FromDynamic, IntoDynamic};
pub use enums::{DecodeMode, EnumClass, EnumValue, EnumValueInfo};
pub use error::{
    BridgeError, CodecError, ConversionError, DefinitionError, NativeError, RegistryError,
};
pub use flags::{EMPTY_FLAGS, FLAGS_DELIMITER, FlagsClass, FlagsValue, FlagsValueInfo};
pub use gtype::{GType, fundamentals};
pub use runtime::{
    Arity, CallContext, Dynamic, Instance, NativeCallable, NativeFn, ObjectRef, WeakObjectRef,
};
