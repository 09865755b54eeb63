//! Error types for the binding core.
//!
//! Each concern of the binding layer owns a dedicated error enum. All of them
//! convert into [`BridgeError`] for callers that want a single error type.
//!
//! ## Error Hierarchy
//!
//! ```text
//! BridgeError (top-level wrapper)
//! ├── RegistryError   - type hierarchy lookups and registration
//! ├── CodecError      - enum/flags marshaling
//! ├── DefinitionError - member definition on host classes
//! ├── NativeError     - failures raised by host callables
//! └── ConversionError - host value extraction
//! ```
//!
//! Lookup failures (`RegistryError::UnknownType`, `CodecError::InvalidValue`)
//! are always surfaced to the caller. `DefinitionError` is recovered locally
//! by the accessor synthesizer. `NativeError` raised inside a signal handler is
//! propagated unchanged to whoever triggered the emission.

use std::sync::{MutexGuard, PoisonError};

use thiserror::Error;

use crate::GType;

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors raised by the type hierarchy and the codec registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The queried type was never registered (or only reserved).
    #[error("unknown type: {0:?}")]
    UnknownType(GType),

    /// A type descriptor was registered twice.
    #[error("duplicate type: '{name}' is already registered")]
    DuplicateType { name: String },

    /// Registering the descriptor would make the type its own ancestor.
    #[error("inheritance cycle: '{name}' would become its own ancestor")]
    InheritanceCycle { name: String },

    /// A type lists a registered non-interface type among its interfaces.
    #[error("'{name}' is not an interface")]
    NotAnInterface { name: String },

    /// The registry was sealed and no longer accepts registrations.
    #[error("registry is sealed")]
    Sealed,
}

// ============================================================================
// Codec Errors
// ============================================================================

/// Errors raised while marshaling enum and flags values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Exact decode requested but no declared constant carries the value.
    #[error("invalid value {value} for '{type_name}'")]
    InvalidValue { type_name: String, value: i64 },

    /// Named lookup did not match any declared constant.
    #[error("'{type_name}' has no constant named '{name}'")]
    UnknownName { type_name: String, name: String },

    /// A value of one enum/flags type was used where another was expected.
    #[error("type mismatch: expected '{expected}', got '{actual}'")]
    TypeMismatch { expected: String, actual: String },

    /// An encoded value was shorter than the wire format requires.
    #[error("truncated encoded value: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

impl CodecError {
    /// Check if this error is a failed exact/named lookup.
    pub fn is_invalid_value(&self) -> bool {
        matches!(
            self,
            CodecError::InvalidValue { .. } | CodecError::UnknownName { .. }
        )
    }
}

// ============================================================================
// Definition Errors
// ============================================================================

/// Errors raised when a member cannot be defined on a host class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// The host naming rules reject the member name.
    #[error("'{name}' is not a valid member name on '{owner}'")]
    InvalidName { owner: String, name: String },

    /// A member with the same name already exists.
    #[error("'{owner}' already defines '{name}'")]
    Collision { owner: String, name: String },

    /// The class belongs to a sealed binding context.
    #[error("cannot define '{name}' on '{owner}': bindings are sealed")]
    Sealed { owner: String, name: String },
}

impl DefinitionError {
    /// Name of the member that could not be defined.
    pub fn member_name(&self) -> &str {
        match self {
            DefinitionError::InvalidName { name, .. }
            | DefinitionError::Collision { name, .. }
            | DefinitionError::Sealed { name, .. } => name,
        }
    }
}

// ============================================================================
// Conversion / Native Errors
// ============================================================================

/// Errors that can occur when converting host values to Rust values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Type mismatch during conversion
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Attempted to convert nil to a non-nullable type
    #[error("nil cannot be converted to {target_type}")]
    Nil { target_type: &'static str },

    /// Integer overflow during conversion
    #[error("integer overflow: value {value} does not fit in {target_type}")]
    IntegerOverflow { value: i64, target_type: &'static str },

    /// Generic conversion failure
    #[error("conversion failed: {message}")]
    Failed { message: String },
}

/// Errors raised by host callables.
///
/// A `NativeError` returned from a signal handler is the binding's
/// `NativeCallbackFailure`: the dispatch bridge hands it back to the code
/// that triggered the emission and never swallows it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    /// Error converting arguments or return values
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Error marshaling an enum or flags argument
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Invalid receiver for a method call
    #[error("invalid receiver: {message}")]
    InvalidThis { message: String },

    /// Argument index out of bounds
    #[error("argument index {index} out of bounds (function has {count} arguments)")]
    ArgumentIndexOutOfBounds { index: usize, count: usize },

    /// Wrong number of arguments for a fixed-arity callable
    #[error("wrong number of arguments (given {given}, expected {expected})")]
    ArityMismatch { given: usize, expected: usize },

    /// No method with the given name on the receiver's class
    #[error("undefined method '{name}' for '{type_name}'")]
    MissingMethod { type_name: String, name: String },

    /// A lock guarding binding state was poisoned by a panicking handler
    #[error("lock poisoned")]
    LockPoisoned,

    /// Generic native error
    #[error("native error: {message}")]
    Other { message: String },
}

impl<'a, T> From<PoisonError<MutexGuard<'a, T>>> for NativeError {
    fn from(_: PoisonError<MutexGuard<'a, T>>) -> Self {
        NativeError::LockPoisoned
    }
}

impl NativeError {
    /// Create an "invalid this" error with a message.
    pub fn invalid_this(message: impl Into<String>) -> Self {
        NativeError::InvalidThis {
            message: message.into(),
        }
    }

    /// Create a generic native error.
    pub fn other(message: impl Into<String>) -> Self {
        NativeError::Other {
            message: message.into(),
        }
    }
}

// ============================================================================
// Top-level
// ============================================================================

/// Unified error type for the binding core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Native(#[from] NativeError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}
