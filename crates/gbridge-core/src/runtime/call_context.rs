//! Call context bridging the dispatch tables and host callables.

use std::any::Any;
use std::fmt;

use crate::NativeError;
use crate::convert::{FromDynamic, IntoDynamic};

use super::{Dynamic, ObjectRef};

/// Context for a single host callable invocation.
///
/// ## Typed Argument Access
///
/// ```ignore
/// let spacing: i32 = ctx.arg(0)?;
/// let homogeneous: bool = ctx.arg(1)?;
/// ```
///
/// ## Receiver Access
///
/// Instance-level callables run with the instance as receiver; class-level
/// callables run with `Dynamic::Class` (or no receiver at all).
///
/// ```ignore
/// let widget: &Widget = ctx.this()?;
/// ```
pub struct CallContext<'a> {
    receiver: Option<&'a Dynamic>,
    args: &'a [Dynamic],
    return_slot: Dynamic,
}

impl<'a> CallContext<'a> {
    pub fn new(receiver: Option<&'a Dynamic>, args: &'a [Dynamic]) -> Self {
        Self {
            receiver,
            args,
            return_slot: Dynamic::Void,
        }
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// All arguments, in call order.
    pub fn args(&self) -> &'a [Dynamic] {
        self.args
    }

    /// Get a raw reference to an argument.
    pub fn arg_slot(&self, index: usize) -> Result<&'a Dynamic, NativeError> {
        self.args
            .get(index)
            .ok_or(NativeError::ArgumentIndexOutOfBounds {
                index,
                count: self.args.len(),
            })
    }

    /// Get a typed argument value.
    pub fn arg<T: FromDynamic>(&self, index: usize) -> Result<T, NativeError> {
        let slot = self.arg_slot(index)?;
        T::from_dynamic(slot).map_err(NativeError::Conversion)
    }

    /// The receiver of the call.
    pub fn receiver(&self) -> Result<&'a Dynamic, NativeError> {
        self.receiver
            .ok_or_else(|| NativeError::invalid_this("call has no receiver"))
    }

    /// The receiver as a native instance.
    pub fn this_object(&self) -> Result<&'a ObjectRef, NativeError> {
        match self.receiver()? {
            Dynamic::Object(obj) => Ok(obj),
            other => Err(NativeError::invalid_this(format!(
                "expected object, got {}",
                other.type_name()
            ))),
        }
    }

    /// Borrow the receiver's native state as `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no receiver, the receiver is not an
    /// instance or opaque value, or its state is not a `T`.
    pub fn this<T: Any>(&self) -> Result<&'a T, NativeError> {
        match self.receiver()? {
            Dynamic::Object(obj) => obj.downcast_ref::<T>().ok_or_else(|| {
                NativeError::invalid_this(format!(
                    "type mismatch: '{}' is not a {}",
                    obj.type_name(),
                    std::any::type_name::<T>()
                ))
            }),
            Dynamic::Native(value) => value.downcast_ref::<T>().ok_or_else(|| {
                NativeError::invalid_this(format!(
                    "type mismatch: expected {}",
                    std::any::type_name::<T>()
                ))
            }),
            other => Err(NativeError::invalid_this(format!(
                "expected native or object, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn set_return_slot(&mut self, value: Dynamic) {
        self.return_slot = value;
    }

    /// Set a typed return value.
    pub fn set_return<T: IntoDynamic>(&mut self, value: T) {
        self.return_slot = value.into_dynamic();
    }

    pub fn into_return(self) -> Dynamic {
        self.return_slot
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("has_receiver", &self.receiver.is_some())
            .field("arg_count", &self.args.len())
            .finish()
    }
}
