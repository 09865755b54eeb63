//! Native instance references.
//!
//! A native instance is shared between the native runtime and the host. The
//! host holds [`ObjectRef`]s (strong). Anything that must not keep an instance
//! alive, such as a signal binding that captures its own receiver, holds a
//! [`WeakObjectRef`] and upgrades it at the moment of use.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::GType;

/// A native instance together with its type.
pub struct Instance {
    gtype: GType,
    type_name: String,
    data: Box<dyn Any + Send + Sync>,
}

/// Strong reference to a native instance.
#[derive(Clone)]
pub struct ObjectRef(Arc<Instance>);

impl ObjectRef {
    /// Wrap native instance state.
    pub fn new<T: Any + Send + Sync>(gtype: GType, type_name: impl Into<String>, data: T) -> Self {
        ObjectRef(Arc::new(Instance {
            gtype,
            type_name: type_name.into(),
            data: Box::new(data),
        }))
    }

    pub fn gtype(&self) -> GType {
        self.0.gtype
    }

    pub fn type_name(&self) -> &str {
        &self.0.type_name
    }

    /// Borrow the instance state as `T`.
    ///
    /// Returns `None` if the state is of a different Rust type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.data.downcast_ref::<T>()
    }

    /// Create a reference that does not keep the instance alive.
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Arc::downgrade(&self.0))
    }

    /// Check whether both references point at the same instance.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Number of strong references currently held.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{}:{:p}>", self.0.type_name, Arc::as_ptr(&self.0))
    }
}

/// Weak reference to a native instance.
#[derive(Clone, Default)]
pub struct WeakObjectRef(Weak<Instance>);

impl WeakObjectRef {
    /// Get a strong reference if the instance is still alive.
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(obj) => write!(f, "Weak({:?})", obj),
            None => write!(f, "Weak(<dropped>)"),
        }
    }
}
