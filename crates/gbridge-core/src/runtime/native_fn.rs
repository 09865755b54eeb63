//! Host callable storage and the callable trait.

use std::fmt;
use std::sync::Arc;

use crate::NativeError;

use super::{CallContext, Dynamic};

/// Number of arguments a callable accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments.
    Fixed(usize),
    /// At least `required` arguments.
    Variadic { required: usize },
}

impl Arity {
    /// Check whether a call with `count` arguments is acceptable.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => count == n,
            Arity::Variadic { required } => count >= required,
        }
    }

    /// Check whether the callable takes exactly `count` arguments and no more.
    pub fn is_exactly(self, count: usize) -> bool {
        self == Arity::Fixed(count)
    }

    pub fn required(self) -> usize {
        match self {
            Arity::Fixed(n) => n,
            Arity::Variadic { required } => required,
        }
    }
}

/// Type-erased host callable.
///
/// This wraps any callable that implements `NativeCallable`, allowing
/// callables of different shapes to be stored uniformly in dispatch tables.
/// Cloning shares the underlying callable.
#[derive(Clone)]
pub struct NativeFn {
    arity: Arity,
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    /// Create a new NativeFn from a callable.
    pub fn new<F>(arity: Arity, f: F) -> Self
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        Self {
            arity,
            inner: Arc::new(f),
        }
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Call this function with a prepared context.
    pub fn call(&self, ctx: &mut CallContext) -> Result<(), NativeError> {
        self.inner.call(ctx)
    }

    /// Check the argument count, run the callable and return its result.
    ///
    /// # Errors
    ///
    /// Returns `NativeError::ArityMismatch` when `args` does not satisfy the
    /// callable's arity; otherwise whatever the callable returns.
    pub fn invoke(
        &self,
        receiver: Option<&Dynamic>,
        args: &[Dynamic],
    ) -> Result<Dynamic, NativeError> {
        if !self.arity.accepts(args.len()) {
            return Err(NativeError::ArityMismatch {
                given: args.len(),
                expected: self.arity.required(),
            });
        }
        let mut ctx = CallContext::new(receiver, args);
        self.call(&mut ctx)?;
        Ok(ctx.into_return())
    }

    /// Check whether both handles share the same callable.
    pub fn ptr_eq(&self, other: &NativeFn) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Trait for host callables.
///
/// The `call` method receives a `CallContext` that provides access to the
/// receiver and arguments and allows setting the return value.
pub trait NativeCallable {
    fn call(&self, ctx: &mut CallContext) -> Result<(), NativeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut CallContext) -> Result<(), NativeError>,
{
    fn call(&self, ctx: &mut CallContext) -> Result<(), NativeError> {
        (self)(ctx)
    }
}
