//! Signal dispatch bridge.
//!
//! Host callables run as signal handlers with the emitting instance bound as
//! receiver. [`SignalTable`] is the registration site: it keeps each handler
//! next to a weak reference to its instance, so a connected handler never
//! keeps the instance alive.
//!
//! Emission is synchronous. Handlers run on the emitting thread, in
//! connection order, without the table lock held, so a handler may connect,
//! disconnect or emit again. A handler error ends the emission and is handed
//! back to the emitter unchanged.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use gbridge_core::{Dynamic, GType, NativeError, NativeFn, ObjectRef, WeakObjectRef};

use crate::bindings::Bindings;
use crate::class::MemberScope;

/// A callable ready to be invoked by signal emission.
#[derive(Clone)]
pub struct SignalCallback {
    func: NativeFn,
    method: Option<String>,
}

impl SignalCallback {
    /// Run the handler with `instance` as receiver.
    pub fn invoke(&self, instance: &ObjectRef, args: &[Dynamic]) -> Result<Dynamic, NativeError> {
        let receiver = Dynamic::Object(instance.clone());
        self.func.invoke(Some(&receiver), args)
    }

    /// Name of the bound method, if created by [`SignalBridge::bind`].
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }
}

impl fmt::Debug for SignalCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalCallback")
            .field("method", &self.method)
            .field("arity", &self.func.arity())
            .finish()
    }
}

/// Builds [`SignalCallback`]s.
pub struct SignalBridge;

impl SignalBridge {
    /// Callback that calls the instance method `signal_id` of `gtype`.
    ///
    /// The method is resolved once, here, along the type's ancestors.
    ///
    /// # Errors
    ///
    /// Returns `NativeError::MissingMethod` if no such method exists.
    pub fn bind(
        bindings: &Bindings,
        gtype: GType,
        signal_id: &str,
    ) -> Result<SignalCallback, NativeError> {
        let func = bindings.resolve(gtype, MemberScope::Instance, signal_id)?;
        Ok(SignalCallback {
            func,
            method: Some(signal_id.to_string()),
        })
    }

    /// Callback around an arbitrary host callable.
    pub fn wrap(func: NativeFn) -> SignalCallback {
        SignalCallback { func, method: None }
    }
}

/// Identifier of a connected handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalHandlerId(u64);

/// One connected handler.
#[derive(Debug, Clone)]
pub struct SignalBinding {
    id: SignalHandlerId,
    instance: WeakObjectRef,
    signal: String,
    callback: SignalCallback,
}

impl SignalBinding {
    pub fn id(&self) -> SignalHandlerId {
        self.id
    }

    pub fn signal(&self) -> &str {
        &self.signal
    }

    pub fn callback(&self) -> &SignalCallback {
        &self.callback
    }

    /// Check whether the instance is still alive.
    pub fn is_alive(&self) -> bool {
        self.instance.is_alive()
    }

    fn targets(&self, instance: &ObjectRef, signal: &str) -> bool {
        self.signal == signal
            && self
                .instance
                .upgrade()
                .is_some_and(|alive| alive.ptr_eq(instance))
    }

    /// Invoke the handler on its instance.
    ///
    /// Returns `Ok(None)` if the instance has been dropped.
    pub fn invoke(&self, args: &[Dynamic]) -> Result<Option<Dynamic>, NativeError> {
        match self.instance.upgrade() {
            Some(instance) => self.callback.invoke(&instance, args).map(Some),
            None => Ok(None),
        }
    }
}

/// Registered signal handlers.
#[derive(Debug, Default)]
pub struct SignalTable {
    next_id: AtomicU64,
    bindings: Mutex<Vec<SignalBinding>>,
}

impl SignalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a handler to `signal` on `instance`.
    pub fn connect(
        &self,
        instance: &ObjectRef,
        signal: &str,
        callback: SignalCallback,
    ) -> Result<SignalHandlerId, NativeError> {
        let id = SignalHandlerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let binding = SignalBinding {
            id,
            instance: instance.downgrade(),
            signal: signal.to_string(),
            callback,
        };
        self.bindings.lock()?.push(binding);
        tracing::trace!(signal, instance = ?instance, "connected signal handler");
        Ok(id)
    }

    /// Disconnect a handler. Returns whether it was connected.
    pub fn disconnect(&self, id: SignalHandlerId) -> Result<bool, NativeError> {
        let mut bindings = self.bindings.lock()?;
        let before = bindings.len();
        bindings.retain(|binding| binding.id != id);
        Ok(bindings.len() != before)
    }

    /// Emit `signal` on `instance`, returning each handler's result.
    ///
    /// # Errors
    ///
    /// The first handler error; later handlers are not run.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn emit(
        &self,
        instance: &ObjectRef,
        signal: &str,
        args: &[Dynamic],
    ) -> Result<Vec<Dynamic>, NativeError> {
        let handlers: Vec<SignalCallback> = {
            let mut bindings = self.bindings.lock()?;
            bindings.retain(SignalBinding::is_alive);
            bindings
                .iter()
                .filter(|binding| binding.targets(instance, signal))
                .map(|binding| binding.callback.clone())
                .collect()
        };

        let mut results = Vec::with_capacity(handlers.len());
        for handler in &handlers {
            results.push(handler.invoke(instance, args)?);
        }
        Ok(results)
    }

    /// Number of live handlers for `signal` on `instance`.
    pub fn handler_count(&self, instance: &ObjectRef, signal: &str) -> Result<usize, NativeError> {
        let bindings = self.bindings.lock()?;
        Ok(bindings
            .iter()
            .filter(|binding| binding.targets(instance, signal))
            .count())
    }

    /// Drop bindings whose instance is gone. Returns how many were removed.
    pub fn prune(&self) -> Result<usize, NativeError> {
        let mut bindings = self.bindings.lock()?;
        let before = bindings.len();
        bindings.retain(SignalBinding::is_alive);
        Ok(before - bindings.len())
    }

    /// Total number of bindings, including ones not yet pruned.
    pub fn len(&self) -> Result<usize, NativeError> {
        Ok(self.bindings.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, NativeError> {
        Ok(self.len()? == 0)
    }
}
