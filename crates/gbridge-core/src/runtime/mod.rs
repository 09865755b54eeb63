//! Host callables and the values they exchange.
//!
//! ## Key Types
//!
//! - [`Dynamic`]: Host-side value (primitives, enum/flags values, instances)
//! - [`ObjectRef`] / [`WeakObjectRef`]: strong and weak native instance references
//! - [`NativeFn`]: Type-erased callable stored in dispatch tables
//! - [`CallContext`]: Receiver, arguments and return slot of one invocation

mod call_context;
mod dynamic;
mod native_fn;
mod object;

pub use call_context::CallContext;
pub use dynamic::Dynamic;
pub use native_fn::{Arity, NativeCallable, NativeFn};
pub use object::{Instance, ObjectRef, WeakObjectRef};

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{GType, NativeError};

    struct Label {
        text: Mutex<String>,
    }

    fn label() -> ObjectRef {
        ObjectRef::new(
            GType::from_name("GtkLabel"),
            "GtkLabel",
            Label {
                text: Mutex::new(String::new()),
            },
        )
    }

    #[test]
    fn dynamic_type_names() {
        assert_eq!(Dynamic::Void.type_name(), "void");
        assert_eq!(Dynamic::Nil.type_name(), "nil");
        assert_eq!(Dynamic::Int(0).type_name(), "int");
        assert_eq!(Dynamic::Float(0.0).type_name(), "float");
        assert_eq!(Dynamic::Bool(false).type_name(), "bool");
        assert_eq!(Dynamic::String("".into()).type_name(), "string");
        assert_eq!(Dynamic::Object(label()).type_name(), "object");
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = label();
        let b = label();
        assert_eq!(Dynamic::Object(a.clone()), Dynamic::Object(a.clone()));
        assert_ne!(Dynamic::Object(a), Dynamic::Object(b));
    }

    #[test]
    fn weak_reference_does_not_keep_instance_alive() {
        let obj = label();
        let weak = obj.downgrade();
        assert!(weak.is_alive());
        assert_eq!(obj.strong_count(), 1);

        drop(obj);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn arity_rules() {
        assert!(Arity::Fixed(1).accepts(1));
        assert!(!Arity::Fixed(1).accepts(2));
        assert!(Arity::Variadic { required: 1 }.accepts(3));
        assert!(!Arity::Variadic { required: 1 }.accepts(0));
        assert!(Arity::Fixed(1).is_exactly(1));
        assert!(!Arity::Variadic { required: 1 }.is_exactly(1));
    }

    #[test]
    fn invoke_with_receiver() {
        let set_text = NativeFn::new(Arity::Fixed(1), |ctx: &mut CallContext| {
            let text: String = ctx.arg(0)?;
            let label: &Label = ctx.this()?;
            *label.text.lock().map_err(|e| NativeError::other(e.to_string()))? = text;
            Ok(())
        });

        let obj = label();
        let receiver = Dynamic::Object(obj.clone());
        let result = set_text
            .invoke(Some(&receiver), &[Dynamic::String("hello".into())])
            .unwrap();

        assert!(result.is_void());
        let state = obj.downcast_ref::<Label>().unwrap();
        assert_eq!(*state.text.lock().unwrap(), "hello");
    }

    #[test]
    fn invoke_checks_arity() {
        let f = NativeFn::new(Arity::Fixed(1), |_: &mut CallContext| Ok(()));
        let err = f.invoke(None, &[]).unwrap_err();
        assert_eq!(err, NativeError::ArityMismatch { given: 0, expected: 1 });
    }

    #[test]
    fn this_without_receiver_fails() {
        let f = NativeFn::new(Arity::Fixed(0), |ctx: &mut CallContext| {
            ctx.this::<Label>()?;
            Ok(())
        });
        assert!(matches!(
            f.invoke(None, &[]),
            Err(NativeError::InvalidThis { .. })
        ));
    }

    #[test]
    fn this_with_wrong_state_type_fails() {
        let f = NativeFn::new(Arity::Fixed(0), |ctx: &mut CallContext| {
            ctx.this::<String>()?;
            Ok(())
        });
        let receiver = Dynamic::Object(label());
        assert!(matches!(
            f.invoke(Some(&receiver), &[]),
            Err(NativeError::InvalidThis { .. })
        ));
    }

    #[test]
    fn missing_argument_is_reported() {
        let f = NativeFn::new(Arity::Variadic { required: 0 }, |ctx: &mut CallContext| {
            let _: i64 = ctx.arg(2)?;
            Ok(())
        });
        let err = f.invoke(None, &[Dynamic::Int(1)]).unwrap_err();
        assert_eq!(err, NativeError::ArgumentIndexOutOfBounds { index: 2, count: 1 });
    }
}
