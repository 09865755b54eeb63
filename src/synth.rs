//! Accessor synthesis.
//!
//! For every operation `set_<x>` taking exactly one argument, define an
//! assignment-style accessor `<x>=` that calls the setter and evaluates to the
//! assigned value. Instance and class scopes are synthesized independently,
//! each with its own collision checks.
//!
//! The accessor dispatches `set_<x>` on its receiver: a subclass that
//! overrides the setter gets its own setter through the inherited accessor.
//! Overrides are looked up in a [`SetterDispatch`] table keyed by receiver
//! type, filled in by the owning binding context.
//!
//! A member that cannot be defined is skipped and recorded in the
//! [`SynthesisReport`]; it never stops the remaining members from being
//! synthesized.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use gbridge_core::{Arity, CallContext, DefinitionError, Dynamic, GType, NativeFn};
use rustc_hash::FxHashMap;

use crate::class::{MemberScope, MemberTable};
use crate::config::RunMode;

/// Prefix of setter operations.
pub const SETTER_PREFIX: &str = "set_";

/// Why an operation did not produce an accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The operation name does not start with `set_`.
    NotSetter,
    /// The operation is named exactly `set_`.
    EmptyName,
    /// `<x>=` already resolves on the class.
    Collision,
    /// The setter does not take exactly one argument.
    Arity(Arity),
    /// The class refused the accessor.
    Definition(DefinitionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAccessor {
    pub scope: MemberScope,
    /// Accessor name, e.g. `color=`.
    pub name: String,
    /// Setter it delegates to, e.g. `set_color`.
    pub setter: String,
    pub dispatch: Arc<SetterDispatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOperation {
    pub scope: MemberScope,
    pub operation: String,
    pub reason: SkipReason,
}

/// Outcome of synthesizing one class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisReport {
    pub owner: String,
    pub defined: Vec<SynthesizedAccessor>,
    pub skipped: Vec<SkippedOperation>,
}

impl SynthesisReport {
    /// Check whether `name` was synthesized in `scope`.
    pub fn defines(&self, scope: MemberScope, name: &str) -> bool {
        self.defined
            .iter()
            .any(|accessor| accessor.scope == scope && accessor.name == name)
    }

    /// Skipped setters, leaving out operations that were never setters.
    pub fn skipped_setters(&self) -> impl Iterator<Item = &SkippedOperation> {
        self.skipped
            .iter()
            .filter(|skip| skip.reason != SkipReason::NotSetter)
    }
}

/// Property name targeted by a setter operation name.
pub fn setter_target(operation: &str) -> Option<&str> {
    operation.strip_prefix(SETTER_PREFIX)
}

/// Accessor name for a property.
pub fn accessor_name(property: &str) -> String {
    format!("{property}=")
}

// ============================================================================
// Setter dispatch
// ============================================================================

/// Resolution of one setter for every receiver type of an accessor.
///
/// Receivers without an entry in the override table use the setter of the
/// class the accessor was synthesized on.
pub struct SetterDispatch {
    owner: GType,
    scope: MemberScope,
    setter: String,
    fallback: NativeFn,
    overrides: RwLock<FxHashMap<GType, NativeFn>>,
}

impl SetterDispatch {
    pub fn new(
        owner: GType,
        scope: MemberScope,
        setter: impl Into<String>,
        fallback: NativeFn,
    ) -> Self {
        Self {
            owner,
            scope,
            setter: setter.into(),
            fallback,
            overrides: RwLock::new(FxHashMap::default()),
        }
    }

    /// Type the accessor was synthesized on.
    pub fn owner(&self) -> GType {
        self.owner
    }

    pub fn scope(&self) -> MemberScope {
        self.scope
    }

    pub fn setter(&self) -> &str {
        &self.setter
    }

    /// Replace the per-type setters.
    ///
    /// Entries equal to the fallback setter are dropped.
    pub fn replace_overrides(&self, overrides: impl IntoIterator<Item = (GType, NativeFn)>) {
        let table: FxHashMap<GType, NativeFn> = overrides
            .into_iter()
            .filter(|(_, func)| !func.ptr_eq(&self.fallback))
            .collect();
        // The table is swapped whole, so a poisoned lock holds no partial state
        *self.overrides.write().unwrap_or_else(PoisonError::into_inner) = table;
    }

    pub fn override_count(&self) -> usize {
        self.overrides
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The setter to call for `receiver`.
    pub fn resolve(&self, receiver: Option<&Dynamic>) -> NativeFn {
        let gtype = match receiver {
            Some(Dynamic::Object(object)) => object.gtype(),
            Some(Dynamic::Class(gtype)) => *gtype,
            _ => return self.fallback.clone(),
        };
        self.overrides
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&gtype)
            .unwrap_or(&self.fallback)
            .clone()
    }
}

impl PartialEq for SetterDispatch {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.scope == other.scope && self.setter == other.setter
    }
}

impl fmt::Debug for SetterDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetterDispatch")
            .field("owner", &self.owner)
            .field("scope", &self.scope)
            .field("setter", &self.setter)
            .field("overrides", &self.override_count())
            .finish()
    }
}

/// Wrap a setter dispatch as an assignment accessor.
///
/// The accessor calls the receiver's setter with its argument and returns
/// the argument.
pub fn assignment_accessor(dispatch: Arc<SetterDispatch>) -> NativeFn {
    NativeFn::new(Arity::Fixed(1), move |ctx: &mut CallContext| {
        let receiver = ctx.receiver().ok();
        let value = ctx.arg_slot(0)?.clone();
        dispatch.resolve(receiver).invoke(receiver, ctx.args())?;
        ctx.set_return_slot(value);
        Ok(())
    })
}

/// Runs accessor synthesis over member tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessorSynthesizer {
    mode: RunMode,
}

impl AccessorSynthesizer {
    pub fn new(mode: RunMode) -> Self {
        Self { mode }
    }

    /// Synthesize both scopes of a class.
    ///
    /// Returns `None` if the class was already synthesized.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn synthesize<T: MemberTable + ?Sized>(&self, table: &mut T) -> Option<SynthesisReport> {
        if table.is_synthesized() {
            return None;
        }
        table.mark_synthesized();

        let mut report = SynthesisReport {
            owner: table.owner_name().to_string(),
            ..SynthesisReport::default()
        };
        for scope in MemberScope::BOTH {
            self.synthesize_scope(table, scope, &mut report);
        }

        tracing::trace!(
            owner = %report.owner,
            defined = report.defined.len(),
            skipped = report.skipped.len(),
            "synthesized accessors"
        );
        Some(report)
    }

    fn synthesize_scope<T: MemberTable + ?Sized>(
        &self,
        table: &mut T,
        scope: MemberScope,
        report: &mut SynthesisReport,
    ) {
        for (operation, arity) in table.operations(scope) {
            let outcome = self.synthesize_one(table, scope, &operation, arity);
            match outcome {
                Ok((name, dispatch)) => report.defined.push(SynthesizedAccessor {
                    scope,
                    name,
                    setter: operation,
                    dispatch,
                }),
                Err(reason) => {
                    if let SkipReason::Definition(err) = &reason {
                        if self.mode.is_debug() {
                            tracing::warn!(
                                owner = %report.owner,
                                operation = %operation,
                                "couldn't create accessor: {err}"
                            );
                        }
                    }
                    report.skipped.push(SkippedOperation {
                        scope,
                        operation,
                        reason,
                    });
                }
            }
        }
    }

    fn synthesize_one<T: MemberTable + ?Sized>(
        &self,
        table: &mut T,
        scope: MemberScope,
        operation: &str,
        arity: Arity,
    ) -> Result<(String, Arc<SetterDispatch>), SkipReason> {
        let property = setter_target(operation).ok_or(SkipReason::NotSetter)?;
        if property.is_empty() {
            return Err(SkipReason::EmptyName);
        }
        if !arity.is_exactly(1) {
            return Err(SkipReason::Arity(arity));
        }

        let name = accessor_name(property);
        if table.has_member(scope, &name) {
            return Err(SkipReason::Collision);
        }

        let setter = table
            .operation(scope, operation)
            .ok_or(SkipReason::NotSetter)?;
        let dispatch = Arc::new(SetterDispatch::new(
            table.owner_type(),
            scope,
            operation,
            setter,
        ));
        table
            .define_member(scope, &name, assignment_accessor(Arc::clone(&dispatch)))
            .map_err(SkipReason::Definition)?;
        Ok((name, dispatch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassTable;
    use gbridge_core::{Dynamic, NativeError, ObjectRef};
    use std::sync::{Arc, Mutex};
    use tracing_test::traced_test;

    #[derive(Default)]
    struct Button {
        color: Mutex<String>,
    }

    fn button_table() -> ClassTable {
        let set_color = NativeFn::new(Arity::Fixed(1), |ctx: &mut CallContext| {
            let color: String = ctx.arg(0)?;
            let button: &Button = ctx.this()?;
            *button.color.lock().unwrap() = color;
            Ok(())
        });
        ClassTable::new("GtkButton")
            .with_method("set_color", set_color)
            .unwrap()
    }

    #[test]
    fn synthesizes_assignment_accessor() {
        let mut table = button_table();
        let report = AccessorSynthesizer::default().synthesize(&mut table).unwrap();
        assert!(report.defines(MemberScope::Instance, "color="));
        let dispatch = &report.defined[0].dispatch;
        assert_eq!(dispatch.owner(), table.gtype());
        assert_eq!(dispatch.setter(), "set_color");

        let button = Dynamic::Object(ObjectRef::new(
            table.gtype(),
            "GtkButton",
            Button::default(),
        ));
        let accessor = &table.get(MemberScope::Instance, "color=").unwrap().func;
        let result = accessor
            .invoke(Some(&button), &[Dynamic::String("red".into())])
            .unwrap();

        assert_eq!(result, Dynamic::String("red".into()));
        let object = button.as_object().unwrap();
        assert_eq!(
            *object.downcast_ref::<Button>().unwrap().color.lock().unwrap(),
            "red"
        );
    }

    #[test]
    fn existing_accessor_is_not_overwritten() {
        let existing = NativeFn::new(Arity::Fixed(1), |ctx: &mut CallContext| {
            ctx.set_return("custom");
            Ok(())
        });
        let mut table = button_table()
            .with_method("color=", existing.clone())
            .unwrap();

        let report = AccessorSynthesizer::default().synthesize(&mut table).unwrap();
        assert!(report.defined.is_empty());
        assert_eq!(report.skipped_setters().next().unwrap().reason, SkipReason::Collision);
        assert!(table
            .get(MemberScope::Instance, "color=")
            .unwrap()
            .func
            .ptr_eq(&existing));
    }

    #[test]
    fn scopes_are_independent() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&calls);
        let set_default = NativeFn::new(Arity::Fixed(1), move |ctx: &mut CallContext| {
            let value: i64 = ctx.arg(0)?;
            recorded.lock().unwrap().push(value);
            Ok(())
        });
        let noop = NativeFn::new(Arity::Fixed(1), |_: &mut CallContext| Ok(()));

        let mut table = ClassTable::new("GtkSettings")
            .with_method("default=", noop)
            .unwrap()
            .with_method("set_default", set_default.clone())
            .unwrap()
            .with_class_method("set_default", set_default)
            .unwrap();

        let report = AccessorSynthesizer::default().synthesize(&mut table).unwrap();
        assert!(!report.defines(MemberScope::Instance, "default="));
        assert!(report.defines(MemberScope::Class, "default="));

        let class_accessor = &table.get(MemberScope::Class, "default=").unwrap().func;
        let result = class_accessor.invoke(None, &[Dynamic::Int(7)]).unwrap();
        assert_eq!(result, Dynamic::Int(7));
        assert_eq!(*calls.lock().unwrap(), [7]);
    }

    #[test]
    fn arity_and_empty_names_are_skipped() {
        let two = NativeFn::new(Arity::Fixed(2), |_: &mut CallContext| Ok(()));
        let variadic = NativeFn::new(Arity::Variadic { required: 1 }, |_: &mut CallContext| Ok(()));
        let one = NativeFn::new(Arity::Fixed(1), |_: &mut CallContext| Ok(()));
        let mut table = ClassTable::new("GtkGrid")
            .with_method("set_size", two)
            .unwrap()
            .with_method("set_children", variadic)
            .unwrap()
            .with_method("set_", one.clone())
            .unwrap()
            .with_method("show", one)
            .unwrap();

        let report = AccessorSynthesizer::default().synthesize(&mut table).unwrap();
        assert!(report.defined.is_empty());

        let reasons: Vec<(&str, &SkipReason)> = report
            .skipped
            .iter()
            .map(|s| (s.operation.as_str(), &s.reason))
            .collect();
        assert_eq!(
            reasons,
            [
                ("set_", &SkipReason::EmptyName),
                ("set_children", &SkipReason::Arity(Arity::Variadic { required: 1 })),
                ("set_size", &SkipReason::Arity(Arity::Fixed(2))),
                ("show", &SkipReason::NotSetter),
            ]
        );
    }

    #[test]
    fn runs_once_per_class() {
        let mut table = button_table();
        let synthesizer = AccessorSynthesizer::default();
        assert!(synthesizer.synthesize(&mut table).is_some());
        assert!(synthesizer.synthesize(&mut table).is_none());
    }

    #[test]
    fn setter_errors_propagate_through_accessor() {
        let failing = NativeFn::new(Arity::Fixed(1), |_: &mut CallContext| {
            Err(NativeError::other("read-only"))
        });
        let dispatch = SetterDispatch::new(
            GType::from_name("GtkLabel"),
            MemberScope::Instance,
            "set_text",
            failing,
        );
        let accessor = assignment_accessor(Arc::new(dispatch));
        let err = accessor.invoke(None, &[Dynamic::Nil]).unwrap_err();
        assert_eq!(err, NativeError::other("read-only"));
    }

    #[test]
    fn accessor_dispatches_on_receiver_type() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let setter = |tag: &'static str| {
            let calls = Arc::clone(&calls);
            NativeFn::new(Arity::Fixed(1), move |_: &mut CallContext| {
                calls.lock().unwrap().push(tag);
                Ok(())
            })
        };
        let widget = GType::from_name("GtkWidget");
        let label = GType::from_name("GtkLabel");

        let dispatch = Arc::new(SetterDispatch::new(
            widget,
            MemberScope::Instance,
            "set_text",
            setter("widget"),
        ));
        dispatch.replace_overrides([(label, setter("label"))]);
        assert_eq!(dispatch.override_count(), 1);
        let accessor = assignment_accessor(Arc::clone(&dispatch));

        let on_label = Dynamic::Object(ObjectRef::new(label, "GtkLabel", ()));
        let on_widget = Dynamic::Object(ObjectRef::new(widget, "GtkWidget", ()));
        let on_class = Dynamic::Class(label);
        accessor.invoke(Some(&on_label), &[Dynamic::Int(1)]).unwrap();
        accessor.invoke(Some(&on_widget), &[Dynamic::Int(2)]).unwrap();
        accessor.invoke(Some(&on_class), &[Dynamic::Int(3)]).unwrap();
        assert_eq!(*calls.lock().unwrap(), ["label", "widget", "label"]);
    }

    #[test]
    fn fallback_setter_is_not_stored_as_override() {
        let set_text = NativeFn::new(Arity::Fixed(1), |_: &mut CallContext| Ok(()));
        let dispatch = SetterDispatch::new(
            GType::from_name("GtkWidget"),
            MemberScope::Instance,
            "set_text",
            set_text.clone(),
        );
        dispatch.replace_overrides([(GType::from_name("GtkLabel"), set_text)]);
        assert_eq!(dispatch.override_count(), 0);
    }

    /// Table whose definitions always fail, to observe diagnostics.
    struct Refusing(ClassTable);

    impl MemberTable for Refusing {
        fn owner_name(&self) -> &str {
            self.0.owner_name()
        }
        fn owner_type(&self) -> GType {
            self.0.owner_type()
        }
        fn operations(&self, scope: MemberScope) -> Vec<(String, Arity)> {
            self.0.operations(scope)
        }
        fn operation(&self, scope: MemberScope, name: &str) -> Option<NativeFn> {
            self.0.operation(scope, name)
        }
        fn has_member(&self, scope: MemberScope, name: &str) -> bool {
            self.0.has_member(scope, name)
        }
        fn define_member(
            &mut self,
            _scope: MemberScope,
            name: &str,
            _func: NativeFn,
        ) -> Result<(), DefinitionError> {
            Err(DefinitionError::InvalidName {
                owner: self.0.name().to_string(),
                name: name.to_string(),
            })
        }
        fn is_synthesized(&self) -> bool {
            self.0.is_synthesized()
        }
        fn mark_synthesized(&mut self) {
            self.0.mark_synthesized()
        }
    }

    fn refusing_table() -> Refusing {
        let one = NativeFn::new(Arity::Fixed(1), |_: &mut CallContext| Ok(()));
        Refusing(
            ClassTable::new("GtkEntry")
                .with_method("set_text", one.clone())
                .unwrap()
                .with_method("set_visibility", one)
                .unwrap(),
        )
    }

    #[test]
    #[traced_test]
    fn definition_failures_are_logged_in_debug_mode() {
        let mut table = refusing_table();
        let report = AccessorSynthesizer::new(RunMode::Debug)
            .synthesize(&mut table)
            .unwrap();
        // Both setters were attempted
        assert_eq!(report.skipped_setters().count(), 2);
        assert!(logs_contain("couldn't create accessor"));
        assert!(logs_contain("text="));
    }

    #[test]
    #[traced_test]
    fn definition_failures_are_silent_by_default() {
        let mut table = refusing_table();
        let report = AccessorSynthesizer::new(RunMode::Verbose)
            .synthesize(&mut table)
            .unwrap();
        assert_eq!(report.skipped_setters().count(), 2);
        assert!(!logs_contain("couldn't create accessor"));
    }
}
