//! Binding context for native modules.
//!
//! A `Bindings` context owns every loaded type, class table and signal
//! handler. The lifecycle is fixed:
//!
//! 1. [`Bindings::new`] with a [`BridgeConfig`]
//! 2. [`Bindings::prepare_environment`] so the native libraries can be found
//! 3. [`Bindings::install`] once per native module
//! 4. [`Bindings::seal`], after which the context is read-only apart from
//!    signal connections
//!
//! # Example
//!
//! ```ignore
//! let mut bindings = Bindings::new(BridgeConfig::from_env());
//! bindings.prepare_environment(&mut ProcessEnvironment);
//! bindings.install(&GtkModule)?;
//! bindings.seal();
//!
//! let label = bindings.call_class_method(gtk_label, "new", &["Hello".into_dynamic()])?;
//! ```

use thiserror::Error;

use gbridge_core::{
    BridgeError, DefinitionError, Dynamic, GType, NativeError, NativeFn, ObjectRef, RegistryError,
};
use gbridge_registry::{CodecRegistry, TypeHierarchy, TypeRegistry};

use crate::class::{ClassRegistry, MemberScope};
use crate::config::BridgeConfig;
use crate::locator::{Environment, prepend_path_to_environment_variable};
use crate::signal::{SignalBridge, SignalHandlerId, SignalTable};
use crate::synth::{AccessorSynthesizer, SynthesisReport};

/// A native library exposed to the host.
pub trait NativeModule {
    /// Module name, used in diagnostics.
    fn name(&self) -> &str;

    /// Register the module's object, enum and flags types.
    fn register_types(&self, types: &mut TypeRegistry) -> Result<(), RegistryError>;

    /// Define the host class tables of the module's types.
    fn define_classes(&self, classes: &mut ClassRegistry) -> Result<(), DefinitionError>;
}

/// Errors that can occur during binding setup.
#[derive(Debug, Error)]
pub enum BindingsError {
    /// Bindings are sealed - cannot install modules
    #[error("bindings are sealed - cannot install modules after seal()")]
    AlreadySealed,

    /// A module failed to register its types or classes
    #[error("module '{module}' failed to install")]
    InstallFailed {
        module: String,
        #[source]
        source: BridgeError,
    },
}

/// Owner of all binding state.
#[derive(Debug)]
pub struct Bindings {
    config: BridgeConfig,
    types: TypeRegistry,
    classes: ClassRegistry,
    signals: SignalTable,
    modules: Vec<String>,
    reports: Vec<SynthesisReport>,
    sealed: bool,
}

impl Bindings {
    /// Create a context with the fundamental types registered.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            types: TypeRegistry::with_fundamentals(),
            classes: ClassRegistry::new(),
            signals: SignalTable::new(),
            modules: Vec::new(),
            reports: Vec::new(),
            sealed: false,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Make the configured library directory visible to the native loader.
    ///
    /// Returns whether the search variable was changed.
    pub fn prepare_environment(&self, env: &mut dyn Environment) -> bool {
        match &self.config.library_dir {
            Some(dir) => prepend_path_to_environment_variable(env, dir, &self.config.search_var),
            None => false,
        }
    }

    // ==========================================================================
    // Installation
    // ==========================================================================

    /// Install a native module.
    ///
    /// Registers its types, defines its classes and, with eager synthesis
    /// enabled, synthesizes accessors for every class not yet synthesized.
    ///
    /// # Errors
    ///
    /// - `AlreadySealed` after [`seal`](Self::seal)
    /// - `InstallFailed` if the module's registration fails
    pub fn install(&mut self, module: &dyn NativeModule) -> Result<(), BindingsError> {
        if self.sealed {
            return Err(BindingsError::AlreadySealed);
        }

        let fail = |source: BridgeError| BindingsError::InstallFailed {
            module: module.name().to_string(),
            source,
        };
        module
            .register_types(&mut self.types)
            .map_err(|e| fail(e.into()))?;
        module
            .define_classes(&mut self.classes)
            .map_err(|e| fail(e.into()))?;

        if self.config.eager_synthesis {
            for gtype in self.synthesis_order() {
                self.synthesize_class(gtype);
            }
        }
        self.refresh_setter_dispatch();

        tracing::debug!(module = module.name(), "installed native module");
        self.modules.push(module.name().to_string());
        Ok(())
    }

    /// Synthesize accessors for one class.
    ///
    /// Returns `None` if the class has no table or was already synthesized.
    pub fn synthesize(&mut self, gtype: GType) -> Option<SynthesisReport> {
        let report = self.synthesize_class(gtype)?;
        self.refresh_setter_dispatch();
        Some(report)
    }

    fn synthesize_class(&mut self, gtype: GType) -> Option<SynthesisReport> {
        let synthesizer = AccessorSynthesizer::new(self.config.run_mode);
        let mut view = self.classes.view(self.types.hierarchy(), gtype)?;
        let report = synthesizer.synthesize(&mut view)?;
        self.reports.push(report.clone());
        Some(report)
    }

    /// Class types ordered ancestors first, then by identifier.
    fn synthesis_order(&self) -> Vec<GType> {
        let hierarchy = self.hierarchy();
        let mut types = self.classes.types();
        types.sort_by_key(|&gtype| {
            let depth = hierarchy.ancestors(gtype).map_or(0, |chain| chain.len());
            (depth, gtype)
        });
        types
    }

    /// Point every synthesized accessor at the setter each descendant
    /// resolves to.
    fn refresh_setter_dispatch(&self) {
        let hierarchy = self.hierarchy();
        let dispatches = self
            .reports
            .iter()
            .flat_map(|report| &report.defined)
            .map(|accessor| &accessor.dispatch);
        for dispatch in dispatches {
            let receivers = hierarchy
                .descendants(dispatch.owner())
                .unwrap_or_default();
            let overrides = receivers
                .into_iter()
                .filter(|&gtype| gtype != dispatch.owner())
                .filter_map(|gtype| {
                    self.classes
                        .resolve(hierarchy, gtype, dispatch.scope(), dispatch.setter())
                        .map(|member| (gtype, member.func.clone()))
                });
            dispatch.replace_overrides(overrides);
        }
    }

    /// Stop accepting modules. Calling it again is a no-op.
    pub fn seal(&mut self) {
        if self.sealed {
            return;
        }
        self.types.seal();
        self.classes.seal();
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    // ==========================================================================
    // Access
    // ==========================================================================

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        self.types.hierarchy()
    }

    pub fn codecs(&self) -> &CodecRegistry {
        self.types.codecs()
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn signals(&self) -> &SignalTable {
        &self.signals
    }

    /// Names of the installed modules, in installation order.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Every synthesis report produced so far.
    pub fn reports(&self) -> &[SynthesisReport] {
        &self.reports
    }

    fn type_name(&self, gtype: GType) -> String {
        self.classes
            .get(gtype)
            .map(|table| table.name().to_string())
            .or_else(|| self.hierarchy().get(gtype).ok().map(|d| d.name.clone()))
            .unwrap_or_else(|| gtype.to_string())
    }

    // ==========================================================================
    // Dispatch
    // ==========================================================================

    /// Resolve a member on `gtype` or its ancestors.
    ///
    /// # Errors
    ///
    /// Returns `NativeError::MissingMethod` if nothing resolves.
    pub fn resolve(
        &self,
        gtype: GType,
        scope: MemberScope,
        name: &str,
    ) -> Result<NativeFn, NativeError> {
        self.classes
            .resolve(self.hierarchy(), gtype, scope, name)
            .map(|member| member.func.clone())
            .ok_or_else(|| NativeError::MissingMethod {
                type_name: self.type_name(gtype),
                name: name.to_string(),
            })
    }

    /// Call an instance method.
    pub fn call_method(
        &self,
        instance: &ObjectRef,
        name: &str,
        args: &[Dynamic],
    ) -> Result<Dynamic, NativeError> {
        let func = self.resolve(instance.gtype(), MemberScope::Instance, name)?;
        func.invoke(Some(&Dynamic::Object(instance.clone())), args)
    }

    /// Call a class-level method; the receiver is `Dynamic::Class(gtype)`.
    pub fn call_class_method(
        &self,
        gtype: GType,
        name: &str,
        args: &[Dynamic],
    ) -> Result<Dynamic, NativeError> {
        let func = self.resolve(gtype, MemberScope::Class, name)?;
        func.invoke(Some(&Dynamic::Class(gtype)), args)
    }

    /// Look up a named constant on `gtype` or its ancestors.
    pub fn constant(&self, gtype: GType, name: &str) -> Option<&Dynamic> {
        let lineage = match self.hierarchy().ancestors(gtype) {
            Ok(chain) => chain.iter().map(|d| d.gtype).collect(),
            Err(_) => vec![gtype],
        };
        lineage
            .into_iter()
            .filter_map(|ancestor| self.classes.get(ancestor))
            .find_map(|table| table.constant(name))
    }

    // ==========================================================================
    // Signals
    // ==========================================================================

    /// Connect a host callable to `signal` on `instance`.
    pub fn connect(
        &self,
        instance: &ObjectRef,
        signal: &str,
        handler: NativeFn,
    ) -> Result<SignalHandlerId, NativeError> {
        self.signals
            .connect(instance, signal, SignalBridge::wrap(handler))
    }

    /// Connect the instance method `method` as the handler of `signal`.
    pub fn connect_method(
        &self,
        instance: &ObjectRef,
        signal: &str,
        method: &str,
    ) -> Result<SignalHandlerId, NativeError> {
        let callback = SignalBridge::bind(self, instance.gtype(), method)?;
        self.signals.connect(instance, signal, callback)
    }

    /// Emit `signal` on `instance`.
    pub fn emit(
        &self,
        instance: &ObjectRef,
        signal: &str,
        args: &[Dynamic],
    ) -> Result<Vec<Dynamic>, NativeError> {
        self.signals.emit(instance, signal, args)
    }
}

impl Default for Bindings {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::class::ClassTable;
    use crate::locator::MemoryEnvironment;
    use gbridge_core::{Arity, CallContext, fundamentals};
    use gbridge_registry::TypeDescriptor;

    struct Widgets;

    impl NativeModule for Widgets {
        fn name(&self) -> &str {
            "widgets"
        }

        fn register_types(&self, types: &mut TypeRegistry) -> Result<(), RegistryError> {
            types.register_type(TypeDescriptor::object(
                "GtkWidget",
                fundamentals::INITIALLY_UNOWNED,
            ))?;
            types.register_type(TypeDescriptor::object(
                "GtkLabel",
                GType::from_name("GtkWidget"),
            ))?;
            Ok(())
        }

        fn define_classes(&self, classes: &mut ClassRegistry) -> Result<(), DefinitionError> {
            let name = NativeFn::new(Arity::Fixed(0), |ctx: &mut CallContext| {
                let type_name = ctx.this_object()?.type_name().to_string();
                ctx.set_return(type_name);
                Ok(())
            });
            let set_name = NativeFn::new(Arity::Fixed(1), |_: &mut CallContext| Ok(()));
            classes.insert(
                ClassTable::new("GtkWidget")
                    .with_method("name", name)?
                    .with_method("set_name", set_name)?,
            )?;
            classes.insert(ClassTable::new("GtkLabel"))?;
            Ok(())
        }
    }

    #[test]
    fn install_registers_and_synthesizes() {
        let mut bindings = Bindings::default();
        bindings.install(&Widgets).unwrap();

        assert_eq!(bindings.modules(), ["widgets"]);
        assert!(bindings.hierarchy().contains(GType::from_name("GtkLabel")));
        let widget = bindings.classes().get(GType::from_name("GtkWidget")).unwrap();
        assert!(widget.contains(MemberScope::Instance, "name="));
        // Inherited accessor is not redefined on the subclass
        let label = bindings.classes().get(GType::from_name("GtkLabel")).unwrap();
        assert!(!label.contains(MemberScope::Instance, "name="));
        assert_eq!(bindings.reports().len(), 2);
    }

    #[test]
    fn lazy_synthesis() {
        let mut bindings = Bindings::new(BridgeConfig::new().with_eager_synthesis(false));
        bindings.install(&Widgets).unwrap();
        let widget = GType::from_name("GtkWidget");
        assert!(bindings.reports().is_empty());

        bindings.seal();
        let report = bindings.synthesize(widget).unwrap();
        assert!(report.defines(MemberScope::Instance, "name="));
        assert!(bindings.synthesize(widget).is_none());
    }

    #[test]
    fn install_after_seal_fails() {
        let mut bindings = Bindings::default();
        bindings.seal();
        assert!(matches!(
            bindings.install(&Widgets),
            Err(BindingsError::AlreadySealed)
        ));
    }

    #[test]
    fn installing_twice_reports_module() {
        let mut bindings = Bindings::default();
        bindings.install(&Widgets).unwrap();
        let err = bindings.install(&Widgets).unwrap_err();
        let BindingsError::InstallFailed { module, source } = err else {
            panic!("expected install failure");
        };
        assert_eq!(module, "widgets");
        assert!(matches!(
            source,
            BridgeError::Registry(RegistryError::DuplicateType { .. })
        ));
    }

    #[test]
    fn inherited_dispatch() {
        let mut bindings = Bindings::default();
        bindings.install(&Widgets).unwrap();
        let label = ObjectRef::new(GType::from_name("GtkLabel"), "GtkLabel", ());

        let name = bindings.call_method(&label, "name", &[]).unwrap();
        assert_eq!(name, Dynamic::String("GtkLabel".into()));

        let err = bindings.call_method(&label, "hide", &[]).unwrap_err();
        assert_eq!(
            err,
            NativeError::MissingMethod {
                type_name: "GtkLabel".into(),
                name: "hide".into()
            }
        );
    }

    /// Parent and child that both define `set_text`, recording which ran.
    struct TextWidgets {
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl TextWidgets {
        fn setter(&self, tag: &'static str) -> NativeFn {
            let calls = Arc::clone(&self.calls);
            NativeFn::new(Arity::Fixed(1), move |_: &mut CallContext| {
                calls.lock().unwrap().push(tag);
                Ok(())
            })
        }
    }

    impl NativeModule for TextWidgets {
        fn name(&self) -> &str {
            "text-widgets"
        }

        fn register_types(&self, types: &mut TypeRegistry) -> Result<(), RegistryError> {
            types.register_type(TypeDescriptor::object("GtkEntry", fundamentals::OBJECT))?;
            types.register_type(TypeDescriptor::object(
                "GtkSearchEntry",
                GType::from_name("GtkEntry"),
            ))?;
            Ok(())
        }

        fn define_classes(&self, classes: &mut ClassRegistry) -> Result<(), DefinitionError> {
            classes.insert(
                ClassTable::new("GtkEntry").with_method("set_text", self.setter("entry"))?,
            )?;
            classes.insert(
                ClassTable::new("GtkSearchEntry").with_method("set_text", self.setter("search"))?,
            )?;
            Ok(())
        }
    }

    #[test]
    fn inherited_accessor_calls_overriding_setter() {
        let module = TextWidgets {
            calls: Arc::default(),
        };
        let mut bindings = Bindings::default();
        bindings.install(&module).unwrap();

        let search = GType::from_name("GtkSearchEntry");
        let report = bindings
            .reports()
            .iter()
            .find(|report| report.owner == "GtkSearchEntry")
            .unwrap();
        assert!(report.defined.is_empty());

        let entry = ObjectRef::new(GType::from_name("GtkEntry"), "GtkEntry", ());
        let search_entry = ObjectRef::new(search, "GtkSearchEntry", ());
        let text = [Dynamic::String("gtk".into())];
        bindings.call_method(&search_entry, "set_text", &text).unwrap();
        let result = bindings.call_method(&search_entry, "text=", &text).unwrap();
        bindings.call_method(&entry, "text=", &text).unwrap();

        assert_eq!(result, text[0]);
        assert_eq!(*module.calls.lock().unwrap(), ["search", "search", "entry"]);
    }

    #[test]
    fn synthesis_order_does_not_change_dispatch() {
        let module = TextWidgets {
            calls: Arc::default(),
        };
        let mut bindings = Bindings::new(BridgeConfig::new().with_eager_synthesis(false));
        bindings.install(&module).unwrap();

        // Subclass first: it gets its own accessor
        let search = GType::from_name("GtkSearchEntry");
        let report = bindings.synthesize(search).unwrap();
        assert!(report.defines(MemberScope::Instance, "text="));
        bindings.synthesize(GType::from_name("GtkEntry")).unwrap();

        let search_entry = ObjectRef::new(search, "GtkSearchEntry", ());
        bindings
            .call_method(&search_entry, "text=", &[Dynamic::Int(1)])
            .unwrap();
        assert_eq!(*module.calls.lock().unwrap(), ["search"]);
    }

    #[test]
    fn eager_synthesis_runs_ancestors_first() {
        let mut bindings = Bindings::default();
        bindings
            .install(&TextWidgets {
                calls: Arc::default(),
            })
            .unwrap();
        let owners: Vec<&str> = bindings
            .reports()
            .iter()
            .map(|report| report.owner.as_str())
            .collect();
        assert_eq!(owners, ["GtkEntry", "GtkSearchEntry"]);
    }

    #[test]
    fn prepare_environment_uses_config() {
        let dir = tempfile::tempdir().unwrap();
        let bindings = Bindings::new(
            BridgeConfig::new()
                .with_library_dir(dir.path())
                .with_search_var("GI_TYPELIB_PATH"),
        );
        let mut env = MemoryEnvironment::new();
        assert!(bindings.prepare_environment(&mut env));
        assert_eq!(env.var("GI_TYPELIB_PATH").unwrap(), dir.path().as_os_str());

        assert!(!Bindings::default().prepare_environment(&mut env));
    }
}
