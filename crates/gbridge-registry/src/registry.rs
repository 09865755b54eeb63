//! TypeRegistry - combined type hierarchy and codec storage.
//!
//! A native module registers its object types, enum classes and flags
//! classes here while the bindings are being set up. Enum and flags classes
//! are also entered into the hierarchy under `GEnum` / `GFlags`, so every
//! loaded type answers ancestry queries the same way.
//!
//! # Thread Safety
//!
//! Registration happens single-threaded before [`TypeRegistry::seal`]. After
//! sealing the registry is read-only; share it behind an `Arc` if needed.
//!
//! # Example
//!
//! ```
//! use gbridge_registry::{TypeDescriptor, TypeRegistry};
//! use gbridge_core::{GType, fundamentals};
//!
//! let mut registry = TypeRegistry::with_fundamentals();
//! registry
//!     .register_type(TypeDescriptor::object("GtkWidget", fundamentals::INITIALLY_UNOWNED))
//!     .unwrap();
//!
//! let chain = registry.hierarchy().ancestors(GType::from_name("GtkWidget")).unwrap();
//! assert_eq!(chain.last().unwrap().name, "GObject");
//! ```

use std::sync::Arc;

use gbridge_core::{EnumClass, FlagsClass, GType, RegistryError, fundamentals};

use crate::codec::CodecRegistry;
use crate::hierarchy::{TypeDescriptor, TypeHierarchy, TypeKind};

/// Fundamental types with their parents.
const FUNDAMENTALS: &[(&str, GType, Option<GType>)] = &[
    ("GObject", fundamentals::OBJECT, None),
    (
        "GInitiallyUnowned",
        fundamentals::INITIALLY_UNOWNED,
        Some(fundamentals::OBJECT),
    ),
    ("GInterface", fundamentals::INTERFACE, None),
    ("GEnum", fundamentals::ENUM, None),
    ("GFlags", fundamentals::FLAGS, None),
    ("GBoxed", fundamentals::BOXED, None),
];

/// Registry of every native type known to the bindings.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    hierarchy: TypeHierarchy,
    codecs: CodecRegistry,
    sealed: bool,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the fundamental types pre-registered.
    pub fn with_fundamentals() -> Self {
        let mut registry = Self::new();
        for &(name, gtype, parent) in FUNDAMENTALS {
            let mut descriptor = TypeDescriptor::new(name, TypeKind::Fundamental);
            debug_assert_eq!(descriptor.gtype, gtype);
            descriptor.parent = parent;
            let registered = registry.hierarchy.register(descriptor);
            debug_assert!(registered.is_ok(), "fundamental {name}: {registered:?}");
        }
        registry
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    fn ensure_open(&self) -> Result<(), RegistryError> {
        if self.sealed {
            return Err(RegistryError::Sealed);
        }
        Ok(())
    }

    /// Register an object, interface or boxed type.
    pub fn register_type(&mut self, descriptor: TypeDescriptor) -> Result<GType, RegistryError> {
        self.ensure_open()?;
        let gtype = descriptor.gtype;
        self.hierarchy.register(descriptor)?;
        Ok(gtype)
    }

    /// Register an enum class and its `GEnum`-derived type descriptor.
    pub fn register_enum(&mut self, class: EnumClass) -> Result<Arc<EnumClass>, RegistryError> {
        self.ensure_open()?;
        let descriptor =
            TypeDescriptor::new(class.name(), TypeKind::Enum).with_parent(fundamentals::ENUM);
        self.hierarchy.register(descriptor)?;
        self.codecs.register_enum(class)
    }

    /// Register a flags class and its `GFlags`-derived type descriptor.
    pub fn register_flags(
        &mut self,
        class: FlagsClass,
    ) -> Result<Arc<FlagsClass>, RegistryError> {
        self.ensure_open()?;
        let descriptor =
            TypeDescriptor::new(class.name(), TypeKind::Flags).with_parent(fundamentals::FLAGS);
        self.hierarchy.register(descriptor)?;
        self.codecs.register_flags(class)
    }

    /// Stop accepting registrations.
    pub fn seal(&mut self) {
        if !self.sealed {
            tracing::debug!(
                types = self.hierarchy.len(),
                codecs = self.codecs.len(),
                "type registry sealed"
            );
        }
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    // ==========================================================================
    // Access
    // ==========================================================================

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Look up a registered type.
    pub fn get(&self, gtype: GType) -> Result<&TypeDescriptor, RegistryError> {
        self.hierarchy.get(gtype)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&TypeDescriptor> {
        self.hierarchy.get_by_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fundamentals_are_registered() {
        let registry = TypeRegistry::with_fundamentals();
        assert!(registry.get(fundamentals::OBJECT).is_ok());
        assert!(registry.get(fundamentals::FLAGS).is_ok());
        let unowned = registry.hierarchy().parent(fundamentals::INITIALLY_UNOWNED);
        assert_eq!(unowned.unwrap().unwrap().gtype, fundamentals::OBJECT);

        for &(name, gtype, _) in FUNDAMENTALS {
            assert_eq!(registry.get(gtype).unwrap().name, name);
        }
        assert!(registry.hierarchy().unresolved().is_empty());
    }

    #[test]
    fn enums_derive_from_genum() {
        let mut registry = TypeRegistry::with_fundamentals();
        let class = registry
            .register_enum(EnumClass::new("GtkPackType").with_value(0, "GTK_PACK_START", "start"))
            .unwrap();

        let hierarchy = registry.hierarchy();
        assert!(hierarchy.is_a(class.gtype(), fundamentals::ENUM).unwrap());
        assert_eq!(hierarchy.get(class.gtype()).unwrap().kind, TypeKind::Enum);
        assert!(registry.codecs().enum_class(class.gtype()).is_ok());
    }

    #[test]
    fn flags_derive_from_gflags() {
        let mut registry = TypeRegistry::with_fundamentals();
        let class = registry
            .register_flags(
                FlagsClass::new("GParamFlags").with_value(1, "G_PARAM_READABLE", "readable"),
            )
            .unwrap();
        let descendants = registry.hierarchy().descendants(fundamentals::FLAGS).unwrap();
        assert!(descendants.contains(&class.gtype()));
    }

    #[test]
    fn sealed_registry_rejects_registration() {
        let mut registry = TypeRegistry::with_fundamentals();
        registry.seal();
        assert!(registry.is_sealed());
        let err = registry
            .register_type(TypeDescriptor::object("GtkWidget", fundamentals::OBJECT))
            .unwrap_err();
        assert_eq!(err, RegistryError::Sealed);
    }
}
