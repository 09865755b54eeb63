//! Deterministic native type identity.
//!
//! This module provides [`GType`], a 64-bit identifier for a native type.
//! Identifiers are computed from the native type name, so an identifier can be
//! handed out (and referenced by children) before the type itself has been
//! registered:
//!
//! - Forward references (parent computed before the parent is loaded)
//! - No registration order dependencies
//! - Same name = same identifier across every loaded native module
//!
//! # Examples
//!
//! ```
//! use gbridge_core::GType;
//!
//! let object = GType::from_name("GObject");
//! assert_eq!(object, GType::from_name("GObject"));
//! assert_ne!(object, GType::from_name("GtkWidget"));
//! ```

use std::fmt;
use xxhash_rust::const_xxh64::xxh64 as const_xxh64;
use xxhash_rust::xxh64::xxh64;

/// Domain marker mixed into every type identifier.
const TYPE_DOMAIN: u64 = 0x2fac10b63a6cc57c;

/// Identifier of a native type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct GType(pub u64);

impl GType {
    /// The invalid type. Never registered.
    pub const INVALID: GType = GType(0);

    /// Compute the identifier of a native type from its name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        GType(TYPE_DOMAIN ^ xxh64(name.as_bytes(), 0))
    }

    /// Compile-time variant of [`GType::from_name`].
    ///
    /// Produces exactly the same identifier; used for the well-known
    /// fundamental types below.
    pub const fn from_name_const(name: &str) -> Self {
        GType(TYPE_DOMAIN ^ const_xxh64(name.as_bytes(), 0))
    }

    #[inline]
    pub const fn is_invalid(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for GType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GType({:#018x})", self.0)
    }
}

impl fmt::Display for GType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Identifiers of the fundamental native types every object system provides.
pub mod fundamentals {
    use super::GType;

    pub const OBJECT: GType = GType::from_name_const("GObject");
    pub const INITIALLY_UNOWNED: GType = GType::from_name_const("GInitiallyUnowned");
    pub const INTERFACE: GType = GType::from_name_const("GInterface");
    pub const ENUM: GType = GType::from_name_const("GEnum");
    pub const FLAGS: GType = GType::from_name_const("GFlags");
    pub const BOXED: GType = GType::from_name_const("GBoxed");
}
